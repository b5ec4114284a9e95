//! Message authentication, optional payload encryption and access control.
//!
//! Every ipcseal message is wrapped in an envelope whose metadata and payload
//! are covered by an HMAC-SHA256 over a shared secret. This crate owns the
//! secret, the canonical byte form that gets signed, and the default-deny
//! channel ACL. It knows nothing about transports.

pub mod acl;
pub mod config;
pub mod context;
pub mod error;
pub mod meta;

pub use acl::AccessControl;
pub use config::SecurityConfig;
pub use context::SecurityContext;
pub use error::{Result, SecurityError};
pub use meta::EnvelopeMeta;
