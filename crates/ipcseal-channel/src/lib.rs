//! Signed, access-controlled channels.
//!
//! This is the layer callers use. A [`ChannelRegistry`] creates named
//! channels over one of three transports and exposes one send/receive pair
//! per kind. Every operation runs the same contract: resolve the channel,
//! check its kind, check the ACL, then seal or open an [`Envelope`].

pub mod channel;
pub mod config;
pub mod envelope;
pub mod error;
pub mod pipe;
pub mod registry;

pub use channel::ChannelKind;
pub use config::RegistryConfig;
pub use envelope::{package, unpackage, Envelope};
pub use error::{ChannelError, Result};
pub use pipe::{PipeEndpoint, PipeSide};
pub use registry::ChannelRegistry;

pub use ipcseal_security::{AccessControl, EnvelopeMeta, SecurityConfig, SecurityContext};
