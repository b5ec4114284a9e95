//! Signed, access-controlled inter-process messaging.
//!
//! ipcseal wraps three local transports in one message contract: every
//! message travels as an HMAC-signed envelope, optionally encrypted, and
//! every send or receive is checked against a per-channel allow list.
//!
//! # Crate Structure
//!
//! - [`transport`]: raw transports (in-process queue, duplex pipe, POSIX shared memory)
//! - [`frame`]: length-prefixed framing used on pipes
//! - [`security`]: signing, optional encryption, access control
//! - [`channel`]: the channel registry and envelope codec
//!
//! ```no_run
//! use std::sync::Arc;
//! use ipcseal::channel::{AccessControl, ChannelRegistry, SecurityContext};
//!
//! let security = Arc::new(SecurityContext::new(b"shared secret".to_vec())?);
//! let registry = ChannelRegistry::new(security, Arc::new(AccessControl::new()));
//! registry.create_queue("jobs")?;
//! registry.access_control().allow("jobs", "worker");
//! registry.send_queue("jobs", "worker", b"ping")?;
//! let (meta, message) = registry.recv_queue("jobs", "worker", None)?;
//! assert_eq!((meta.client_id.as_str(), &message[..]), ("worker", &b"ping"[..]));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use ipcseal_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use ipcseal_frame::*;
}

/// Re-export security types.
pub mod security {
    pub use ipcseal_security::*;
}

/// Re-export channel types.
pub mod channel {
    pub use ipcseal_channel::*;
}
