use std::io;
use std::time::Duration;

use ipcseal_frame::FrameError;
use ipcseal_security::SecurityError;
use ipcseal_transport::TransportError;

use crate::channel::ChannelKind;

/// Errors that can occur in channel operations.
///
/// Each failure mode a caller may want to react to has its own variant;
/// lower-layer errors that only signal an environment problem are wrapped.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// No channel is registered under this name.
    #[error("no such channel: {0}")]
    ChannelNotFound(String),

    /// A channel with this name already exists.
    #[error("channel already exists: {0}")]
    ChannelExists(String),

    /// The operation belongs to a different channel kind.
    #[error("channel {channel} is a {actual} channel, not {expected}")]
    WrongChannelKind {
        channel: String,
        expected: ChannelKind,
        actual: ChannelKind,
    },

    /// The caller id is not on the channel's ACL.
    #[error("client {client_id} not allowed on channel {channel}")]
    PermissionDenied { channel: String, client_id: String },

    /// The envelope was malformed or its signature did not match.
    #[error("envelope verification failed")]
    VerificationFailed,

    /// The signed payload could not be decrypted.
    #[error("payload decryption failed")]
    DecryptionFailed,

    /// Nothing arrived within the requested wait.
    #[error("receive timed out after {0:?}")]
    Timeout(Duration),

    /// Non-blocking queue receive found nothing queued.
    #[error("queue is empty")]
    QueueEmpty,

    /// The sealed envelope does not fit the shared memory block.
    #[error("message too large ({size} bytes, capacity {capacity})")]
    MessageTooLarge { size: usize, capacity: usize },

    /// The shared memory block holds no message.
    #[error("no message in shared memory")]
    EmptyMessage,

    /// The pipe endpoint was created for a different channel.
    #[error("pipe endpoint does not belong to channel {channel}")]
    ForeignEndpoint { channel: String },

    /// The other side of the transport is gone.
    #[error("peer disconnected")]
    Disconnected,

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[source] FrameError),

    /// Security-layer error other than decryption.
    #[error("security error: {0}")]
    Security(#[source] SecurityError),
}

impl From<TransportError> for ChannelError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(timeout) => Self::Timeout(timeout),
            TransportError::Empty => Self::QueueEmpty,
            TransportError::Disconnected => Self::Disconnected,
            TransportError::BlockOverflow { size, capacity } => {
                Self::MessageTooLarge { size, capacity }
            }
            other => Self::Transport(other),
        }
    }
}

impl From<FrameError> for ChannelError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::ConnectionClosed => Self::Disconnected,
            FrameError::Io(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
                ) =>
            {
                Self::Disconnected
            }
            other => Self::Frame(other),
        }
    }
}

impl From<SecurityError> for ChannelError {
    fn from(err: SecurityError) -> Self {
        match err {
            SecurityError::DecryptionFailed => Self::DecryptionFailed,
            other => Self::Security(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
