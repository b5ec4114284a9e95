use std::fmt;
use std::io;

use ipcseal_channel::ChannelError;
use ipcseal_frame::FrameError;
use ipcseal_security::SecurityError;
use ipcseal_transport::TransportError;

// Process exit codes. 124 matches timeout(1).
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::BrokenPipe => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Pair(source)
        | TransportError::ShmCreate { source, .. }
        | TransportError::ShmOpen { source, .. }
        | TransportError::ShmUnlink { source, .. }
        | TransportError::Io(source) => io_error(context, source),
        TransportError::InvalidSize(_) => CliError::new(USAGE, format!("{context}: {err}")),
        TransportError::ShmTooSmall { .. } | TransportError::BlockOverflow { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        TransportError::Timeout(_) | TransportError::Empty => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        TransportError::Disconnected => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } | FrameError::InvalidMagic => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn security_error(context: &str, err: SecurityError) -> CliError {
    match err {
        SecurityError::EmptySecret => CliError::new(USAGE, format!("{context}: {err}")),
        SecurityError::DecryptionFailed => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn channel_error(context: &str, err: ChannelError) -> CliError {
    match err {
        ChannelError::Transport(err) => transport_error(context, err),
        ChannelError::Frame(err) => frame_error(context, err),
        ChannelError::Security(err) => security_error(context, err),
        ChannelError::PermissionDenied { .. } => {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        ChannelError::VerificationFailed
        | ChannelError::DecryptionFailed
        | ChannelError::MessageTooLarge { .. }
        | ChannelError::EmptyMessage => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        ChannelError::Timeout(_) | ChannelError::QueueEmpty => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        ChannelError::ChannelNotFound(_)
        | ChannelError::ChannelExists(_)
        | ChannelError::WrongChannelKind { .. }
        | ChannelError::ForeignEndpoint { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        ChannelError::Disconnected => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}
