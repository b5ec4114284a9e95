use std::time::Duration;

/// Errors that can occur in raw transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to create a connected pipe pair.
    #[error("failed to create pipe pair: {0}")]
    Pair(std::io::Error),

    /// Failed to create a shared memory object.
    #[error("failed to create shared memory {name}: {source}")]
    ShmCreate {
        name: String,
        source: std::io::Error,
    },

    /// Failed to open an existing shared memory object.
    #[error("failed to open shared memory {name}: {source}")]
    ShmOpen {
        name: String,
        source: std::io::Error,
    },

    /// Failed to remove a shared memory object.
    #[error("failed to unlink shared memory {name}: {source}")]
    ShmUnlink {
        name: String,
        source: std::io::Error,
    },

    /// An existing shared memory object is smaller than requested.
    #[error("shared memory {name} too small ({actual} bytes, expected {expected})")]
    ShmTooSmall {
        name: String,
        actual: usize,
        expected: usize,
    },

    /// A write does not fit into a fixed-size block.
    #[error("message too large for block ({size} bytes, capacity {capacity})")]
    BlockOverflow { size: usize, capacity: usize },

    /// A zero-sized block was requested.
    #[error("invalid block size: {0}")]
    InvalidSize(usize),

    /// An I/O error occurred on the transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Nothing arrived within the requested wait.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Non-blocking receive found nothing queued.
    #[error("queue is empty")]
    Empty,

    /// Every handle on the other side of the transport is gone.
    #[error("transport disconnected")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, TransportError>;
