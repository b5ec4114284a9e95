//! Raw IPC primitives.
//!
//! Provides the three host transports that ipcseal channels are built on:
//! - [`MessageQueue`]: unbounded multi-producer/multi-consumer FIFO
//! - [`PipeStream`]: one end of a connected duplex byte pipe
//! - [`SharedMemoryBlock`]: a fixed-size POSIX shared memory object
//!
//! None of these know about envelopes, signatures or access control. That
//! lives in `ipcseal-channel`.

pub mod error;
pub mod queue;

#[cfg(unix)]
pub mod pipe;
#[cfg(unix)]
pub mod shm;

pub use error::{Result, TransportError};
pub use queue::MessageQueue;

#[cfg(unix)]
pub use pipe::{pipe_pair, PipeStream};
#[cfg(unix)]
pub use shm::SharedMemoryBlock;
