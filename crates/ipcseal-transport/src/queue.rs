use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use tracing::trace;

use crate::error::{Result, TransportError};

/// Unbounded multi-producer/multi-consumer FIFO of opaque messages.
///
/// Cloning yields another handle onto the same queue; items are delivered to
/// exactly one consumer, in the order they were put.
#[derive(Debug, Clone)]
pub struct MessageQueue {
    tx: Sender<Bytes>,
    rx: Receiver<Bytes>,
}

impl MessageQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self { tx, rx }
    }

    /// Enqueue one message. Never blocks.
    pub fn put(&self, item: impl Into<Bytes>) -> Result<()> {
        let item = item.into();
        trace!(len = item.len(), "queue put");
        self.tx.send(item).map_err(|_| TransportError::Disconnected)
    }

    /// Dequeue one message.
    ///
    /// - `None` blocks until an item arrives.
    /// - `Some(Duration::ZERO)` never blocks and returns [`TransportError::Empty`]
    ///   when nothing is queued.
    /// - `Some(timeout)` waits at most `timeout` and returns
    ///   [`TransportError::Timeout`] if nothing arrived.
    ///
    /// A failed wait never removes anything from the queue.
    pub fn get(&self, timeout: Option<Duration>) -> Result<Bytes> {
        match timeout {
            None => self.rx.recv().map_err(|_| TransportError::Disconnected),
            Some(timeout) if timeout.is_zero() => self.try_get(),
            Some(timeout) => self.rx.recv_timeout(timeout).map_err(|err| match err {
                RecvTimeoutError::Timeout => TransportError::Timeout(timeout),
                RecvTimeoutError::Disconnected => TransportError::Disconnected,
            }),
        }
    }

    /// Dequeue one message without blocking.
    pub fn try_get(&self) -> Result<Bytes> {
        self.rx.try_recv().map_err(|err| match err {
            TryRecvError::Empty => TransportError::Empty,
            TryRecvError::Disconnected => TransportError::Disconnected,
        })
    }

    /// Number of queued messages at the time of the call.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether the queue held no messages at the time of the call.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}
