use std::fmt;
use std::sync::Arc;

use ipcseal_transport::{MessageQueue, SharedMemoryBlock};
use parking_lot::Mutex;

/// The transport a channel runs over. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Queue,
    Pipe,
    SharedMemory,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Queue => "queue",
            ChannelKind::Pipe => "pipe",
            ChannelKind::SharedMemory => "shared-memory",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the endpoint pair created with a pipe channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PipeBinding {
    pub(crate) pair_id: u64,
}

/// Registry entry: one variant per kind, each with only its own state.
///
/// Cloning is cheap and yields handles onto the same transport, so callers
/// can drop the registry lock before blocking.
#[derive(Debug, Clone)]
pub(crate) enum Channel {
    Queue(MessageQueue),
    Pipe(PipeBinding),
    SharedMemory(Arc<Mutex<SharedMemoryBlock>>),
}

impl Channel {
    pub(crate) fn kind(&self) -> ChannelKind {
        match self {
            Channel::Queue(_) => ChannelKind::Queue,
            Channel::Pipe(_) => ChannelKind::Pipe,
            Channel::SharedMemory(_) => ChannelKind::SharedMemory,
        }
    }

    pub(crate) fn as_queue(&self) -> Option<MessageQueue> {
        match self {
            Channel::Queue(queue) => Some(queue.clone()),
            _ => None,
        }
    }

    pub(crate) fn as_pipe(&self) -> Option<PipeBinding> {
        match self {
            Channel::Pipe(binding) => Some(*binding),
            _ => None,
        }
    }

    pub(crate) fn as_shared_memory(&self) -> Option<Arc<Mutex<SharedMemoryBlock>>> {
        match self {
            Channel::SharedMemory(block) => Some(Arc::clone(block)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let queue = Channel::Queue(MessageQueue::new());
        assert_eq!(queue.kind(), ChannelKind::Queue);
        assert!(queue.as_queue().is_some());
        assert!(queue.as_pipe().is_none());
        assert!(queue.as_shared_memory().is_none());

        let pipe = Channel::Pipe(PipeBinding { pair_id: 7 });
        assert_eq!(pipe.kind(), ChannelKind::Pipe);
        assert_eq!(pipe.as_pipe(), Some(PipeBinding { pair_id: 7 }));
    }

    #[test]
    fn kind_display() {
        assert_eq!(ChannelKind::Queue.to_string(), "queue");
        assert_eq!(ChannelKind::Pipe.to_string(), "pipe");
        assert_eq!(ChannelKind::SharedMemory.to_string(), "shared-memory");
    }
}
