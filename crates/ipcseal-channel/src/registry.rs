use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ipcseal_security::{AccessControl, EnvelopeMeta, SecurityContext};
use ipcseal_transport::{pipe_pair, MessageQueue, SharedMemoryBlock};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::channel::{Channel, ChannelKind, PipeBinding};
use crate::config::RegistryConfig;
use crate::envelope::{package, unpackage};
use crate::error::{ChannelError, Result};
use crate::pipe::{PipeEndpoint, PipeSide};

/// Named channels plus the security context and ACL they are checked
/// against.
///
/// Every send and receive follows the same order: resolve the name, check
/// the kind, check the caller against the ACL, and only then touch the
/// transport. A rejected call never enqueues, dequeues or overwrites
/// anything.
///
/// All methods take `&self`; share the registry across threads with an
/// `Arc`. Blocking receives do not hold the registry lock.
pub struct ChannelRegistry {
    security: Arc<SecurityContext>,
    acl: Arc<AccessControl>,
    channels: RwLock<HashMap<String, Channel>>,
    config: RegistryConfig,
    next_pair_id: AtomicU64,
}

impl ChannelRegistry {
    /// Create an empty registry with default settings.
    pub fn new(security: Arc<SecurityContext>, acl: Arc<AccessControl>) -> Self {
        Self::with_config(security, acl, RegistryConfig::default())
    }

    pub fn with_config(
        security: Arc<SecurityContext>,
        acl: Arc<AccessControl>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            security,
            acl,
            channels: RwLock::new(HashMap::new()),
            config,
            next_pair_id: AtomicU64::new(1),
        }
    }

    pub fn security(&self) -> &SecurityContext {
        &self.security
    }

    pub fn access_control(&self) -> &AccessControl {
        &self.acl
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Kind of the channel registered under `name`, if any.
    pub fn kind(&self, name: &str) -> Option<ChannelKind> {
        self.channels.read().get(name).map(Channel::kind)
    }

    /// Registered channel names, sorted.
    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.read().keys().cloned().collect();
        names.sort();
        names
    }

    // --- creation -------------------------------------------------------

    /// Register an unbounded FIFO queue channel.
    pub fn create_queue(&self, name: &str) -> Result<()> {
        self.insert(name, || Ok((Channel::Queue(MessageQueue::new()), ())))?;
        info!(channel = name, kind = %ChannelKind::Queue, "channel created");
        Ok(())
    }

    /// Register a pipe channel and hand back both of its endpoints.
    ///
    /// The registry keeps no transport state for pipes; the endpoints are
    /// the only way to move data and are tied to this channel name.
    pub fn create_pipe(&self, name: &str) -> Result<(PipeEndpoint, PipeEndpoint)> {
        let pair_id = self.next_pair_id.fetch_add(1, Ordering::Relaxed);
        let endpoints = self.insert(name, || {
            let (left, right) = pipe_pair()?;
            let frame = &self.config.pipe_frame;
            let endpoints = (
                PipeEndpoint::new(name, pair_id, PipeSide::Left, left, frame)?,
                PipeEndpoint::new(name, pair_id, PipeSide::Right, right, frame)?,
            );
            Ok((Channel::Pipe(PipeBinding { pair_id }), endpoints))
        })?;
        info!(channel = name, kind = %ChannelKind::Pipe, pair_id, "channel created");
        Ok(endpoints)
    }

    /// Register a shared memory channel backed by a fresh block of `size`
    /// bytes, zero-filled.
    pub fn create_shared_memory(&self, name: &str, size: usize) -> Result<()> {
        self.insert(name, || {
            let block = SharedMemoryBlock::create(size)?;
            Ok((Channel::SharedMemory(Arc::new(Mutex::new(block))), ()))
        })?;
        info!(channel = name, kind = %ChannelKind::SharedMemory, size, "channel created");
        Ok(())
    }

    /// [`create_shared_memory`](Self::create_shared_memory) with the
    /// configured default size.
    pub fn create_shared_memory_default(&self, name: &str) -> Result<()> {
        self.create_shared_memory(name, self.config.default_shm_size)
    }

    // --- queue ----------------------------------------------------------

    /// Seal `message` as `client_id` and append it to the queue.
    pub fn send_queue(&self, name: &str, client_id: &str, message: &[u8]) -> Result<()> {
        let queue = self.checkout(name, client_id, ChannelKind::Queue, Channel::as_queue)?;
        let wire = package(&self.security, client_id, message)?;
        queue.put(wire)?;
        debug!(channel = name, client_id, len = message.len(), "queue send");
        Ok(())
    }

    /// Take the oldest envelope off the queue, verify and open it.
    ///
    /// `None` waits indefinitely, `Some(Duration::ZERO)` returns
    /// [`QueueEmpty`](ChannelError::QueueEmpty) immediately when nothing is
    /// queued, any other duration yields [`Timeout`](ChannelError::Timeout)
    /// once it elapses.
    pub fn recv_queue(
        &self,
        name: &str,
        client_id: &str,
        timeout: Option<Duration>,
    ) -> Result<(EnvelopeMeta, Vec<u8>)> {
        let queue = self.checkout(name, client_id, ChannelKind::Queue, Channel::as_queue)?;
        let wire = queue.get(timeout)?;
        let opened = unpackage(&self.security, &wire)?;
        debug!(channel = name, client_id, sender = %opened.0.client_id, "queue recv");
        Ok(opened)
    }

    // --- pipe -----------------------------------------------------------

    /// Seal `message` and write it to the pipe through `endpoint`.
    pub fn send_pipe(
        &self,
        name: &str,
        endpoint: &mut PipeEndpoint,
        client_id: &str,
        message: &[u8],
    ) -> Result<()> {
        self.check_endpoint(name, endpoint, client_id)?;
        let wire = package(&self.security, client_id, message)?;
        endpoint.send_frame(&wire)?;
        debug!(channel = name, client_id, len = message.len(), "pipe send");
        Ok(())
    }

    /// Read one envelope from `endpoint`, verify and open it.
    ///
    /// `None` waits indefinitely; otherwise waits at most `timeout` for data
    /// to arrive.
    pub fn recv_pipe(
        &self,
        name: &str,
        endpoint: &mut PipeEndpoint,
        client_id: &str,
        timeout: Option<Duration>,
    ) -> Result<(EnvelopeMeta, Vec<u8>)> {
        self.check_endpoint(name, endpoint, client_id)?;
        let wire = endpoint.recv_frame(timeout)?;
        let opened = unpackage(&self.security, &wire)?;
        debug!(channel = name, client_id, sender = %opened.0.client_id, "pipe recv");
        Ok(opened)
    }

    // --- shared memory --------------------------------------------------

    /// Seal `message` and overwrite the block with it, zero-padded.
    ///
    /// Fails with [`MessageTooLarge`](ChannelError::MessageTooLarge) and
    /// leaves the block untouched when the sealed envelope does not fit.
    pub fn write_shared_memory(&self, name: &str, client_id: &str, message: &[u8]) -> Result<()> {
        let block = self.checkout(
            name,
            client_id,
            ChannelKind::SharedMemory,
            Channel::as_shared_memory,
        )?;
        let wire = package(&self.security, client_id, message)?;
        block.lock().write_zero_padded(&wire)?;
        debug!(channel = name, client_id, len = wire.len(), "shared memory write");
        Ok(())
    }

    /// Read the envelope currently in the block. Non-destructive.
    pub fn read_shared_memory(&self, name: &str, client_id: &str) -> Result<(EnvelopeMeta, Vec<u8>)> {
        let block = self.checkout(
            name,
            client_id,
            ChannelKind::SharedMemory,
            Channel::as_shared_memory,
        )?;
        let wire = block.lock().read_until_nul();
        if wire.is_empty() {
            return Err(ChannelError::EmptyMessage);
        }
        let opened = unpackage(&self.security, &wire)?;
        debug!(channel = name, client_id, sender = %opened.0.client_id, "shared memory read");
        Ok(opened)
    }

    /// OS-level name of the block, for attaching from another process.
    pub fn shared_memory_os_name(&self, name: &str) -> Result<String> {
        let block = self.lookup(name, ChannelKind::SharedMemory, Channel::as_shared_memory)?;
        let os_name = block.lock().os_name().to_string();
        Ok(os_name)
    }

    /// Drop the channel and release its OS object.
    ///
    /// The registry entry is removed even when the OS release fails; that
    /// failure is logged and not reported.
    pub fn unlink_shared_memory(&self, name: &str) -> Result<()> {
        let block = {
            let mut channels = self.channels.write();
            let channel = channels
                .get(name)
                .ok_or_else(|| ChannelError::ChannelNotFound(name.to_string()))?;
            let block = channel.as_shared_memory().ok_or_else(|| ChannelError::WrongChannelKind {
                channel: name.to_string(),
                expected: ChannelKind::SharedMemory,
                actual: channel.kind(),
            })?;
            channels.remove(name);
            block
        };

        if let Err(err) = block.lock().unlink() {
            warn!(channel = name, error = %err, "shared memory release failed");
        }
        info!(channel = name, "shared memory unlinked");
        Ok(())
    }

    // --- internals ------------------------------------------------------

    /// Insert a new channel built by `build`, rejecting duplicate names.
    /// `build` runs under the write lock so a lost race creates nothing.
    fn insert<T>(&self, name: &str, build: impl FnOnce() -> Result<(Channel, T)>) -> Result<T> {
        let mut channels = self.channels.write();
        if channels.contains_key(name) {
            return Err(ChannelError::ChannelExists(name.to_string()));
        }
        let (channel, extra) = build()?;
        channels.insert(name.to_string(), channel);
        Ok(extra)
    }

    /// Resolve `name` and extract the state for `expected`, without an ACL
    /// check. The registry lock is released on return.
    fn lookup<T>(
        &self,
        name: &str,
        expected: ChannelKind,
        extract: fn(&Channel) -> Option<T>,
    ) -> Result<T> {
        let channels = self.channels.read();
        let channel = channels
            .get(name)
            .ok_or_else(|| ChannelError::ChannelNotFound(name.to_string()))?;
        extract(channel).ok_or_else(|| ChannelError::WrongChannelKind {
            channel: name.to_string(),
            expected,
            actual: channel.kind(),
        })
    }

    /// [`lookup`](Self::lookup) followed by the ACL check.
    fn checkout<T>(
        &self,
        name: &str,
        client_id: &str,
        expected: ChannelKind,
        extract: fn(&Channel) -> Option<T>,
    ) -> Result<T> {
        let state = self.lookup(name, expected, extract)?;
        if !self.acl.is_allowed(name, client_id) {
            warn!(channel = name, client_id, "access denied");
            return Err(ChannelError::PermissionDenied {
                channel: name.to_string(),
                client_id: client_id.to_string(),
            });
        }
        Ok(state)
    }

    fn check_endpoint(&self, name: &str, endpoint: &PipeEndpoint, client_id: &str) -> Result<()> {
        let binding = self.checkout(name, client_id, ChannelKind::Pipe, Channel::as_pipe)?;
        if endpoint.channel() != name || endpoint.pair_id() != binding.pair_id {
            return Err(ChannelError::ForeignEndpoint {
                channel: name.to_string(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("channels", &self.channel_names())
            .field("security", &self.security)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use ipcseal_transport::TransportError;

    use super::*;

    fn registry() -> ChannelRegistry {
        let security = Arc::new(SecurityContext::new(b"registry-test".to_vec()).unwrap());
        ChannelRegistry::new(security, Arc::new(AccessControl::new()))
    }

    #[test]
    fn duplicate_name_rejected_across_kinds() {
        let reg = registry();
        reg.create_queue("a").unwrap();
        assert!(matches!(
            reg.create_queue("a"),
            Err(ChannelError::ChannelExists(name)) if name == "a"
        ));
        assert!(matches!(
            reg.create_shared_memory("a", 64),
            Err(ChannelError::ChannelExists(_))
        ));
        assert!(matches!(
            reg.create_pipe("a"),
            Err(ChannelError::ChannelExists(_))
        ));
        assert_eq!(reg.kind("a"), Some(ChannelKind::Queue));
    }

    #[test]
    fn zero_sized_block_rejected_and_not_registered() {
        let reg = registry();
        assert!(matches!(
            reg.create_shared_memory("shm", 0),
            Err(ChannelError::Transport(TransportError::InvalidSize(0)))
        ));
        assert_eq!(reg.kind("shm"), None);
    }

    #[test]
    fn names_are_sorted() {
        let reg = registry();
        reg.create_queue("b").unwrap();
        reg.create_shared_memory("c", 32).unwrap();
        let _ends = reg.create_pipe("a").unwrap();
        assert_eq!(reg.channel_names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn unknown_channel_before_acl() {
        let reg = registry();
        assert!(matches!(
            reg.send_queue("missing", "A", b"x"),
            Err(ChannelError::ChannelNotFound(_))
        ));
    }

    #[test]
    fn kind_checked_before_acl() {
        let reg = registry();
        reg.create_queue("q").unwrap();
        assert!(matches!(
            reg.read_shared_memory("q", "nobody"),
            Err(ChannelError::WrongChannelKind {
                expected: ChannelKind::SharedMemory,
                actual: ChannelKind::Queue,
                ..
            })
        ));
    }

    #[test]
    fn denied_send_does_not_enqueue() {
        let reg = registry();
        reg.create_queue("q").unwrap();
        reg.access_control().allow("q", "A");

        assert!(matches!(
            reg.send_queue("q", "B", b"x"),
            Err(ChannelError::PermissionDenied { .. })
        ));
        assert!(matches!(
            reg.recv_queue("q", "A", Some(Duration::ZERO)),
            Err(ChannelError::QueueEmpty)
        ));
    }

    #[test]
    fn denied_receive_does_not_dequeue() {
        let reg = registry();
        reg.create_queue("q").unwrap();
        reg.access_control().allow("q", "A");
        reg.send_queue("q", "A", b"keep").unwrap();

        assert!(matches!(
            reg.recv_queue("q", "B", Some(Duration::ZERO)),
            Err(ChannelError::PermissionDenied { .. })
        ));
        let (_, message) = reg.recv_queue("q", "A", Some(Duration::ZERO)).unwrap();
        assert_eq!(message, b"keep");
    }

    #[test]
    fn queue_preserves_order() {
        let reg = registry();
        reg.create_queue("q").unwrap();
        reg.access_control().allow("q", "A");
        for i in 0..5u8 {
            reg.send_queue("q", "A", &[i]).unwrap();
        }
        for i in 0..5u8 {
            let (_, message) = reg.recv_queue("q", "A", None).unwrap();
            assert_eq!(message, [i]);
        }
    }

    #[test]
    fn foreign_endpoint_rejected() {
        let reg = registry();
        let (mut p1, _p1_other) = reg.create_pipe("p1").unwrap();
        let (_p2, _p2_other) = reg.create_pipe("p2").unwrap();
        reg.access_control().allow("p2", "A");

        assert!(matches!(
            reg.send_pipe("p2", &mut p1, "A", b"x"),
            Err(ChannelError::ForeignEndpoint { channel }) if channel == "p2"
        ));
    }

    #[test]
    fn pipe_endpoints_carry_channel_name() {
        let reg = registry();
        let (left, right) = reg.create_pipe("p").unwrap();
        assert_eq!(left.channel(), "p");
        assert_eq!(right.channel(), "p");
        assert_eq!(left.side(), PipeSide::Left);
        assert_eq!(right.side(), PipeSide::Right);
    }

    #[test]
    fn fresh_block_reads_empty() {
        let reg = registry();
        reg.create_shared_memory_default("shm").unwrap();
        reg.access_control().allow("shm", "A");
        assert!(matches!(
            reg.read_shared_memory("shm", "A"),
            Err(ChannelError::EmptyMessage)
        ));
    }

    #[test]
    fn shared_memory_read_is_non_destructive() {
        let reg = registry();
        reg.create_shared_memory("shm", 512).unwrap();
        reg.access_control().allow("shm", "A");
        reg.write_shared_memory("shm", "A", b"state").unwrap();

        for _ in 0..3 {
            let (_, message) = reg.read_shared_memory("shm", "A").unwrap();
            assert_eq!(message, b"state");
        }
    }

    #[test]
    fn os_name_is_exposed() {
        let reg = registry();
        reg.create_shared_memory("shm", 64).unwrap();
        let os_name = reg.shared_memory_os_name("shm").unwrap();
        assert!(os_name.starts_with("/ipcseal-"));
    }

    #[test]
    fn unlink_wrong_kind_keeps_entry() {
        let reg = registry();
        reg.create_queue("q").unwrap();
        assert!(matches!(
            reg.unlink_shared_memory("q"),
            Err(ChannelError::WrongChannelKind { .. })
        ));
        assert_eq!(reg.kind("q"), Some(ChannelKind::Queue));
    }

    #[test]
    fn unlink_removes_entry() {
        let reg = registry();
        reg.create_shared_memory("shm", 64).unwrap();
        reg.unlink_shared_memory("shm").unwrap();
        assert_eq!(reg.kind("shm"), None);
        assert!(matches!(
            reg.unlink_shared_memory("shm"),
            Err(ChannelError::ChannelNotFound(_))
        ));
        // name is free again
        reg.create_shared_memory("shm", 64).unwrap();
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let reg = registry();
        let dbg = format!("{reg:?}");
        assert!(!dbg.contains("registry-test"));
    }
}
