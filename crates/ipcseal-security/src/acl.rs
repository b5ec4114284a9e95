use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tracing::debug;

/// Default-deny map from channel name to the caller ids allowed on it.
///
/// A channel that was never passed to [`allow`](Self::allow) rejects every
/// id. Internally synchronized; share it by reference.
#[derive(Debug, Default)]
pub struct AccessControl {
    entries: RwLock<HashMap<String, HashSet<String>>>,
}

impl AccessControl {
    /// Create an empty, deny-everything ACL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `client_id` access to `channel`. Idempotent.
    pub fn allow(&self, channel: &str, client_id: &str) {
        let inserted = self
            .entries
            .write()
            .entry(channel.to_string())
            .or_default()
            .insert(client_id.to_string());
        if inserted {
            debug!(channel, client_id, "acl allow");
        }
    }

    /// Withdraw `client_id` from `channel`. Idempotent; unknown channels and
    /// ids are ignored.
    pub fn revoke(&self, channel: &str, client_id: &str) {
        let mut entries = self.entries.write();
        let Some(ids) = entries.get_mut(channel) else {
            return;
        };
        if ids.remove(client_id) {
            debug!(channel, client_id, "acl revoke");
        }
        if ids.is_empty() {
            entries.remove(channel);
        }
    }

    /// Whether `client_id` may use `channel`.
    pub fn is_allowed(&self, channel: &str, client_id: &str) -> bool {
        self.entries
            .read()
            .get(channel)
            .is_some_and(|ids| ids.contains(client_id))
    }

    /// Ids currently allowed on `channel`, sorted.
    pub fn allowed_ids(&self, channel: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .read()
            .get(channel)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Channels with at least one allowed id, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }
}
