use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sender metadata carried in every envelope.
///
/// Fields are declared in lexicographic order: the derived serializer then
/// emits keys sorted, which is the canonical form that gets signed. Keep new
/// fields in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvelopeMeta {
    /// Caller-supplied sender identifier.
    pub client_id: String,
    /// Packaging time, seconds since the Unix epoch.
    pub ts: u64,
}

impl EnvelopeMeta {
    /// Metadata for `client_id`, stamped with the current time.
    pub fn now(client_id: impl Into<String>) -> Self {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::with_timestamp(client_id, ts)
    }

    /// Metadata with an explicit timestamp.
    pub fn with_timestamp(client_id: impl Into<String>, ts: u64) -> Self {
        Self {
            client_id: client_id.into(),
            ts,
        }
    }

    /// Compact JSON with sorted keys and no whitespace.
    ///
    /// Non-ASCII characters in `client_id` are written as raw UTF-8, not as
    /// `\uXXXX` escapes. Signers that escape them (Python's `json.dumps`
    /// default, for one) produce different bytes and their MACs will not
    /// verify here for such ids. ASCII ids are byte-identical.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
