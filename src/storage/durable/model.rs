//! Persisted snapshot layout.
//!
//! One record per namespace, saved under the segment
//! `<store segment>/<namespace>` and keyed by the caller's own keys:
//!
//! ```json
//! { "version": 1, "lastSync": 1200,
//!   "entries": { "<key>": { "value": ..., "createdAt": 1100, "ttl": 500, "accessCount": 3 } } }
//! ```
//!
//! The store segment itself holds a [`SnapshotIndex`] naming the namespaces
//! that have a record. `dirty` and `lastAccessedAt` are front-layer only and
//! never persisted. Entries stay as raw JSON until rehydration so one
//! malformed key cannot poison the whole record.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{SnapshotError, SnapshotResult};
use crate::cache::CachedEntry;
use crate::constants::{SNAPSHOT_FORMAT_VERSION, Tick};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub version: u32,
    pub last_sync: Tick,
    #[serde(default)]
    pub entries: BTreeMap<String, Value>,
}

impl SnapshotRecord {
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_FORMAT_VERSION,
            last_sync: 0,
            entries: BTreeMap::new(),
        }
    }

    /// Decodes a record, rejecting versions this build does not understand.
    pub fn decode(bytes: &[u8]) -> SnapshotResult<Self> {
        let record: SnapshotRecord = serde_json::from_slice(bytes)?;
        if record.version == 0 || record.version > SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: record.version,
                supported: SNAPSHOT_FORMAT_VERSION,
            });
        }
        Ok(record)
    }

    pub fn encode(&self) -> SnapshotResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl Default for SnapshotRecord {
    fn default() -> Self {
        Self::empty()
    }
}

/// Namespaces of one durable store that have a persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotIndex {
    pub version: u32,
    #[serde(default)]
    pub namespaces: BTreeSet<String>,
}

impl SnapshotIndex {
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn new(namespaces: impl IntoIterator<Item = String>) -> Self {
        Self {
            version: SNAPSHOT_FORMAT_VERSION,
            namespaces: namespaces.into_iter().collect(),
        }
    }

    pub fn decode(bytes: &[u8]) -> SnapshotResult<Self> {
        let index: SnapshotIndex = serde_json::from_slice(bytes)?;
        if index.version == 0 || index.version > SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: index.version,
                supported: SNAPSHOT_FORMAT_VERSION,
            });
        }
        Ok(index)
    }

    pub fn encode(&self) -> SnapshotResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One persisted entry.
pub struct PersistedEntry<T> {
    pub value: T,
    pub created_at: Tick,
    pub ttl: Option<Tick>,
    #[serde(default)]
    pub access_count: u64,
}

impl<T> PersistedEntry<T> {
    /// Converts into a clean (already persisted) front-layer entry.
    pub fn into_entry(self) -> CachedEntry<T> {
        CachedEntry {
            value: self.value,
            created_at: self.created_at,
            last_accessed_at: self.created_at,
            ttl: self.ttl,
            access_count: self.access_count,
            dirty: false,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersistedEntryRef<'a, T> {
    pub value: &'a T,
    pub created_at: Tick,
    pub ttl: Option<Tick>,
    pub access_count: u64,
}

impl<'a, T> From<&'a CachedEntry<T>> for PersistedEntryRef<'a, T> {
    fn from(entry: &'a CachedEntry<T>) -> Self {
        Self {
            value: &entry.value,
            created_at: entry.created_at,
            ttl: entry.ttl,
            access_count: entry.access_count,
        }
    }
}

/// Expiry fields only, readable without knowing the value type.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersistedMeta {
    pub created_at: Tick,
    pub ttl: Option<Tick>,
}

impl PersistedMeta {
    #[inline]
    pub fn is_expired(&self, now: Tick) -> bool {
        self.ttl
            .is_some_and(|ttl| now.saturating_sub(self.created_at) > ttl)
    }
}
