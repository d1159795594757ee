//! Write-behind durable store: a volatile front layer over a flat snapshot.
//!
//! Writes land in the front layer immediately and are flushed to the snapshot
//! by a throttled [`CacheStore::persist`]. The snapshot is read once per store
//! lifetime, on first access ("rehydration"), which is the only recovery path
//! after a full state reset.
//!
//! Store keys are the cache manager's composite keys. The snapshot keeps one
//! record per namespace holding the caller's keys; a key without a namespace
//! lands in the record named `""`.

pub mod config;
pub mod error;
pub mod model;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use config::{DEFAULT_SEGMENT, DurableStoreConfig};
pub use error::{SnapshotError, SnapshotResult};
pub use model::{PersistedEntry, SnapshotIndex, SnapshotRecord};
pub use snapshot::{FileSnapshot, MemorySnapshot, SnapshotBackend};

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::backend::CacheStore;
use super::volatile::VolatileStore;
use crate::cache::{CachedEntry, StoreKind, compose_key, split_key};
use crate::clock::TickClock;
use crate::constants::Tick;
use model::{PersistedEntryRef, PersistedMeta};

/// `(namespace, key)` of the record entry backing a store key.
#[inline]
fn record_key(composite: &str) -> (&str, &str) {
    split_key(composite).unwrap_or(("", composite))
}

/// Inverse of [`record_key`].
#[inline]
fn store_key(namespace: &str, key: &str) -> String {
    if namespace.is_empty() {
        key.to_string()
    } else {
        compose_key(namespace, key)
    }
}

pub struct DurableStore<T> {
    front: VolatileStore<T>,
    backend: Arc<dyn SnapshotBackend>,
    config: DurableStoreConfig,
    clock: TickClock,
    /// Namespace records; `None` until rehydrated.
    records: Option<BTreeMap<String, SnapshotRecord>>,
    /// Records changed without a matching backend write.
    dirty_records: BTreeSet<String>,
    /// The namespace index changed without a matching backend write.
    index_dirty: bool,
    last_persist: Option<Tick>,
}

impl<T> DurableStore<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    pub fn new(
        clock: TickClock,
        backend: Arc<dyn SnapshotBackend>,
        config: DurableStoreConfig,
    ) -> Self {
        Self {
            front: VolatileStore::new(clock.clone()),
            backend,
            config,
            clock,
            records: None,
            dirty_records: BTreeSet::new(),
            index_dirty: false,
            last_persist: None,
        }
    }

    pub fn config(&self) -> &DurableStoreConfig {
        &self.config
    }

    pub fn segment(&self) -> &str {
        &self.config.segment
    }

    /// Returns `true` once the snapshot has been read.
    pub fn is_hydrated(&self) -> bool {
        self.records.is_some()
    }

    /// Tick of the last persistence pass that ran (throttled or not).
    pub fn last_persist(&self) -> Option<Tick> {
        self.last_persist
    }

    /// Front-layer entries not yet written to the snapshot.
    pub fn dirty_count(&self) -> usize {
        self.front.entries().filter(|(_, e)| e.dirty).count()
    }

    /// Store keys currently held by the snapshot layer.
    pub fn snapshot_keys(&mut self) -> Vec<String> {
        self.records_mut()
            .iter()
            .flat_map(|(namespace, record)| {
                record
                    .entries
                    .keys()
                    .map(move |key| store_key(namespace, key))
            })
            .collect()
    }

    pub fn snapshot_contains(&mut self, key: &str) -> bool {
        let (namespace, key) = record_key(key);
        self.records_mut()
            .get(namespace)
            .is_some_and(|record| record.entries.contains_key(key))
    }

    /// Namespaces with a snapshot record.
    pub fn snapshot_namespaces(&mut self) -> Vec<String> {
        self.records_mut().keys().cloned().collect()
    }

    /// Persists immediately, ignoring the persist interval.
    pub fn flush(&mut self) -> usize {
        self.ensure_hydrated();
        let now = self.clock.now();
        self.write_dirty(now)
    }

    fn ensure_hydrated(&mut self) {
        if self.records.is_none() {
            self.rehydrate_from_snapshot();
        }
    }

    fn records_mut(&mut self) -> &mut BTreeMap<String, SnapshotRecord> {
        self.ensure_hydrated();
        self.records.get_or_insert_with(BTreeMap::new)
    }

    /// Drops `key` from its namespace record. Returns `true` if it was there.
    fn forget_record(&mut self, key: &str) -> bool {
        let (namespace, key) = record_key(key);
        let removed = self
            .records_mut()
            .get_mut(namespace)
            .is_some_and(|record| record.entries.remove(key).is_some());
        if removed {
            self.dirty_records.insert(namespace.to_string());
        }
        removed
    }

    fn load_index(&mut self) -> SnapshotIndex {
        let segment = self.config.segment.as_str();
        match self.backend.load(segment) {
            Ok(Some(bytes)) => match SnapshotIndex::decode(&bytes) {
                Ok(index) => index,
                Err(e) => {
                    warn!(segment, error = %e, "Snapshot index unreadable, starting empty");
                    self.index_dirty = true;
                    SnapshotIndex::empty()
                }
            },
            Ok(None) => SnapshotIndex::empty(),
            Err(e) => {
                warn!(segment, error = %e, "Snapshot index load failed, starting empty");
                SnapshotIndex::empty()
            }
        }
    }

    fn load_records(&mut self) -> BTreeMap<String, SnapshotRecord> {
        let index = self.load_index();
        let mut records = BTreeMap::new();

        for namespace in index.namespaces {
            let segment = self.config.namespace_segment(&namespace);
            let record = match self.backend.load(&segment) {
                Ok(Some(bytes)) => match SnapshotRecord::decode(&bytes) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(segment = %segment, error = %e, "Snapshot record unreadable, starting empty");
                        self.dirty_records.insert(namespace.clone());
                        SnapshotRecord::empty()
                    }
                },
                Ok(None) => {
                    debug!(segment = %segment, "Indexed snapshot record missing");
                    self.index_dirty = true;
                    continue;
                }
                Err(e) => {
                    warn!(segment = %segment, error = %e, "Snapshot record load failed, starting empty");
                    SnapshotRecord::empty()
                }
            };
            records.insert(namespace, record);
        }
        records
    }

    /// Copies every live snapshot record missing from the front layer into it.
    ///
    /// Reads the backend only the first time; later calls replay the in-memory
    /// snapshot layer, so repeated calls never resurrect deleted keys.
    fn rehydrate_from_snapshot(&mut self) -> usize {
        let now = self.clock.now();
        let mut records = match self.records.take() {
            Some(records) => records,
            None => self.load_records(),
        };

        let mut restored = 0usize;
        let mut malformed = 0usize;
        let mut expired = 0usize;

        for (namespace, record) in records.iter_mut() {
            let front = &mut self.front;
            let before = record.entries.len();

            record.entries.retain(|key, raw| {
                match PersistedEntry::<T>::deserialize(&*raw) {
                    Err(e) => {
                        debug!(namespace = %namespace, key = %key, error = %e, "Dropping malformed snapshot entry");
                        malformed += 1;
                        false
                    }
                    Ok(persisted) => {
                        let entry = persisted.into_entry();
                        if entry.is_expired(now) {
                            expired += 1;
                            return false;
                        }
                        let composite = store_key(namespace, key);
                        if !front.contains(&composite) {
                            front.set(&composite, entry);
                            restored += 1;
                        }
                        true
                    }
                }
            });

            if record.entries.len() < before {
                self.dirty_records.insert(namespace.clone());
            }
        }

        info!(
            segment = %self.config.segment,
            namespaces = records.len(),
            restored,
            malformed,
            expired,
            "Durable store rehydrated"
        );

        self.records = Some(records);
        restored
    }

    fn write_dirty(&mut self, now: Tick) -> usize {
        let mut records = self.records.take().unwrap_or_default();
        let mut written = Vec::new();

        for (composite, entry) in self.front.entries() {
            if !entry.dirty || entry.is_expired(now) {
                continue;
            }
            let value = match serde_json::to_value(PersistedEntryRef::from(entry)) {
                Ok(value) => value,
                Err(e) => {
                    warn!(key = %composite, error = %e, "Failed to serialize entry, leaving it dirty");
                    continue;
                }
            };
            let (namespace, key) = record_key(composite);
            let record = match records.entry(namespace.to_string()) {
                Entry::Occupied(occupied) => occupied.into_mut(),
                Entry::Vacant(vacant) => {
                    self.index_dirty = true;
                    vacant.insert(SnapshotRecord::empty())
                }
            };
            record.entries.insert(key.to_string(), value);
            self.dirty_records.insert(namespace.to_string());
            written.push(composite.clone());
        }

        self.last_persist = Some(now);

        if self.dirty_records.is_empty() && !self.index_dirty {
            self.records = Some(records);
            return 0;
        }

        let mut failed = BTreeSet::new();
        for namespace in std::mem::take(&mut self.dirty_records) {
            let Some(record) = records.get_mut(&namespace) else {
                continue;
            };
            record.last_sync = now;
            let segment = self.config.namespace_segment(&namespace);
            let result = record
                .encode()
                .and_then(|bytes| self.backend.save(&segment, &bytes));
            if let Err(e) = result {
                warn!(segment = %segment, error = %e, "Snapshot write failed, will retry");
                failed.insert(namespace);
            }
        }

        if self.index_dirty {
            let segment = self.config.segment.as_str();
            let result = SnapshotIndex::new(records.keys().cloned())
                .encode()
                .and_then(|bytes| self.backend.save(segment, &bytes));
            match result {
                Ok(()) => self.index_dirty = false,
                Err(e) => warn!(segment, error = %e, "Snapshot index write failed, will retry"),
            }
        }
        self.records = Some(records);

        let mut persisted = 0usize;
        for composite in &written {
            if failed.contains(record_key(composite).0) {
                continue;
            }
            if let Some(entry) = self.front.entry_mut(composite) {
                entry.dirty = false;
            }
            persisted += 1;
        }
        self.dirty_records = failed;

        debug!(
            segment = %self.config.segment,
            written = persisted,
            tick = now,
            "Snapshot persisted"
        );
        persisted
    }
}

impl<T> CacheStore<T> for DurableStore<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    fn kind(&self) -> StoreKind {
        StoreKind::Durable
    }

    fn advance_tick(&mut self, tick: Tick) {
        self.front.advance_tick(tick);
    }

    fn get(&mut self, key: &str) -> Option<&mut CachedEntry<T>> {
        self.ensure_hydrated();
        let now = self.clock.now();
        let entry = self.front.entry_mut(key)?;
        // First read in a tick marks the entry for write-back; later reads in
        // the same tick are free.
        if entry.last_accessed_at < now {
            entry.dirty = true;
        }
        Some(entry)
    }

    fn peek(&mut self, key: &str) -> Option<&CachedEntry<T>> {
        self.ensure_hydrated();
        self.front.peek(key)
    }

    fn set(&mut self, key: &str, mut entry: CachedEntry<T>) {
        self.ensure_hydrated();
        entry.dirty = true;
        self.front.set(key, entry);
    }

    fn remove(&mut self, key: &str) -> Option<CachedEntry<T>> {
        self.ensure_hydrated();
        let removed = self.front.remove(key);
        self.forget_record(key);
        removed
    }

    fn has(&mut self, key: &str) -> bool {
        self.ensure_hydrated();
        self.front.has(key)
    }

    fn keys(&mut self) -> Vec<String> {
        self.ensure_hydrated();
        self.front.keys()
    }

    fn size(&mut self) -> usize {
        self.ensure_hydrated();
        self.front.size()
    }

    fn clear(&mut self) {
        self.ensure_hydrated();
        self.front.clear();
        if let Some(records) = self.records.as_mut() {
            for (namespace, record) in records.iter_mut() {
                if !record.entries.is_empty() {
                    record.entries.clear();
                    self.dirty_records.insert(namespace.clone());
                }
            }
        }
    }

    /// Drops expired front entries together with their snapshot records, so a
    /// value overwritten before its expiry cannot come back on rehydration.
    fn cleanup(&mut self) -> usize {
        self.ensure_hydrated();
        let now = self.clock.now();

        let expired = self.front.drain_expired(now);
        for key in &expired {
            self.forget_record(key);
        }

        let mut pruned = 0usize;
        if let Some(records) = self.records.as_mut() {
            for (namespace, record) in records.iter_mut() {
                let before = record.entries.len();
                record.entries.retain(|_, raw| {
                    PersistedMeta::deserialize(&*raw).is_ok_and(|meta| !meta.is_expired(now))
                });
                if record.entries.len() < before {
                    pruned += before - record.entries.len();
                    self.dirty_records.insert(namespace.clone());
                }
            }
        }
        if pruned > 0 {
            debug!(pruned, tick = now, "Pruned expired snapshot records");
        }
        expired.len()
    }

    fn flush(&mut self) -> usize {
        DurableStore::flush(self)
    }

    fn persist(&mut self) -> usize {
        self.ensure_hydrated();
        let now = self.clock.now();
        if let Some(last) = self.last_persist {
            if now.saturating_sub(last) < self.config.persist_interval_ticks {
                debug!(
                    segment = %self.config.segment,
                    last,
                    tick = now,
                    "Persist throttled"
                );
                return 0;
            }
        }
        self.write_dirty(now)
    }

    fn rehydrate(&mut self) -> usize {
        self.rehydrate_from_snapshot()
    }
}

impl<T> std::fmt::Debug for DurableStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore")
            .field("segment", &self.config.segment)
            .field("front", &self.front)
            .field("hydrated", &self.records.is_some())
            .field("dirty_records", &self.dirty_records.len())
            .field("last_persist", &self.last_persist)
            .finish_non_exhaustive()
    }
}
