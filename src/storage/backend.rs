use crate::cache::{CachedEntry, StoreKind};
use crate::constants::Tick;

/// Storage contract shared by the volatile and durable backends.
///
/// Keys are opaque composite strings built by the cache manager. Stores never
/// check expiry on reads; [`CacheStore::cleanup`] is the only operation that
/// drops expired entries on its own.
pub trait CacheStore<T>: Send {
    /// Backend kind, for reporting.
    fn kind(&self) -> StoreKind;

    /// Records that the host entered a new step. Never drops data.
    fn advance_tick(&mut self, tick: Tick);

    /// Returns the entry for a read (durable stores track dirtiness here).
    fn get(&mut self, key: &str) -> Option<&mut CachedEntry<T>>;

    /// Returns the entry without treating it as a read.
    fn peek(&mut self, key: &str) -> Option<&CachedEntry<T>>;

    /// Stores `entry` under `key`, replacing any previous entry.
    fn set(&mut self, key: &str, entry: CachedEntry<T>);

    /// Removes and returns the entry under `key`.
    fn remove(&mut self, key: &str) -> Option<CachedEntry<T>>;

    /// Removes the entry under `key`. Returns `true` if something was removed.
    fn delete(&mut self, key: &str) -> bool {
        self.remove(key).is_some()
    }

    fn has(&mut self, key: &str) -> bool;

    fn keys(&mut self) -> Vec<String>;

    fn size(&mut self) -> usize;

    fn clear(&mut self);

    /// Drops entries whose ttl has elapsed. Returns the number removed.
    fn cleanup(&mut self) -> usize {
        0
    }

    /// Writes pending changes to durable storage. Returns the number of entries written.
    fn persist(&mut self) -> usize {
        0
    }

    /// Writes pending changes regardless of any persist throttle.
    fn flush(&mut self) -> usize {
        self.persist()
    }

    /// Restores entries from durable storage. Returns the number restored.
    fn rehydrate(&mut self) -> usize {
        0
    }
}
