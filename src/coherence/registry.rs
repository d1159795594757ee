//! Type-erased view of a cache manager, and its registration record.

use std::sync::Arc;

use regex::Regex;

use super::tier::CacheTier;
use crate::cache::{CacheManagerHandle, NamespaceStats, StoreKind};

/// What the coherence layer needs from a cache, independent of its value type.
///
/// Every operation is scoped to one namespace except `cleanup`, `persist` and
/// `advance_tick`, which act on the whole underlying store.
pub trait CoherentCache: Send + Sync {
    fn store_kind(&self) -> StoreKind;

    /// Removes every entry of `namespace`. Returns the count removed.
    fn clear(&self, namespace: &str) -> usize;

    /// Removes one entry. Returns `true` if it existed.
    fn invalidate(&self, key: &str, namespace: &str) -> bool;

    /// Removes entries of `namespace` whose key matches. Returns the count removed.
    fn invalidate_pattern(&self, pattern: &Regex, namespace: &str) -> usize;

    /// Drops expired entries. Returns the count removed.
    fn cleanup(&self) -> usize;

    /// Writes dirty entries where the store is durable. Returns the count written.
    fn persist(&self) -> usize;

    fn stats(&self, namespace: &str) -> NamespaceStats;

    /// Evicts up to `count` least-recently-accessed entries of `namespace`.
    ///
    /// `None` means the cache has no LRU primitive. Budget enforcement then
    /// falls back to [`CoherentCache::cleanup`], which only removes expired
    /// entries and may leave the cache over budget.
    fn evict_lru(&self, _namespace: &str, _count: usize) -> Option<usize> {
        None
    }

    /// Forwards the host's per-step tick marker.
    fn advance_tick(&self) {}
}

impl<T: Send + 'static> CoherentCache for CacheManagerHandle<T> {
    fn store_kind(&self) -> StoreKind {
        CacheManagerHandle::store_kind(self)
    }

    fn clear(&self, namespace: &str) -> usize {
        CacheManagerHandle::clear(self, namespace)
    }

    fn invalidate(&self, key: &str, namespace: &str) -> bool {
        CacheManagerHandle::invalidate(self, key, namespace)
    }

    fn invalidate_pattern(&self, pattern: &Regex, namespace: &str) -> usize {
        CacheManagerHandle::invalidate_pattern(self, pattern, namespace)
    }

    fn cleanup(&self) -> usize {
        CacheManagerHandle::cleanup(self)
    }

    fn persist(&self) -> usize {
        CacheManagerHandle::persist(self)
    }

    fn stats(&self, namespace: &str) -> NamespaceStats {
        CacheManagerHandle::stats(self, namespace)
    }

    fn evict_lru(&self, namespace: &str, count: usize) -> Option<usize> {
        Some(self.lock().evict_lru(namespace, count))
    }

    fn advance_tick(&self) {
        self.lock().advance_tick();
    }
}

/// Options for [`super::CacheCoherence::register_cache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Overrides the tier's default priority.
    pub priority: Option<i32>,
    /// Per-cache cap, enforced before the global budget.
    pub max_memory_bytes: Option<usize>,
}

impl RegisterOptions {
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn max_memory_bytes(mut self, bytes: usize) -> Self {
        self.max_memory_bytes = Some(bytes);
        self
    }
}

/// One namespace of one cache, as seen by the coherence layer. Owns no data.
#[derive(Clone)]
pub struct RegisteredCache {
    pub namespace: String,
    pub tier: CacheTier,
    /// Lower is evicted first.
    pub priority: i32,
    pub max_memory_bytes: Option<usize>,
    cache: Arc<dyn CoherentCache>,
}

impl RegisteredCache {
    pub fn new(
        namespace: String,
        cache: Arc<dyn CoherentCache>,
        tier: CacheTier,
        options: RegisterOptions,
    ) -> Self {
        Self {
            namespace,
            tier,
            priority: options.priority.unwrap_or_else(|| tier.default_priority()),
            max_memory_bytes: options.max_memory_bytes,
            cache,
        }
    }

    #[inline]
    pub fn cache(&self) -> &dyn CoherentCache {
        self.cache.as_ref()
    }

    #[inline]
    pub fn stats(&self) -> NamespaceStats {
        self.cache.stats(&self.namespace)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.stats().size
    }

    /// Evicts up to `count` entries, via LRU when available, else via cleanup.
    pub(crate) fn evict(&self, count: usize) -> usize {
        match self.cache.evict_lru(&self.namespace, count) {
            Some(evicted) => evicted,
            None => self.cache.cleanup(),
        }
    }
}

impl std::fmt::Debug for RegisteredCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCache")
            .field("namespace", &self.namespace)
            .field("tier", &self.tier)
            .field("priority", &self.priority)
            .field("max_memory_bytes", &self.max_memory_bytes)
            .field("store", &self.cache.store_kind())
            .finish()
    }
}
