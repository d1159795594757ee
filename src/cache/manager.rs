//! Namespaced cache manager over a single [`CacheStore`].
//!
//! Namespaces are a key-composition convention (`namespace ␟ key`), so one
//! store backs any number of them. Each namespace keeps its own recency index,
//! counters and [`NamespaceConfig`].

use std::collections::HashMap;
use std::sync::Arc;

use lru::LruCache;

use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use super::error::{CacheError, CacheResult};
use super::options::{CacheOptions, NamespaceConfig};
use super::types::{CacheStatus, CachedEntry, NamespaceStats, StoreKind};
use crate::clock::TickClock;
use crate::constants::{NAMESPACE_SEPARATOR, Tick};
use crate::storage::{CacheStore, DurableStore, DurableStoreConfig, SnapshotBackend, VolatileStore};

/// Builds the store key for `key` in `namespace`.
#[inline]
pub fn compose_key(namespace: &str, key: &str) -> String {
    let mut composite = String::with_capacity(namespace.len() + key.len() + 1);
    composite.push_str(namespace);
    composite.push(NAMESPACE_SEPARATOR);
    composite.push_str(key);
    composite
}

/// Splits a store key into `(namespace, key)`.
#[inline]
pub fn split_key(composite: &str) -> Option<(&str, &str)> {
    composite.split_once(NAMESPACE_SEPARATOR)
}

#[inline]
fn namespace_prefix(namespace: &str) -> String {
    let mut prefix = String::with_capacity(namespace.len() + 1);
    prefix.push_str(namespace);
    prefix.push(NAMESPACE_SEPARATOR);
    prefix
}

/// Rejects namespaces that would make composite keys ambiguous.
pub fn validate_namespace(namespace: &str) -> CacheResult<()> {
    if namespace.is_empty() || namespace.contains(NAMESPACE_SEPARATOR) {
        return Err(CacheError::InvalidNamespace {
            namespace: namespace.to_string(),
        });
    }
    Ok(())
}

/// Keys of one namespace, most recently accessed first.
struct Recency(LruCache<String, ()>);

impl Recency {
    fn new() -> Self {
        Self(LruCache::unbounded())
    }

    /// Marks `key` most recently accessed, inserting it if absent.
    fn touch(&mut self, key: &str) {
        if self.0.contains(key) {
            self.0.promote(key);
        } else {
            self.0.put(key.to_string(), ());
        }
    }

    fn remove(&mut self, key: &str) {
        self.0.pop(key);
    }

    fn pop_lru(&mut self) -> Option<String> {
        self.0.pop_lru().map(|(key, _)| key)
    }

    /// Least recently accessed first.
    fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.iter().rev().map(|(key, _)| key)
    }

    fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        let stale: Vec<String> = self
            .0
            .iter()
            .filter(|(key, _)| !keep(key.as_str()))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            self.0.pop(key);
        }
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}

struct NamespaceState<T> {
    config: NamespaceConfig<T>,
    recency: Recency,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<T> NamespaceState<T> {
    fn seeded(store: &mut dyn CacheStore<T>, namespace: &str) -> Self {
        Self {
            config: NamespaceConfig::default(),
            recency: seed_recency(store, namespace),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    fn stats(&self) -> NamespaceStats {
        NamespaceStats::new(self.hits, self.misses, self.recency.len(), self.evictions)
    }
}

/// Rebuilds a namespace's recency order from what the store already holds,
/// oldest access first. Entries restored from a snapshot report their
/// `created_at` as last access.
fn seed_recency<T>(store: &mut dyn CacheStore<T>, namespace: &str) -> Recency {
    let prefix = namespace_prefix(namespace);
    let mut seen: Vec<(Tick, String)> = store
        .keys()
        .into_iter()
        .filter_map(|composite| {
            let key = composite.strip_prefix(&prefix)?.to_string();
            let accessed = store.peek(&composite)?.last_accessed_at;
            Some((accessed, key))
        })
        .collect();
    seen.sort();

    let mut recency = Recency::new();
    for (_, key) in &seen {
        recency.touch(key);
    }
    recency
}

fn namespace_state<'a, T>(
    namespaces: &'a mut HashMap<String, NamespaceState<T>>,
    store: &mut dyn CacheStore<T>,
    namespace: &str,
) -> &'a mut NamespaceState<T> {
    namespaces
        .entry(namespace.to_string())
        .or_insert_with(|| NamespaceState::seeded(store, namespace))
}

/// Evicts up to `count` least-recently-accessed entries of one namespace.
fn evict_entries<T>(
    state: &mut NamespaceState<T>,
    store: &mut dyn CacheStore<T>,
    namespace: &str,
    count: usize,
) -> usize {
    let mut evicted = 0;
    while evicted < count {
        let Some(key) = state.recency.pop_lru() else {
            break;
        };
        let Some(entry) = store.remove(&compose_key(namespace, &key)) else {
            // Index outlived the entry (removed behind our back); not an eviction.
            continue;
        };
        evicted += 1;
        state.evictions += 1;
        if let Some(hook) = state.config.on_evict.as_mut() {
            hook(&key, &entry.value);
        }
        trace!(namespace, key = %key, "Evicted entry");
    }
    evicted
}

/// Per-application cache: namespaced get/set with ttl and size-bounded eviction.
pub struct CacheManager<T> {
    store: Box<dyn CacheStore<T>>,
    clock: TickClock,
    namespaces: HashMap<String, NamespaceState<T>>,
}

impl<T: Send + 'static> CacheManager<T> {
    /// Creates a manager over an existing store.
    pub fn new<S>(store: S, clock: TickClock) -> Self
    where
        S: CacheStore<T> + 'static,
    {
        Self {
            store: Box::new(store),
            clock,
            namespaces: HashMap::new(),
        }
    }

    /// Creates a manager over a fresh [`VolatileStore`].
    pub fn volatile(clock: TickClock) -> Self {
        Self::new(VolatileStore::new(clock.clone()), clock)
    }
}

impl<T> CacheManager<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Creates a manager over a [`DurableStore`] persisting into `backend`.
    pub fn durable(
        clock: TickClock,
        backend: Arc<dyn SnapshotBackend>,
        config: DurableStoreConfig,
    ) -> Self {
        Self::new(DurableStore::new(clock.clone(), backend, config), clock)
    }
}

impl<T> CacheManager<T> {
    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store.kind()
    }

    /// Installs the configuration of `namespace`, shrinking it to a new `max_size`.
    pub fn configure(&mut self, namespace: &str, config: NamespaceConfig<T>) -> CacheResult<()> {
        validate_namespace(namespace)?;
        config.validate()?;

        let state = namespace_state(&mut self.namespaces, self.store.as_mut(), namespace);
        state.config = config;
        if let Some(max) = state.config.max_size {
            let excess = state.recency.len().saturating_sub(max);
            if excess > 0 {
                evict_entries(state, self.store.as_mut(), namespace, excess);
            }
        }
        Ok(())
    }

    /// Namespaces touched so far.
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.namespaces.keys().cloned().collect();
        names.sort();
        names
    }

    /// Forwards the host's per-step tick to the store.
    pub fn advance_tick(&mut self) {
        let now = self.clock.now();
        self.store.advance_tick(now);
    }

    /// Looks up `key`, recording a hit or miss. Expired entries are deleted.
    pub fn lookup<'o>(&mut self, key: &str, options: impl Into<CacheOptions<'o>>) -> Option<&T> {
        let options: CacheOptions<'o> = options.into();
        let namespace = options.namespace;
        debug_assert!(
            validate_namespace(namespace).is_ok(),
            "invalid namespace {namespace:?}"
        );
        let now = self.clock.now();
        let composite = compose_key(namespace, key);
        let state = namespace_state(&mut self.namespaces, self.store.as_mut(), namespace);

        let status = match self.store.get(&composite) {
            Some(entry) if !entry.is_expired(now) => {
                entry.touch(now);
                CacheStatus::Hit
            }
            Some(_) => CacheStatus::Expired,
            None => CacheStatus::Miss,
        };

        match status {
            CacheStatus::Hit => {
                state.hits += 1;
                state.recency.touch(key);
            }
            CacheStatus::Expired => {
                state.misses += 1;
                state.recency.remove(key);
                self.store.delete(&composite);
            }
            CacheStatus::Miss => {
                state.misses += 1;
                state.recency.remove(key);
            }
        }
        trace!(namespace, key, status = %status, "Cache lookup");

        if status.is_hit() {
            self.store.peek(&composite).map(|entry| &entry.value)
        } else {
            None
        }
    }

    /// Returns a clone of the cached value, or `None` on a miss.
    pub fn get<'o>(&mut self, key: &str, options: impl Into<CacheOptions<'o>>) -> Option<T>
    where
        T: Clone,
    {
        self.lookup(key, options).cloned()
    }

    /// Returns the cached value, computing and storing it on a miss.
    ///
    /// A failing `compute` leaves the cache untouched and its error is
    /// returned as-is.
    pub fn get_or_compute<'o, E, F>(
        &mut self,
        key: &str,
        options: impl Into<CacheOptions<'o>>,
        compute: F,
    ) -> Result<T, E>
    where
        T: Clone,
        F: FnOnce() -> Result<T, E>,
    {
        let options: CacheOptions<'o> = options.into();
        if let Some(value) = self.lookup(key, options) {
            return Ok(value.clone());
        }
        let value = compute()?;
        self.set(key, value.clone(), options);
        Ok(value)
    }

    /// Infallible variant of [`CacheManager::get_or_compute`].
    pub fn get_or_insert_with<'o, F>(
        &mut self,
        key: &str,
        options: impl Into<CacheOptions<'o>>,
        compute: F,
    ) -> T
    where
        T: Clone,
        F: FnOnce() -> T,
    {
        let options: CacheOptions<'o> = options.into();
        if let Some(value) = self.lookup(key, options) {
            return value.clone();
        }
        let value = compute();
        self.set(key, value.clone(), options);
        value
    }

    /// Stores `value` as a fresh entry, then evicts down to the namespace's `max_size`.
    pub fn set<'o>(&mut self, key: &str, value: T, options: impl Into<CacheOptions<'o>>) {
        let options: CacheOptions<'o> = options.into();
        let namespace = options.namespace;
        debug_assert!(
            validate_namespace(namespace).is_ok(),
            "invalid namespace {namespace:?}"
        );
        let now = self.clock.now();
        let state = namespace_state(&mut self.namespaces, self.store.as_mut(), namespace);
        let ttl = state.config.resolve_ttl(options.ttl);

        self.store
            .set(&compose_key(namespace, key), CachedEntry::new(value, now, ttl));
        state.recency.touch(key);

        if let Some(max) = state.config.max_size {
            let excess = state.recency.len().saturating_sub(max);
            if excess > 0 {
                let evicted = evict_entries(state, self.store.as_mut(), namespace, excess);
                debug!(namespace, evicted, max_size = max, "Size cap eviction");
            }
        }
    }

    /// Removes one entry. Returns `true` if it existed.
    pub fn invalidate(&mut self, key: &str, namespace: &str) -> bool {
        let state = namespace_state(&mut self.namespaces, self.store.as_mut(), namespace);
        state.recency.remove(key);
        self.store.delete(&compose_key(namespace, key))
    }

    /// Removes every key of `namespace` matching `pattern`. Returns the count removed.
    pub fn invalidate_pattern(&mut self, pattern: &Regex, namespace: &str) -> usize {
        let prefix = namespace_prefix(namespace);
        let state = namespace_state(&mut self.namespaces, self.store.as_mut(), namespace);

        let doomed: Vec<String> = self
            .store
            .keys()
            .into_iter()
            .filter(|composite| {
                composite
                    .strip_prefix(&prefix)
                    .is_some_and(|key| pattern.is_match(key))
            })
            .collect();

        let mut removed = 0;
        for composite in &doomed {
            if self.store.delete(composite) {
                removed += 1;
            }
            if let Some(key) = composite.strip_prefix(&prefix) {
                state.recency.remove(key);
            }
        }
        debug!(namespace, pattern = pattern.as_str(), removed, "Pattern invalidation");
        removed
    }

    /// Removes every entry of `namespace`. Counters are kept.
    pub fn clear(&mut self, namespace: &str) -> usize {
        let prefix = namespace_prefix(namespace);
        let state = namespace_state(&mut self.namespaces, self.store.as_mut(), namespace);

        let doomed: Vec<String> = self
            .store
            .keys()
            .into_iter()
            .filter(|composite| composite.starts_with(&prefix))
            .collect();
        for composite in &doomed {
            self.store.delete(composite);
        }
        state.recency.clear();
        doomed.len()
    }

    /// Empties the whole store and every namespace.
    pub fn clear_all(&mut self) {
        self.store.clear();
        for state in self.namespaces.values_mut() {
            state.recency.clear();
        }
    }

    /// Drops expired entries across the store. Returns the count removed.
    pub fn cleanup(&mut self) -> usize {
        let removed = self.store.cleanup();
        if removed > 0 {
            let store = self.store.as_mut();
            for (namespace, state) in self.namespaces.iter_mut() {
                state
                    .recency
                    .retain(|key| store.has(&compose_key(namespace, key)));
            }
            debug!(removed, tick = self.clock.now(), "Cache cleanup");
        }
        removed
    }

    /// Evicts up to `count` least-recently-accessed entries from `namespace`.
    pub fn evict_lru(&mut self, namespace: &str, count: usize) -> usize {
        let state = namespace_state(&mut self.namespaces, self.store.as_mut(), namespace);
        evict_entries(state, self.store.as_mut(), namespace, count)
    }

    /// Writes dirty entries (durable stores only; `0` for volatile ones).
    pub fn persist(&mut self) -> usize {
        self.store.persist()
    }

    /// Like [`CacheManager::persist`] but ignores the persist interval.
    pub fn flush(&mut self) -> usize {
        self.store.flush()
    }

    /// Restores entries from the snapshot and rebuilds recency for known namespaces.
    pub fn rehydrate(&mut self) -> usize {
        let restored = self.store.rehydrate();
        if restored > 0 {
            let store = self.store.as_mut();
            for (namespace, state) in self.namespaces.iter_mut() {
                state.recency = seed_recency(store, namespace);
            }
        }
        restored
    }

    pub fn stats(&mut self, namespace: &str) -> NamespaceStats {
        namespace_state(&mut self.namespaces, self.store.as_mut(), namespace).stats()
    }

    /// Returns the entry without counting a hit or checking expiry.
    pub fn peek(&mut self, key: &str, namespace: &str) -> Option<&CachedEntry<T>> {
        self.store.peek(&compose_key(namespace, key))
    }

    /// Returns `true` if a fresh entry exists. Does not count as a lookup.
    pub fn contains(&mut self, key: &str, namespace: &str) -> bool {
        let now = self.clock.now();
        self.peek(key, namespace)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Keys of `namespace`, least recently accessed first.
    pub fn keys(&mut self, namespace: &str) -> Vec<String> {
        namespace_state(&mut self.namespaces, self.store.as_mut(), namespace)
            .recency
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&mut self, namespace: &str) -> usize {
        namespace_state(&mut self.namespaces, self.store.as_mut(), namespace)
            .recency
            .len()
    }

    pub fn is_empty(&mut self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }

    /// Total entries in the store across namespaces.
    pub fn total_len(&mut self) -> usize {
        self.store.size()
    }
}

impl<T> std::fmt::Debug for CacheManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("store", &self.store.kind())
            .field("namespaces", &self.namespaces.len())
            .field("clock", &self.clock)
            .finish()
    }
}
