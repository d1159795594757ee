//! Shared, lockable handle around a [`CacheManager`].

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use regex::Regex;

use super::error::CacheResult;
use super::manager::CacheManager;
use super::options::{CacheOptions, NamespaceConfig};
use super::types::{NamespaceStats, StoreKind};
use crate::clock::TickClock;

/// Cloneable handle so one manager can be used by game code and registered
/// with the coherence layer at the same time.
pub struct CacheManagerHandle<T> {
    inner: Arc<Mutex<CacheManager<T>>>,
}

impl<T> Clone for CacheManagerHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> CacheManagerHandle<T> {
    /// Wraps an existing manager.
    #[inline]
    pub fn new(manager: CacheManager<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
        }
    }

    /// Creates a handle over a fresh volatile manager.
    #[inline]
    pub fn volatile(clock: TickClock) -> Self {
        Self::new(CacheManager::volatile(clock))
    }
}

impl<T> CacheManagerHandle<T> {
    /// Locks the manager for a sequence of operations.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, CacheManager<T>> {
        self.inner.lock()
    }

    #[inline]
    pub fn store_kind(&self) -> StoreKind {
        self.inner.lock().store_kind()
    }

    #[inline]
    pub fn configure(&self, namespace: &str, config: NamespaceConfig<T>) -> CacheResult<()> {
        self.inner.lock().configure(namespace, config)
    }

    #[inline]
    pub fn get<'o>(&self, key: &str, options: impl Into<CacheOptions<'o>>) -> Option<T>
    where
        T: Clone,
    {
        self.inner.lock().get(key, options)
    }

    /// See [`CacheManager::get_or_compute`]. The lock is held while `compute` runs.
    #[inline]
    pub fn get_or_compute<'o, E, F>(
        &self,
        key: &str,
        options: impl Into<CacheOptions<'o>>,
        compute: F,
    ) -> Result<T, E>
    where
        T: Clone,
        F: FnOnce() -> Result<T, E>,
    {
        self.inner.lock().get_or_compute(key, options, compute)
    }

    #[inline]
    pub fn set<'o>(&self, key: &str, value: T, options: impl Into<CacheOptions<'o>>) {
        self.inner.lock().set(key, value, options)
    }

    #[inline]
    pub fn invalidate(&self, key: &str, namespace: &str) -> bool {
        self.inner.lock().invalidate(key, namespace)
    }

    #[inline]
    pub fn invalidate_pattern(&self, pattern: &Regex, namespace: &str) -> usize {
        self.inner.lock().invalidate_pattern(pattern, namespace)
    }

    #[inline]
    pub fn clear(&self, namespace: &str) -> usize {
        self.inner.lock().clear(namespace)
    }

    #[inline]
    pub fn cleanup(&self) -> usize {
        self.inner.lock().cleanup()
    }

    #[inline]
    pub fn persist(&self) -> usize {
        self.inner.lock().persist()
    }

    #[inline]
    pub fn flush(&self) -> usize {
        self.inner.lock().flush()
    }

    #[inline]
    pub fn stats(&self, namespace: &str) -> NamespaceStats {
        self.inner.lock().stats(namespace)
    }

    #[inline]
    pub fn contains(&self, key: &str, namespace: &str) -> bool {
        self.inner.lock().contains(key, namespace)
    }

    #[inline]
    pub fn len(&self, namespace: &str) -> usize {
        self.inner.lock().len(namespace)
    }

    #[inline]
    pub fn is_empty(&self, namespace: &str) -> bool {
        self.inner.lock().is_empty(namespace)
    }

    /// Number of live handles to the same manager.
    #[inline]
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<T> std::fmt::Debug for CacheManagerHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManagerHandle")
            .field("strong_count", &Arc::strong_count(&self.inner))
            .finish_non_exhaustive()
    }
}
