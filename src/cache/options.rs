//! Per-namespace configuration and per-call options.

use crate::constants::Tick;

use super::error::{CacheError, CacheResult};
use super::types::EvictionStrategy;

/// Callback invoked with the caller key and value of every evicted entry.
pub type EvictHook<T> = Box<dyn FnMut(&str, &T) + Send>;

/// Options that outlive a single call: installed once per namespace with
/// [`crate::cache::CacheManager::configure`].
pub struct NamespaceConfig<T> {
    /// Expiry behavior.
    pub strategy: EvictionStrategy,
    /// Default ttl for writes that do not pass one.
    pub ttl: Option<Tick>,
    /// Entry-count ceiling; exceeding it evicts least-recently-accessed entries.
    pub max_size: Option<usize>,
    /// Called for each size-pressure or budget eviction.
    pub on_evict: Option<EvictHook<T>>,
}

impl<T> Default for NamespaceConfig<T> {
    fn default() -> Self {
        Self {
            strategy: EvictionStrategy::default(),
            ttl: None,
            max_size: None,
            on_evict: None,
        }
    }
}

impl<T> NamespaceConfig<T> {
    pub fn with_ttl(ttl: Tick) -> Self {
        Self {
            ttl: Some(ttl),
            ..Default::default()
        }
    }

    pub fn strategy(mut self, strategy: EvictionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn ttl(mut self, ttl: Tick) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn on_evict<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&str, &T) + Send + 'static,
    {
        self.on_evict = Some(Box::new(hook));
        self
    }

    /// Resolves the ttl of a write, honoring the strategy and a per-call override.
    #[inline]
    pub fn resolve_ttl(&self, requested: Option<Tick>) -> Option<Tick> {
        self.strategy.effective_ttl(requested.or(self.ttl))
    }

    pub fn validate(&self) -> CacheResult<()> {
        if self.max_size == Some(0) {
            return Err(CacheError::InvalidConfig {
                reason: "max_size must be > 0".to_string(),
            });
        }
        if self.strategy == EvictionStrategy::Lru && self.max_size.is_none() {
            return Err(CacheError::InvalidConfig {
                reason: "lru strategy requires max_size".to_string(),
            });
        }
        Ok(())
    }
}

impl<T> std::fmt::Debug for NamespaceConfig<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceConfig")
            .field("strategy", &self.strategy)
            .field("ttl", &self.ttl)
            .field("max_size", &self.max_size)
            .field("on_evict", &self.on_evict.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Per-call options: which namespace, and an optional ttl override.
///
/// The namespace must be non-empty and must not contain
/// [`crate::NAMESPACE_SEPARATOR`], or its keys could collide with another
/// namespace's. Debug builds assert this on every get and set.
pub struct CacheOptions<'a> {
    pub namespace: &'a str,
    pub ttl: Option<Tick>,
}

impl<'a> CacheOptions<'a> {
    #[inline]
    pub fn new(namespace: &'a str) -> Self {
        Self {
            namespace,
            ttl: None,
        }
    }

    #[inline]
    pub fn ttl(mut self, ttl: Tick) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

impl<'a> From<&'a str> for CacheOptions<'a> {
    fn from(namespace: &'a str) -> Self {
        Self::new(namespace)
    }
}
