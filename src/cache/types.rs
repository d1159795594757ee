use serde::{Deserialize, Serialize};

use crate::constants::Tick;

/// A cached value together with its expiry and access bookkeeping.
///
/// Readers are responsible for checking [`CachedEntry::is_expired`]; the entry
/// never hides itself.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntry<T> {
    /// The cached value.
    pub value: T,
    /// Tick the value was computed or stored.
    pub created_at: Tick,
    /// Tick of the most recent read. Never earlier than `created_at`.
    pub last_accessed_at: Tick,
    /// Ticks until expiry; `None` never expires.
    pub ttl: Option<Tick>,
    /// Number of hits served from this entry.
    pub access_count: u64,
    /// `true` until a durable store has written the value to its snapshot.
    pub dirty: bool,
}

impl<T> CachedEntry<T> {
    /// Creates a fresh (dirty, never accessed) entry stored at `now`.
    pub fn new(value: T, now: Tick, ttl: Option<Tick>) -> Self {
        Self {
            value,
            created_at: now,
            last_accessed_at: now,
            ttl,
            access_count: 0,
            dirty: true,
        }
    }

    /// Returns `true` once more than `ttl` ticks have elapsed since creation.
    #[inline]
    pub fn is_expired(&self, now: Tick) -> bool {
        self.ttl
            .is_some_and(|ttl| now.saturating_sub(self.created_at) > ttl)
    }

    /// Records a read at `now`.
    #[inline]
    pub fn touch(&mut self, now: Tick) {
        self.last_accessed_at = self.last_accessed_at.max(now);
        self.access_count = self.access_count.saturating_add(1);
    }

    /// Ticks elapsed since creation.
    #[inline]
    pub fn age(&self, now: Tick) -> Tick {
        now.saturating_sub(self.created_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// How entries of a namespace leave the cache besides explicit invalidation.
pub enum EvictionStrategy {
    /// Expire after the configured ttl.
    #[default]
    Ttl,
    /// Expire after the configured ttl and cap the namespace at `max_size`.
    Lru,
    /// Valid only during the tick the value was written.
    Tick,
    /// Never expire; only invalidation and size pressure remove entries.
    Manual,
}

impl EvictionStrategy {
    /// Resolves the ttl an entry actually gets under this strategy.
    #[inline]
    pub fn effective_ttl(&self, requested: Option<Tick>) -> Option<Tick> {
        match self {
            EvictionStrategy::Ttl | EvictionStrategy::Lru => requested,
            EvictionStrategy::Tick => Some(0),
            EvictionStrategy::Manual => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Backing store kind of a cache manager.
pub enum StoreKind {
    /// Process-local table, lost on a full state reset.
    Volatile,
    /// Volatile front layer plus a persisted snapshot.
    Durable,
}

impl StoreKind {
    /// Stable lowercase name for logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Volatile => "volatile",
            StoreKind::Durable => "durable",
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Outcome of a single lookup, used for accounting and logs.
pub enum CacheStatus {
    /// Present and fresh.
    Hit,
    /// Not present.
    Miss,
    /// Present but past its ttl; removed by the lookup.
    Expired,
}

impl CacheStatus {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Expired => "EXPIRED",
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheStatus::Hit)
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
/// Hit/miss accounting for one namespace.
pub struct NamespaceStats {
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, or `0.0` before the first lookup.
    pub hit_rate: f64,
    /// Current entry count.
    pub size: usize,
    pub evictions: u64,
}

impl NamespaceStats {
    /// Builds stats and derives the hit rate.
    pub fn new(hits: u64, misses: u64, size: usize, evictions: u64) -> Self {
        Self {
            hits,
            misses,
            hit_rate: hit_rate(hits, misses),
            size,
            evictions,
        }
    }

    /// Total lookups recorded.
    #[inline]
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

/// `hits / (hits + misses)`, `0.0` when nothing has been looked up.
#[inline]
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
