//! Tick-driven tiered cache for step-simulated hosts.
//!
//! Time is a logical tick supplied by the host ([`TickClock`]); nothing reads a
//! wall clock. A host may discard all process-local state between steps, so
//! durable caches rebuild themselves from a persisted snapshot on first use.
//!
//! # Layers
//!
//! - [`storage`]: the [`CacheStore`] contract, a [`VolatileStore`] and a
//!   write-behind [`DurableStore`] over a [`SnapshotBackend`].
//! - [`cache`]: [`CacheManager`], namespaced get/set with ttl, compute-on-miss,
//!   size-bounded LRU eviction and hit/miss stats.
//! - [`coherence`]: [`CacheCoherence`], semantic invalidation across caches,
//!   a global memory budget, throttled cleanup and durable-tier persistence.
//! - [`events`]: domain events mapped to invalidation scopes.
//!
//! # Example
//!
//! ```
//! use tickcache::{CacheManager, CacheOptions, TickClock};
//!
//! let clock = TickClock::new(100);
//! let mut cache: CacheManager<u32> = CacheManager::volatile(clock.clone());
//!
//! cache.set("W1N1", 3, CacheOptions::new("room_find").ttl(5));
//! assert_eq!(cache.get("W1N1", "room_find"), Some(3));
//!
//! clock.advance(6);
//! assert_eq!(cache.get("W1N1", "room_find"), None);
//! ```

pub mod cache;
pub mod clock;
pub mod coherence;
pub mod config;
pub mod constants;
pub mod events;
pub mod hashing;
pub mod storage;

pub use cache::{
    CacheError, CacheManager, CacheManagerHandle, CacheOptions, CacheResult, CacheStatus,
    CachedEntry, EvictionStrategy, NamespaceConfig, NamespaceStats, StoreKind,
};
pub use clock::TickClock;
pub use coherence::{
    CacheCoherence, CacheTier, CoherenceStats, CoherentCache, InvalidationScope, PatternCache,
    RegisterOptions, RegisteredCache, ScopeKind, TierStats,
};
pub use config::{CoherenceConfig, ConfigError};
pub use constants::{NAMESPACE_SEPARATOR, Tick, namespaces};
pub use events::CacheEvent;
pub use hashing::{hash_to_u64, segment_file_stem};
pub use storage::{
    CacheStore, DurableStore, DurableStoreConfig, FileSnapshot, MemorySnapshot, PersistedEntry,
    SnapshotBackend, SnapshotError, SnapshotIndex, SnapshotRecord, SnapshotResult, VolatileStore,
};
