//! Test fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tickcache::{
    CacheCoherence, CacheManager, CacheManagerHandle, CacheTier, CoherenceConfig,
    DurableStoreConfig, MemorySnapshot, RegisterOptions, SnapshotBackend, TickClock,
};

pub const START_TICK: u64 = 1_000;

pub const ROOM: &str = "W1N1";

pub const OTHER_ROOM: &str = "W2N2";

/// A cached path, shaped like what a pathfinder would return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub from: String,
    pub to: String,
    pub steps: Vec<(u8, u8)>,
}

impl Route {
    pub fn new(from: &str, to: &str, len: u8) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            steps: (0..len).map(|i| (i, i)).collect(),
        }
    }
}

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn durable_routes(
    clock: &TickClock,
    backend: Arc<dyn SnapshotBackend>,
    persist_interval: u64,
) -> CacheManager<Route> {
    CacheManager::durable(
        clock.clone(),
        backend,
        DurableStoreConfig::new("paths").persist_interval(persist_interval),
    )
}

/// A host's cache setup: one volatile per-tick cache, one volatile multi-tick
/// cache and one durable cache, all registered with a coherence manager.
pub struct World {
    pub clock: TickClock,
    pub snapshot: MemorySnapshot,
    pub room_find: CacheManagerHandle<Vec<String>>,
    pub structures: CacheManagerHandle<Vec<String>>,
    pub paths: CacheManagerHandle<Route>,
    pub coherence: CacheCoherence,
}

impl World {
    pub fn new(config: CoherenceConfig) -> Self {
        Self::with_snapshot(TickClock::new(START_TICK), MemorySnapshot::new(), config)
    }

    /// Builds a fresh world over a surviving clock and snapshot, as after a
    /// full state reset.
    pub fn with_snapshot(clock: TickClock, snapshot: MemorySnapshot, config: CoherenceConfig) -> Self {
        let room_find = CacheManagerHandle::volatile(clock.clone());
        let structures = CacheManagerHandle::volatile(clock.clone());
        let paths = CacheManagerHandle::new(durable_routes(&clock, Arc::new(snapshot.clone()), 10));

        let mut coherence = CacheCoherence::new(clock.clone(), config);
        coherence.register_cache(
            "room_find",
            room_find.clone(),
            CacheTier::L1,
            RegisterOptions::default(),
        );
        coherence.register_cache(
            "structures",
            structures.clone(),
            CacheTier::L2,
            RegisterOptions::default(),
        );
        coherence.register_cache("paths", paths.clone(), CacheTier::L3, RegisterOptions::default());

        Self {
            clock,
            snapshot,
            room_find,
            structures,
            paths,
            coherence,
        }
    }

    pub fn step(&self) {
        self.clock.advance(1);
        self.coherence.advance_tick();
    }
}
