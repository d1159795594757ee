//! Drives a small cache setup through a few ticks, a domain event and a full
//! state reset.
//!
//! Run with: `RUST_LOG=tickcache=debug cargo run --example tick_loop`

use std::sync::Arc;

use anyhow::Result;
use tickcache::{
    CacheCoherence, CacheEvent, CacheManager, CacheManagerHandle, CacheOptions, CacheTier,
    CoherenceConfig, DurableStoreConfig, FileSnapshot, RegisterOptions, SnapshotBackend,
    TickClock, namespaces,
};
use tracing_subscriber::EnvFilter;

type Path = Vec<(u8, u8)>;

struct Caches {
    room_find: CacheManagerHandle<Vec<String>>,
    paths: CacheManagerHandle<Path>,
    coherence: CacheCoherence,
}

fn build(clock: &TickClock, backend: Arc<dyn SnapshotBackend>) -> Caches {
    let room_find = CacheManagerHandle::volatile(clock.clone());
    let paths = CacheManagerHandle::new(CacheManager::durable(
        clock.clone(),
        backend,
        DurableStoreConfig::new(namespaces::PATHS).persist_interval(5),
    ));

    let config = CoherenceConfig::default()
        .cleanup_interval(3)
        .with_entry_estimate(namespaces::PATHS, 512);
    let mut coherence = CacheCoherence::new(clock.clone(), config);
    coherence.register_cache(
        namespaces::ROOM_FIND,
        room_find.clone(),
        CacheTier::L1,
        RegisterOptions::default(),
    );
    coherence.register_cache(
        namespaces::PATHS,
        paths.clone(),
        CacheTier::L3,
        RegisterOptions::default(),
    );

    Caches {
        room_find,
        paths,
        coherence,
    }
}

fn find_path(from: u8, to: u8) -> Path {
    (from..=to).map(|x| (x, 25)).collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dir = tempfile::tempdir()?;
    let clock = TickClock::new(1);
    let backend: Arc<dyn SnapshotBackend> = Arc::new(FileSnapshot::new(dir.path()));
    let mut caches = build(&clock, backend.clone());

    for tick in 0..6u8 {
        let sources = caches.room_find.get_or_compute(
            "W1N1:sources",
            CacheOptions::new(namespaces::ROOM_FIND).ttl(0),
            || Ok::<_, anyhow::Error>(vec!["source-a".to_string(), "source-b".to_string()]),
        )?;
        let route = caches.paths.get_or_compute(
            &format!("W1N1:spawn:{}", tick % 2),
            CacheOptions::new(namespaces::PATHS).ttl(100),
            || Ok::<_, anyhow::Error>(find_path(10, 20 + tick % 2)),
        )?;
        println!(
            "tick {}: {} sources, route of {} steps",
            clock.now(),
            sources.len(),
            route.len()
        );

        if tick == 3 {
            let event = CacheEvent::RoomHostile {
                room_name: "W1N1".to_string(),
            };
            let removed = caches.coherence.invalidate(&event.to_scope());
            println!("{event:?} invalidated {removed} entries");
        }

        let cleaned = caches.coherence.cleanup();
        let persisted = caches.coherence.persist();
        if cleaned > 0 || persisted > 0 {
            println!("  cleanup removed {cleaned}, persisted {persisted}");
        }

        clock.advance(1);
        caches.coherence.advance_tick();
    }

    println!("{}", serde_json::to_string_pretty(&caches.coherence.stats())?);

    // Flush whatever the throttle held back, then drop every in-process cache.
    caches.paths.flush();
    drop(caches);

    clock.advance(10);
    let caches = build(&clock, backend);
    println!(
        "after reset: {} paths rehydrated, {} room_find entries",
        caches.paths.len(namespaces::PATHS),
        caches.room_find.len(namespaces::ROOM_FIND)
    );

    Ok(())
}
