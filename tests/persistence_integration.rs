//! Integration tests for durable caches across full state resets.

mod common;

use std::sync::Arc;

use common::fixtures::{Route, START_TICK, durable_routes, init_tracing};
use tempfile::TempDir;
use tickcache::{
    CacheOptions, DurableStoreConfig, FileSnapshot, MemorySnapshot, SnapshotBackend,
    SnapshotIndex, SnapshotRecord, TickClock,
};

fn snapshot_record(snapshot: &MemorySnapshot) -> SnapshotRecord {
    let segment = DurableStoreConfig::new("paths").namespace_segment("paths");
    let bytes = snapshot.raw(&segment).expect("paths record written");
    SnapshotRecord::decode(&bytes).expect("record decodes")
}

#[test]
fn test_roundtrip_within_ttl() {
    init_tracing();
    let clock = TickClock::new(START_TICK);
    let snapshot = MemorySnapshot::new();
    let route = Route::new("spawn", "source", 12);

    {
        let mut paths = durable_routes(&clock, Arc::new(snapshot.clone()), 10);
        paths.set("spawn:source", route.clone(), CacheOptions::new("paths").ttl(100));
        assert_eq!(paths.persist(), 1);
    }

    // Full state reset: only the clock and the snapshot survive.
    clock.advance(60);
    let mut paths = durable_routes(&clock, Arc::new(snapshot), 10);
    assert_eq!(paths.get("spawn:source", "paths"), Some(route));
}

#[test]
fn test_roundtrip_past_ttl_is_absent_and_pruned() {
    init_tracing();
    let clock = TickClock::new(START_TICK);
    let snapshot = MemorySnapshot::new();

    {
        let mut paths = durable_routes(&clock, Arc::new(snapshot.clone()), 10);
        paths.set(
            "spawn:source",
            Route::new("spawn", "source", 4),
            CacheOptions::new("paths").ttl(100),
        );
        paths.set(
            "spawn:controller",
            Route::new("spawn", "controller", 9),
            CacheOptions::new("paths").ttl(1_000),
        );
        assert_eq!(paths.persist(), 2);
    }

    clock.advance(101);
    let mut paths = durable_routes(&clock, Arc::new(snapshot.clone()), 10);
    assert_eq!(paths.get("spawn:source", "paths"), None);
    assert!(paths.contains("spawn:controller", "paths"));

    // The expired record was dropped during rehydration; the next write
    // carries that removal even though no entry is dirty.
    paths.cleanup();
    assert_eq!(paths.persist(), 0);
    let record = snapshot_record(&snapshot);
    assert_eq!(record.entries.len(), 1);
    assert!(record.entries.contains_key("spawn:controller"));
}

#[test]
fn test_snapshot_holds_caller_keys_per_namespace() {
    let clock = TickClock::new(START_TICK);
    let snapshot = MemorySnapshot::new();
    let mut paths = durable_routes(&clock, Arc::new(snapshot.clone()), 1);

    paths.set("W1N1:spawn:source", Route::new("spawn", "source", 3), "paths");
    assert_eq!(paths.persist(), 1);

    let index = SnapshotIndex::decode(&snapshot.raw("paths").expect("index written"))
        .expect("index decodes");
    assert!(index.namespaces.contains("paths"));

    let record = snapshot_record(&snapshot);
    let persisted = &record.entries["W1N1:spawn:source"];
    assert_eq!(persisted["value"]["to"], "source");
    assert_eq!(persisted["createdAt"], START_TICK);
}

#[test]
fn test_expired_overwrite_does_not_resurrect_older_value() {
    init_tracing();
    let clock = TickClock::new(START_TICK);
    let snapshot = MemorySnapshot::new();

    {
        let mut paths = durable_routes(&clock, Arc::new(snapshot.clone()), 10);
        paths.set("spawn:source", Route::new("spawn", "source", 4), "paths");
        assert_eq!(paths.flush(), 1);

        paths.set(
            "spawn:source",
            Route::new("spawn", "source", 6),
            CacheOptions::new("paths").ttl(5),
        );
        clock.advance(6);
        assert_eq!(paths.cleanup(), 1);
        assert!(!paths.contains("spawn:source", "paths"));
        paths.flush();
    }

    let mut paths = durable_routes(&clock, Arc::new(snapshot.clone()), 10);
    assert_eq!(paths.get("spawn:source", "paths"), None);
    assert!(!snapshot_record(&snapshot).entries.contains_key("spawn:source"));
}

#[test]
fn test_repeated_rehydration_does_not_duplicate_or_resurrect() {
    let clock = TickClock::new(START_TICK);
    let snapshot = MemorySnapshot::new();
    {
        let mut paths = durable_routes(&clock, Arc::new(snapshot.clone()), 1);
        for i in 0..5u8 {
            paths.set(&format!("r{i}"), Route::new("a", "b", i), "paths");
        }
        paths.persist();
    }

    let mut paths = durable_routes(&clock, Arc::new(snapshot), 1);
    assert_eq!(paths.len("paths"), 5);
    assert!(paths.invalidate("r0", "paths"));

    assert_eq!(paths.rehydrate(), 0);
    assert_eq!(paths.rehydrate(), 0);
    assert_eq!(paths.len("paths"), 4);
    assert!(!paths.contains("r0", "paths"));
}

#[test]
fn test_persist_interval_throttles_writes() {
    let clock = TickClock::new(START_TICK);
    let snapshot = MemorySnapshot::new();
    let mut paths = durable_routes(&clock, Arc::new(snapshot.clone()), 10);

    paths.set("a", Route::new("a", "b", 1), "paths");
    assert_eq!(paths.persist(), 1);

    paths.set("b", Route::new("b", "c", 2), "paths");
    clock.advance(9);
    assert_eq!(paths.persist(), 0);
    assert_eq!(snapshot_record(&snapshot).entries.len(), 1);

    clock.advance(1);
    assert_eq!(paths.persist(), 1);
    assert_eq!(snapshot_record(&snapshot).entries.len(), 2);
}

#[test]
fn test_reads_are_persisted_at_most_once_per_tick() {
    let clock = TickClock::new(START_TICK);
    let snapshot = MemorySnapshot::new();
    let mut paths = durable_routes(&clock, Arc::new(snapshot), 1);

    paths.set("a", Route::new("a", "b", 1), "paths");
    clock.advance(1);
    assert_eq!(paths.persist(), 1);

    for _ in 0..10 {
        paths.get("a", "paths");
    }
    clock.advance(1);
    assert_eq!(paths.persist(), 1);
    assert_eq!(paths.persist(), 0);
}

#[test]
fn test_file_snapshot_survives_reset() {
    init_tracing();
    let temp = TempDir::new().expect("temp dir");
    let clock = TickClock::new(START_TICK);
    let route = Route::new("spawn", "mineral", 30);

    {
        let backend: Arc<dyn SnapshotBackend> = Arc::new(FileSnapshot::new(temp.path()));
        let mut paths = durable_routes(&clock, backend, 10);
        paths.set("spawn:mineral", route.clone(), CacheOptions::new("paths").ttl(500));
        assert_eq!(paths.persist(), 1);
    }

    clock.advance(200);
    let backend: Arc<dyn SnapshotBackend> = Arc::new(FileSnapshot::new(temp.path()));
    let mut paths = durable_routes(&clock, backend, 10);
    assert_eq!(paths.get("spawn:mineral", "paths"), Some(route));

    let stats = paths.stats("paths");
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.size, 1);
}

#[test]
fn test_corrupt_file_snapshot_starts_empty() {
    let temp = TempDir::new().expect("temp dir");
    let backend = FileSnapshot::new(temp.path());
    backend
        .save("paths", b"{\"version\":1,\"lastSync\":")
        .expect("write corrupt record");

    let clock = TickClock::new(START_TICK);
    let mut paths = durable_routes(&clock, Arc::new(backend), 10);
    assert_eq!(paths.len("paths"), 0);

    paths.set("a", Route::new("a", "b", 1), "paths");
    assert_eq!(paths.persist(), 1);
}
