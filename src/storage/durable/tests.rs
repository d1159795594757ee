use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use super::DurableStore;
use super::config::DurableStoreConfig;
use super::model::{SnapshotIndex, SnapshotRecord};
use super::snapshot::{FileSnapshot, MemorySnapshot, SnapshotBackend};
use crate::cache::{CachedEntry, StoreKind, compose_key};
use crate::clock::TickClock;
use crate::storage::CacheStore;

const SEGMENT: &str = "test";

const NS: &str = "paths";

fn config() -> DurableStoreConfig {
    DurableStoreConfig::new(SEGMENT).persist_interval(10)
}

fn durable(clock: &TickClock, snapshot: &MemorySnapshot) -> DurableStore<String> {
    DurableStore::new(clock.clone(), Arc::new(snapshot.clone()), config())
}

fn key(k: &str) -> String {
    compose_key(NS, k)
}

fn entry(value: &str, created_at: u64, ttl: Option<u64>) -> CachedEntry<String> {
    CachedEntry::new(value.to_string(), created_at, ttl)
}

fn record(snapshot: &MemorySnapshot) -> SnapshotRecord {
    let bytes = snapshot
        .raw(&config().namespace_segment(NS))
        .expect("namespace record should exist");
    SnapshotRecord::decode(&bytes).expect("record should decode")
}

fn index(snapshot: &MemorySnapshot) -> SnapshotIndex {
    let bytes = snapshot.raw(SEGMENT).expect("index should exist");
    SnapshotIndex::decode(&bytes).expect("index should decode")
}

/// Writes an index naming `NS` and the given raw record bytes.
fn seed_record(snapshot: &MemorySnapshot, record: Vec<u8>) {
    let index = SnapshotIndex::new([NS.to_string()]);
    snapshot.insert_raw(SEGMENT, index.encode().expect("encode index"));
    snapshot.insert_raw(&config().namespace_segment(NS), record);
}

#[test]
fn test_durable_kind_and_lazy_hydration() {
    let clock = TickClock::new(0);
    let snapshot = MemorySnapshot::new();
    let mut store = durable(&clock, &snapshot);

    assert_eq!(store.kind(), StoreKind::Durable);
    assert!(!store.is_hydrated());
    assert_eq!(store.size(), 0);
    assert!(store.is_hydrated());
}

#[test]
fn test_durable_persist_writes_dirty_entries_and_clears_flags() {
    let clock = TickClock::new(100);
    let snapshot = MemorySnapshot::new();
    let mut store = durable(&clock, &snapshot);

    store.set(&key("a"), entry("alpha", 100, Some(50)));
    store.set(&key("b"), entry("beta", 100, None));
    assert_eq!(store.dirty_count(), 2);

    assert_eq!(store.persist(), 2);
    assert_eq!(store.dirty_count(), 0);

    let record = record(&snapshot);
    assert_eq!(record.version, 1);
    assert_eq!(record.last_sync, 100);
    assert_eq!(
        record.entries.get("a"),
        Some(&json!({"value": "alpha", "createdAt": 100, "ttl": 50, "accessCount": 0}))
    );
    assert!(record.entries.contains_key("b"));
}

#[test]
fn test_durable_keeps_one_record_per_namespace() {
    let clock = TickClock::new(0);
    let snapshot = MemorySnapshot::new();
    let mut store = durable(&clock, &snapshot);

    store.set(&compose_key("paths", "W1N1:a"), entry("route", 0, None));
    store.set(&compose_key("roles", "W1N1:a"), entry("harvester", 0, None));
    assert_eq!(store.flush(), 2);

    let names: Vec<String> = index(&snapshot).namespaces.into_iter().collect();
    assert_eq!(names, vec!["paths".to_string(), "roles".to_string()]);

    for (namespace, value) in [("paths", "route"), ("roles", "harvester")] {
        let bytes = snapshot
            .raw(&config().namespace_segment(namespace))
            .expect("record per namespace");
        let record = SnapshotRecord::decode(&bytes).expect("decode");
        assert_eq!(record.entries.len(), 1);
        assert_eq!(record.entries["W1N1:a"]["value"], json!(value));
    }

    let mut store = durable(&clock, &snapshot);
    assert_eq!(
        store.peek(&compose_key("roles", "W1N1:a")).map(|e| e.value.as_str()),
        Some("harvester")
    );
    assert_eq!(store.snapshot_namespaces(), vec!["paths", "roles"]);
}

#[test]
fn test_durable_persist_is_throttled() {
    let clock = TickClock::new(0);
    let snapshot = MemorySnapshot::new();
    let mut store = durable(&clock, &snapshot);

    store.set(&key("a"), entry("alpha", 0, None));
    assert_eq!(store.persist(), 1);

    clock.set(5);
    store.set(&key("b"), entry("beta", 5, None));
    assert_eq!(store.persist(), 0);
    assert_eq!(store.dirty_count(), 1);

    clock.set(10);
    assert_eq!(store.persist(), 1);
    assert_eq!(store.last_persist(), Some(10));
}

#[test]
fn test_durable_flush_ignores_throttle() {
    let clock = TickClock::new(0);
    let snapshot = MemorySnapshot::new();
    let mut store = durable(&clock, &snapshot);

    store.set(&key("a"), entry("alpha", 0, None));
    store.persist();
    store.set(&key("b"), entry("beta", 0, None));

    assert_eq!(store.flush(), 1);
    assert!(record(&snapshot).entries.contains_key("b"));
}

#[test]
fn test_durable_reads_mark_dirty_once_per_tick() {
    let clock = TickClock::new(0);
    let snapshot = MemorySnapshot::new();
    let mut store = durable(&clock, &snapshot);

    store.set(&key("a"), entry("alpha", 0, None));
    store.flush();
    assert_eq!(store.dirty_count(), 0);

    // Same tick as the write: nothing new to persist.
    if let Some(entry) = store.get(&key("a")) {
        entry.touch(0);
    }
    assert_eq!(store.dirty_count(), 0);

    clock.set(1);
    if let Some(entry) = store.get(&key("a")) {
        entry.touch(1);
    }
    assert_eq!(store.dirty_count(), 1);

    store.flush();
    if let Some(entry) = store.get(&key("a")) {
        entry.touch(1);
    }
    assert_eq!(store.dirty_count(), 0);
}

#[test]
fn test_durable_rehydrates_after_state_reset() {
    let clock = TickClock::new(100);
    let snapshot = MemorySnapshot::new();
    {
        let mut store = durable(&clock, &snapshot);
        store.set(&key("a"), entry("alpha", 100, Some(100)));
        store.persist();
    }

    clock.set(150);
    let mut store = durable(&clock, &snapshot);
    let entry = store.get(&key("a")).expect("entry should be rehydrated");
    assert_eq!(entry.value, "alpha");
    assert_eq!(entry.created_at, 100);
    assert_eq!(entry.ttl, Some(100));
}

#[test]
fn test_durable_rehydration_discards_expired_records() {
    let clock = TickClock::new(100);
    let snapshot = MemorySnapshot::new();
    {
        let mut store = durable(&clock, &snapshot);
        store.set(&key("short"), entry("s", 100, Some(10)));
        store.set(&key("long"), entry("l", 100, Some(1000)));
        store.persist();
    }

    clock.set(200);
    let mut store = durable(&clock, &snapshot);
    assert!(!store.has(&key("short")));
    assert!(store.has(&key("long")));
    assert!(!store.snapshot_contains(&key("short")));

    store.flush();
    assert!(!record(&snapshot).entries.contains_key("short"));
}

#[test]
fn test_durable_rehydration_drops_malformed_records() {
    let clock = TickClock::new(10);
    let snapshot = MemorySnapshot::new();
    let raw = json!({
        "version": 1,
        "lastSync": 5,
        "entries": {
            "good": {"value": "ok", "createdAt": 5, "ttl": null, "accessCount": 2},
            "wrong_type": {"value": 42, "createdAt": 5, "ttl": null, "accessCount": 0},
            "partial": {"value": "half"}
        }
    });
    seed_record(&snapshot, serde_json::to_vec(&raw).expect("encode"));

    let mut store = durable(&clock, &snapshot);
    assert_eq!(store.size(), 1);
    let good = store.peek(&key("good")).expect("good record survives");
    assert_eq!(good.value, "ok");
    assert_eq!(good.access_count, 2);
    assert!(!good.dirty);
    assert_eq!(store.snapshot_keys(), vec![key("good")]);
}

#[test]
fn test_durable_unreadable_record_starts_empty() {
    let clock = TickClock::new(0);
    let snapshot = MemorySnapshot::new();
    seed_record(&snapshot, b"{\"version\": 1, \"entr".to_vec());

    let mut store = durable(&clock, &snapshot);
    assert_eq!(store.size(), 0);
    assert!(store.is_hydrated());

    // The broken record is rewritten on the next persist.
    store.flush();
    assert!(record(&snapshot).entries.is_empty());
}

#[test]
fn test_durable_unreadable_index_starts_empty() {
    let clock = TickClock::new(0);
    let snapshot = MemorySnapshot::new();
    snapshot.insert_raw(SEGMENT, b"[1, 2".to_vec());

    let mut store = durable(&clock, &snapshot);
    assert_eq!(store.size(), 0);

    store.set(&key("a"), entry("alpha", 0, None));
    assert_eq!(store.flush(), 1);
    assert!(index(&snapshot).namespaces.contains(NS));
}

#[test]
fn test_durable_unknown_version_starts_empty() {
    let clock = TickClock::new(0);
    let snapshot = MemorySnapshot::new();
    let raw = json!({
        "version": 99,
        "lastSync": 0,
        "entries": {"a": {"value": "x", "createdAt": 0, "ttl": null, "accessCount": 0}}
    });
    seed_record(&snapshot, serde_json::to_vec(&raw).expect("encode"));

    let mut store = durable(&clock, &snapshot);
    assert!(!store.has(&key("a")));
}

#[test]
fn test_durable_repeated_rehydration_is_idempotent() {
    let clock = TickClock::new(0);
    let snapshot = MemorySnapshot::new();
    {
        let mut store = durable(&clock, &snapshot);
        store.set(&key("a"), entry("alpha", 0, None));
        store.set(&key("b"), entry("beta", 0, None));
        store.persist();
    }

    let mut store = durable(&clock, &snapshot);
    assert_eq!(store.rehydrate(), 2);

    store.set(&key("a"), entry("newer", 0, None));
    store.delete(&key("b"));

    assert_eq!(store.rehydrate(), 0);
    assert_eq!(store.rehydrate(), 0);
    assert_eq!(store.size(), 1);
    assert_eq!(store.peek(&key("a")).map(|e| e.value.as_str()), Some("newer"));
    assert!(!store.has(&key("b")));
}

#[test]
fn test_durable_delete_and_clear_reach_snapshot() {
    let clock = TickClock::new(0);
    let snapshot = MemorySnapshot::new();
    let mut store = durable(&clock, &snapshot);

    store.set(&key("a"), entry("alpha", 0, None));
    store.set(&key("b"), entry("beta", 0, None));
    store.flush();

    assert!(store.delete(&key("a")));
    store.flush();
    assert!(!record(&snapshot).entries.contains_key("a"));

    store.clear();
    store.flush();
    assert!(record(&snapshot).entries.is_empty());
}

#[test]
fn test_durable_cleanup_prunes_both_layers() {
    let clock = TickClock::new(0);
    let snapshot = MemorySnapshot::new();
    let mut store = durable(&clock, &snapshot);

    store.set(&key("a"), entry("alpha", 0, Some(5)));
    store.set(&key("b"), entry("beta", 0, None));
    store.flush();

    clock.set(6);
    assert_eq!(store.cleanup(), 1);
    assert!(!store.has(&key("a")));
    assert!(!store.snapshot_contains(&key("a")));
    assert!(store.snapshot_contains(&key("b")));
}

#[test]
fn test_durable_cleanup_forgets_overwritten_snapshot_value() {
    let clock = TickClock::new(0);
    let snapshot = MemorySnapshot::new();
    let mut store = durable(&clock, &snapshot);

    store.set(&key("a"), entry("v1", 0, None));
    assert_eq!(store.flush(), 1);

    // Overwritten with a short ttl and never persisted.
    store.set(&key("a"), entry("v2", 0, Some(5)));
    clock.set(6);
    assert_eq!(store.cleanup(), 1);
    assert!(!store.snapshot_contains(&key("a")));

    assert_eq!(store.rehydrate(), 0);
    assert!(!store.has(&key("a")));

    assert_eq!(store.flush(), 0);
    assert!(!record(&snapshot).entries.contains_key("a"));

    let mut store = durable(&clock, &snapshot);
    assert!(!store.has(&key("a")));
}

#[test]
fn test_durable_expired_entries_are_not_persisted() {
    let clock = TickClock::new(0);
    let snapshot = MemorySnapshot::new();
    let mut store = durable(&clock, &snapshot);

    store.set(&key("a"), entry("alpha", 0, Some(1)));
    clock.set(5);
    assert_eq!(store.flush(), 0);
    assert!(snapshot.raw(SEGMENT).is_none());
    assert!(snapshot.raw(&config().namespace_segment(NS)).is_none());
}

#[test]
fn test_durable_keys_without_namespace_round_trip() {
    let clock = TickClock::new(0);
    let snapshot = MemorySnapshot::new();
    {
        let mut store = durable(&clock, &snapshot);
        store.set("bare", entry("value", 0, None));
        assert_eq!(store.flush(), 1);
    }

    let mut store = durable(&clock, &snapshot);
    assert_eq!(store.peek("bare").map(|e| e.value.as_str()), Some("value"));
    assert_eq!(store.snapshot_keys(), vec!["bare".to_string()]);
}

#[test]
fn test_file_snapshot_roundtrip() {
    let temp = TempDir::new().expect("temp dir");
    let backend = FileSnapshot::new(temp.path().join("snapshots"));

    assert!(backend.load("paths").expect("load").is_none());

    backend.save("paths", b"{}").expect("save");
    assert_eq!(backend.load("paths").expect("load").as_deref(), Some(&b"{}"[..]));
    assert!(backend.segment_path("paths").exists());

    backend.remove("paths").expect("remove");
    backend.remove("paths").expect("remove twice");
    assert!(backend.load("paths").expect("load").is_none());
}

#[test]
fn test_durable_store_over_file_snapshot_survives_reset() {
    let temp = TempDir::new().expect("temp dir");
    let clock = TickClock::new(0);
    let backend: Arc<dyn SnapshotBackend> = Arc::new(FileSnapshot::new(temp.path()));
    {
        let mut store: DurableStore<Vec<u32>> =
            DurableStore::new(clock.clone(), backend.clone(), DurableStoreConfig::new("paths"));
        store.set(&key("route"), CachedEntry::new(vec![1, 2, 3], 0, None));
        assert_eq!(store.persist(), 1);
    }

    let mut store: DurableStore<Vec<u32>> =
        DurableStore::new(clock, backend, DurableStoreConfig::new("paths"));
    assert_eq!(store.peek(&key("route")).map(|e| e.value.clone()), Some(vec![1, 2, 3]));
}
