//! Cross-cutting, shared constants.
//!
//! Prefer deriving secondary constants from primary ones to avoid drift.

/// Logical time unit. The only notion of "now" anywhere in the crate.
pub type Tick = u64;

/// Separator between namespace and caller key in composite store keys.
///
/// Namespaces must not contain it; [`crate::cache::CacheManager::configure`]
/// rejects namespaces that do.
pub const NAMESPACE_SEPARATOR: char = '\u{1f}';

/// Global memory budget when none is configured (2 MiB).
pub const DEFAULT_MEMORY_BUDGET_BYTES: usize = 2 * 1024 * 1024;

/// Estimated bytes per entry for namespaces without an explicit estimate.
pub const DEFAULT_BYTES_PER_ENTRY: usize = 256;

/// Minimum ticks between two coherence cleanup passes.
pub const DEFAULT_CLEANUP_INTERVAL_TICKS: Tick = 10;

/// Minimum ticks between two durable-store persistence passes.
pub const DEFAULT_PERSIST_INTERVAL_TICKS: Tick = 10;

/// Compiled invalidation patterns retained by the coherence layer.
pub const DEFAULT_PATTERN_CACHE_CAPACITY: usize = 100;

/// Share of a cache's entries evicted per batch during budget enforcement.
pub const DEFAULT_EVICTION_FRACTION: f64 = 0.1;

/// Current snapshot record format.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Well-known namespaces used by the domain wrappers.
pub mod namespaces {
    /// Object lookups by id.
    pub const OBJECTS: &str = "objects";
    /// Computed paths.
    pub const PATHS: &str = "paths";
    /// Spatial queries over a room.
    pub const ROOM_FIND: &str = "room_find";
    /// Structure lists per room.
    pub const STRUCTURES: &str = "structures";
    /// Role assignments per agent.
    pub const ROLES: &str = "roles";
    /// Room-level intel (hostility, ownership).
    pub const ROOM_INTEL: &str = "room_intel";
}
