//! Store backends behind the [`CacheStore`] contract.

pub mod backend;
pub mod durable;
pub mod volatile;


pub use backend::CacheStore;
pub use durable::{
    DEFAULT_SEGMENT, DurableStore, DurableStoreConfig, FileSnapshot, MemorySnapshot,
    PersistedEntry, SnapshotBackend, SnapshotError, SnapshotIndex, SnapshotRecord, SnapshotResult,
};
pub use volatile::VolatileStore;
