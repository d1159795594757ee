//! Tick-driven cache manager: entry model, per-namespace options and recency bookkeeping.

pub mod error;
pub mod handle;
pub mod manager;
pub mod options;
pub mod types;


pub use error::{CacheError, CacheResult};
pub use handle::CacheManagerHandle;
pub use manager::{CacheManager, compose_key, split_key, validate_namespace};
pub use options::{CacheOptions, EvictHook, NamespaceConfig};
pub use types::{CacheStatus, CachedEntry, EvictionStrategy, NamespaceStats, StoreKind, hit_rate};
