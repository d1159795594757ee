//! Coherence layer over heterogeneous cache managers.
//!
//! Caches of any value type register through the type-erased [`CoherentCache`]
//! trait. The layer turns semantic [`InvalidationScope`]s into key patterns,
//! keeps the estimated memory of all caches under a global budget (evicting
//! lowest-priority caches first), and persists the durable tier.

pub mod manager;
pub mod patterns;
pub mod registry;
pub mod scope;
pub mod stats;
pub mod tier;


pub use manager::CacheCoherence;
pub use patterns::PatternCache;
pub use registry::{CoherentCache, RegisterOptions, RegisteredCache};
pub use scope::{InvalidationScope, ScopeAction, ScopeKind, segment_pattern, structure_pattern};
pub use stats::{CoherenceStats, TierStats};
pub use tier::{CacheTier, L1_DEFAULT_PRIORITY, L2_DEFAULT_PRIORITY, L3_DEFAULT_PRIORITY};
