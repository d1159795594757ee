use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::tier::CacheTier;
use crate::cache::{NamespaceStats, hit_rate};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Sums over the caches of one tier.
pub struct TierStats {
    pub caches: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub size: usize,
    pub evictions: u64,
}

impl TierStats {
    pub(crate) fn add(&mut self, stats: &NamespaceStats) {
        self.caches += 1;
        self.hits += stats.hits;
        self.misses += stats.misses;
        self.size += stats.size;
        self.evictions += stats.evictions;
        self.hit_rate = hit_rate(self.hits, self.misses);
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Aggregate report across every registered cache.
pub struct CoherenceStats {
    pub total_hits: u64,
    pub total_misses: u64,
    pub total_evictions: u64,
    pub total_size: usize,
    pub hit_rate: f64,
    pub estimated_memory_bytes: usize,
    pub memory_budget_bytes: usize,
    /// Entries removed by scope invalidations since startup.
    pub invalidations: u64,
    pub tiers: BTreeMap<CacheTier, TierStats>,
    pub namespaces: BTreeMap<String, NamespaceStats>,
}

impl CoherenceStats {
    /// Share of the memory budget in use (may exceed `1.0`).
    pub fn memory_utilization(&self) -> f64 {
        if self.memory_budget_bytes == 0 {
            0.0
        } else {
            self.estimated_memory_bytes as f64 / self.memory_budget_bytes as f64
        }
    }
}
