use serde::{Deserialize, Serialize};

/// Priority of caches registered without an explicit one, by tier.
pub const L1_DEFAULT_PRIORITY: i32 = 100;
pub const L2_DEFAULT_PRIORITY: i32 = 50;
pub const L3_DEFAULT_PRIORITY: i32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Reporting and default-priority group of a registered cache, fastest first.
///
/// Tiers do not change where data lives; a cache's store kind does.
pub enum CacheTier {
    /// Hot, per-tick data. Evicted last.
    L1,
    /// Warm, multi-tick data.
    L2,
    /// Durable data. The only tier the coherence layer persists.
    L3,
}

impl CacheTier {
    pub const ALL: [CacheTier; 3] = [CacheTier::L1, CacheTier::L2, CacheTier::L3];

    /// Lower priority is evicted first under budget pressure.
    #[inline]
    pub fn default_priority(self) -> i32 {
        match self {
            CacheTier::L1 => L1_DEFAULT_PRIORITY,
            CacheTier::L2 => L2_DEFAULT_PRIORITY,
            CacheTier::L3 => L3_DEFAULT_PRIORITY,
        }
    }

    #[inline]
    pub fn is_durable(self) -> bool {
        matches!(self, CacheTier::L3)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CacheTier::L1 => "l1",
            CacheTier::L2 => "l2",
            CacheTier::L3 => "l3",
        }
    }
}

impl std::fmt::Display for CacheTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
