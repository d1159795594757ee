use std::env;

use crate::constants::{DEFAULT_PERSIST_INTERVAL_TICKS, Tick};

/// Default snapshot segment name.
pub const DEFAULT_SEGMENT: &str = "cache";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Durable store configuration.
pub struct DurableStoreConfig {
    /// Snapshot segment this store owns. Holds the namespace index; each
    /// namespace record lives under [`DurableStoreConfig::namespace_segment`].
    pub segment: String,
    /// Minimum ticks between two throttled persistence passes.
    pub persist_interval_ticks: Tick,
}

impl Default for DurableStoreConfig {
    fn default() -> Self {
        Self {
            segment: DEFAULT_SEGMENT.to_string(),
            persist_interval_ticks: DEFAULT_PERSIST_INTERVAL_TICKS,
        }
    }
}

impl DurableStoreConfig {
    const ENV_PERSIST_INTERVAL_TICKS: &'static str = "TICKCACHE_PERSIST_INTERVAL_TICKS";

    pub fn new(segment: &str) -> Self {
        Self {
            segment: segment.to_string(),
            ..Default::default()
        }
    }

    pub fn persist_interval(mut self, ticks: Tick) -> Self {
        self.persist_interval_ticks = ticks;
        self
    }

    /// Segment holding the record of `namespace`.
    pub fn namespace_segment(&self, namespace: &str) -> String {
        format!("{}/{}", self.segment, namespace)
    }

    /// Loads the persist interval from the environment (falling back to the default).
    pub fn from_env(segment: &str) -> Self {
        let defaults = Self::new(segment);
        let persist_interval_ticks = env::var(Self::ENV_PERSIST_INTERVAL_TICKS)
            .ok()
            .and_then(|s| s.parse::<Tick>().ok())
            .unwrap_or(defaults.persist_interval_ticks);
        Self {
            persist_interval_ticks,
            ..defaults
        }
    }
}
