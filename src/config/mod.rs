//! Environment-backed configuration for the coherence layer.
//!
//! Every setting has a default. Override with `TICKCACHE_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_BYTES_PER_ENTRY, DEFAULT_CLEANUP_INTERVAL_TICKS, DEFAULT_EVICTION_FRACTION,
    DEFAULT_MEMORY_BUDGET_BYTES, DEFAULT_PATTERN_CACHE_CAPACITY, Tick,
};

/// Coherence-layer configuration.
///
/// Use [`CoherenceConfig::from_env`] to read `TICKCACHE_*` overrides on top of defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CoherenceConfig {
    /// Global memory budget across registered caches. Default: 2 MiB.
    pub memory_budget_bytes: usize,

    /// Estimated size of one entry in a namespace without its own estimate. Default: `256`.
    pub default_bytes_per_entry: usize,

    /// Minimum ticks between two coherence cleanup passes. Default: `10`.
    pub cleanup_interval_ticks: Tick,

    /// Compiled invalidation patterns kept for reuse. Default: `100`.
    pub pattern_cache_capacity: usize,

    /// Share of a cache evicted per batch while over budget. Default: `0.1`.
    pub eviction_fraction: f64,

    /// Per-namespace bytes-per-entry estimates.
    pub entry_estimates: HashMap<String, usize>,
}

impl Default for CoherenceConfig {
    fn default() -> Self {
        Self {
            memory_budget_bytes: DEFAULT_MEMORY_BUDGET_BYTES,
            default_bytes_per_entry: DEFAULT_BYTES_PER_ENTRY,
            cleanup_interval_ticks: DEFAULT_CLEANUP_INTERVAL_TICKS,
            pattern_cache_capacity: DEFAULT_PATTERN_CACHE_CAPACITY,
            eviction_fraction: DEFAULT_EVICTION_FRACTION,
            entry_estimates: HashMap::new(),
        }
    }
}

impl CoherenceConfig {
    const ENV_MEMORY_BUDGET_BYTES: &'static str = "TICKCACHE_MEMORY_BUDGET_BYTES";
    const ENV_DEFAULT_BYTES_PER_ENTRY: &'static str = "TICKCACHE_DEFAULT_BYTES_PER_ENTRY";
    const ENV_CLEANUP_INTERVAL_TICKS: &'static str = "TICKCACHE_CLEANUP_INTERVAL_TICKS";
    const ENV_PATTERN_CACHE_CAPACITY: &'static str = "TICKCACHE_PATTERN_CACHE_CAPACITY";
    const ENV_EVICTION_FRACTION: &'static str = "TICKCACHE_EVICTION_FRACTION";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let memory_budget_bytes =
            Self::parse_from_env(Self::ENV_MEMORY_BUDGET_BYTES, defaults.memory_budget_bytes)?;
        let default_bytes_per_entry = Self::parse_from_env(
            Self::ENV_DEFAULT_BYTES_PER_ENTRY,
            defaults.default_bytes_per_entry,
        )?;
        let cleanup_interval_ticks = Self::parse_from_env(
            Self::ENV_CLEANUP_INTERVAL_TICKS,
            defaults.cleanup_interval_ticks,
        )?;
        let pattern_cache_capacity = Self::parse_from_env(
            Self::ENV_PATTERN_CACHE_CAPACITY,
            defaults.pattern_cache_capacity,
        )?;
        let eviction_fraction =
            Self::parse_from_env(Self::ENV_EVICTION_FRACTION, defaults.eviction_fraction)?;

        let config = Self {
            memory_budget_bytes,
            default_bytes_per_entry,
            cleanup_interval_ticks,
            pattern_cache_capacity,
            eviction_fraction,
            entry_estimates: defaults.entry_estimates,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the coherence layer relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_budget_bytes == 0 {
            return Err(ConfigError::ZeroValue {
                name: "memory_budget_bytes",
            });
        }
        if self.default_bytes_per_entry == 0 {
            return Err(ConfigError::ZeroValue {
                name: "default_bytes_per_entry",
            });
        }
        if self.pattern_cache_capacity == 0 {
            return Err(ConfigError::ZeroValue {
                name: "pattern_cache_capacity",
            });
        }
        let fraction_in_range = self.eviction_fraction > 0.0 && self.eviction_fraction <= 1.0;
        if !fraction_in_range {
            return Err(ConfigError::InvalidFraction {
                value: self.eviction_fraction,
            });
        }
        if let Some((namespace, _)) = self.entry_estimates.iter().find(|(_, bytes)| **bytes == 0) {
            return Err(ConfigError::ZeroEntryEstimate {
                namespace: namespace.clone(),
            });
        }
        Ok(())
    }

    pub fn memory_budget(mut self, bytes: usize) -> Self {
        self.memory_budget_bytes = bytes;
        self
    }

    pub fn default_bytes_per_entry(mut self, bytes: usize) -> Self {
        self.default_bytes_per_entry = bytes;
        self
    }

    pub fn cleanup_interval(mut self, ticks: Tick) -> Self {
        self.cleanup_interval_ticks = ticks;
        self
    }

    pub fn pattern_cache_capacity(mut self, capacity: usize) -> Self {
        self.pattern_cache_capacity = capacity;
        self
    }

    /// Sets the estimated bytes per entry for one namespace.
    pub fn with_entry_estimate(mut self, namespace: &str, bytes: usize) -> Self {
        self.entry_estimates.insert(namespace.to_string(), bytes);
        self
    }

    /// Estimated bytes per entry for `namespace`.
    #[inline]
    pub fn bytes_per_entry(&self, namespace: &str) -> usize {
        self.entry_estimates
            .get(namespace)
            .copied()
            .unwrap_or(self.default_bytes_per_entry)
    }

    fn parse_from_env<V>(var_name: &'static str, default: V) -> Result<V, ConfigError>
    where
        V: FromStr,
        V::Err: std::fmt::Display,
    {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e: V::Err| ConfigError::InvalidValue {
                    name: var_name,
                    value,
                    reason: e.to_string(),
                }),
            Err(_) => Ok(default),
        }
    }
}
