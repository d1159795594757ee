//! Cross-cache invalidation, budget enforcement and reporting.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::patterns::PatternCache;
use super::registry::{CoherentCache, RegisterOptions, RegisteredCache};
use super::scope::{InvalidationScope, ScopeAction};
use super::stats::{CoherenceStats, TierStats};
use super::tier::CacheTier;
use crate::clock::TickClock;
use crate::config::CoherenceConfig;
use crate::constants::Tick;

/// Coordinates every registered cache: scope invalidation, global memory
/// budget, throttled cleanup and durable-tier persistence.
pub struct CacheCoherence {
    config: CoherenceConfig,
    clock: TickClock,
    caches: BTreeMap<String, RegisteredCache>,
    patterns: PatternCache,
    invalidations: u64,
    last_cleanup: Option<Tick>,
}

impl CacheCoherence {
    pub fn new(clock: TickClock, config: CoherenceConfig) -> Self {
        Self {
            patterns: PatternCache::new(config.pattern_cache_capacity),
            config,
            clock,
            caches: BTreeMap::new(),
            invalidations: 0,
            last_cleanup: None,
        }
    }

    pub fn config(&self) -> &CoherenceConfig {
        &self.config
    }

    pub fn pattern_cache(&self) -> &PatternCache {
        &self.patterns
    }

    /// Registers `cache` under `namespace`, replacing any previous registration.
    pub fn register_cache<C>(
        &mut self,
        namespace: &str,
        cache: C,
        tier: CacheTier,
        options: RegisterOptions,
    ) where
        C: CoherentCache + 'static,
    {
        self.register_shared(namespace, Arc::new(cache), tier, options);
    }

    /// Same as [`CacheCoherence::register_cache`] for an already shared cache.
    pub fn register_shared(
        &mut self,
        namespace: &str,
        cache: Arc<dyn CoherentCache>,
        tier: CacheTier,
        options: RegisterOptions,
    ) {
        let registered = RegisteredCache::new(namespace.to_string(), cache, tier, options);
        info!(
            namespace,
            tier = %tier,
            priority = registered.priority,
            store = %registered.cache().store_kind(),
            "Cache registered"
        );
        if self
            .caches
            .insert(namespace.to_string(), registered)
            .is_some()
        {
            warn!(namespace, "Replaced existing cache registration");
        }
    }

    pub fn unregister_cache(&mut self, namespace: &str) -> bool {
        self.caches.remove(namespace).is_some()
    }

    pub fn is_registered(&self, namespace: &str) -> bool {
        self.caches.contains_key(namespace)
    }

    /// Registrations ordered by namespace.
    pub fn registered_caches(&self) -> impl Iterator<Item = &RegisteredCache> {
        self.caches.values()
    }

    pub fn registered_namespaces(&self) -> Vec<String> {
        self.caches.keys().cloned().collect()
    }

    pub fn memory_budget(&self) -> usize {
        self.config.memory_budget_bytes
    }

    pub fn set_memory_budget(&mut self, bytes: usize) {
        self.config.memory_budget_bytes = bytes;
    }

    /// Running count of entries removed by [`CacheCoherence::invalidate`].
    pub fn invalidation_count(&self) -> u64 {
        self.invalidations
    }

    /// Removes what `scope` describes from every namespace it targets.
    ///
    /// Scopes missing a required identifier, or carrying an invalid pattern,
    /// are no-ops. Returns the number of entries removed.
    #[instrument(skip(self, scope), fields(scope = scope.kind.name()))]
    pub fn invalidate(&mut self, scope: &InvalidationScope) -> usize {
        let Some(action) = scope.kind.action() else {
            warn!(scope = ?scope.kind, "Invalid invalidation scope, ignoring");
            return 0;
        };

        let pattern = match &action {
            ScopeAction::Pattern(source) => match self.patterns.get_or_compile(source) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!(pattern = %source, error = %e, "Invalid invalidation pattern, ignoring");
                    return 0;
                }
            },
            _ => None,
        };

        let mut removed = 0usize;
        for registered in self.targets(scope) {
            let namespace = registered.namespace.as_str();
            let cache = registered.cache();
            removed += match (&action, &pattern) {
                (ScopeAction::ClearAll, _) => cache.clear(namespace),
                (ScopeAction::Exact(key), _) => usize::from(cache.invalidate(key, namespace)),
                (ScopeAction::Pattern(_), Some(regex)) => {
                    cache.invalidate_pattern(regex, namespace)
                }
                (ScopeAction::Pattern(_), None) => 0,
            };
        }

        self.invalidations += removed as u64;
        if removed > 0 {
            info!(removed, total = self.invalidations, "Scope invalidated");
        } else {
            debug!("Scope invalidation removed nothing");
        }
        removed
    }

    fn targets<'a>(&'a self, scope: &'a InvalidationScope) -> Vec<&'a RegisteredCache> {
        match &scope.namespaces {
            None => self.caches.values().collect(),
            Some(list) => list
                .iter()
                .filter_map(|namespace| {
                    let found = self.caches.get(namespace);
                    if found.is_none() {
                        debug!(namespace = %namespace, "Invalidation target not registered");
                    }
                    found
                })
                .collect(),
        }
    }

    /// Estimated bytes held by `registered`.
    fn cache_usage(&self, registered: &RegisteredCache) -> usize {
        registered
            .size()
            .saturating_mul(self.config.bytes_per_entry(&registered.namespace))
    }

    /// `Σ size × estimated bytes per entry` across registered caches.
    pub fn estimate_memory(&self) -> usize {
        self.caches
            .values()
            .map(|registered| self.cache_usage(registered))
            .fold(0usize, usize::saturating_add)
    }

    /// Evicts until per-cache caps and the global budget hold, lowest priority first.
    ///
    /// Caches without an LRU primitive fall back to expiry cleanup, which may
    /// not free enough. Returns the number of entries evicted.
    #[instrument(skip(self))]
    pub fn enforce_memory_limits(&mut self) -> usize {
        let mut evicted = self.enforce_cache_caps();

        let usage = self.estimate_memory();
        let budget = self.config.memory_budget_bytes;
        if usage <= budget {
            return evicted;
        }
        let excess = usage - budget;

        let mut ordered: Vec<&RegisteredCache> = self.caches.values().collect();
        ordered.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.namespace.cmp(&b.namespace))
        });

        let mut freed = 0usize;
        for registered in ordered {
            if freed >= excess {
                break;
            }
            let per_entry = self.config.bytes_per_entry(&registered.namespace).max(1);
            loop {
                let size = registered.size();
                if size == 0 || freed >= excess {
                    break;
                }
                let batch = self.batch_size(size);
                let needed = (excess - freed).div_ceil(per_entry);
                let removed = registered.evict(batch.min(needed));
                if removed == 0 {
                    break;
                }
                freed = freed.saturating_add(removed.saturating_mul(per_entry));
                evicted += removed;
                debug!(
                    namespace = %registered.namespace,
                    priority = registered.priority,
                    removed,
                    "Budget eviction"
                );
            }
        }

        if freed < excess {
            warn!(
                usage,
                budget,
                freed,
                "Memory budget still exceeded after a full sweep"
            );
        }
        info!(evicted, usage, budget, "Memory limits enforced");
        evicted
    }

    fn enforce_cache_caps(&self) -> usize {
        let mut evicted = 0;
        for registered in self.caches.values() {
            let Some(cap) = registered.max_memory_bytes else {
                continue;
            };
            let per_entry = self.config.bytes_per_entry(&registered.namespace).max(1);
            let usage = self.cache_usage(registered);
            if usage <= cap {
                continue;
            }
            let removed = registered.evict((usage - cap).div_ceil(per_entry));
            debug!(namespace = %registered.namespace, cap, removed, "Per-cache cap eviction");
            evicted += removed;
        }
        evicted
    }

    #[inline]
    fn batch_size(&self, size: usize) -> usize {
        ((size as f64 * self.config.eviction_fraction).floor() as usize).max(1)
    }

    /// Cleans every registered cache, then enforces memory limits.
    ///
    /// Skipped entirely if called again within the cleanup interval.
    #[instrument(skip(self))]
    pub fn cleanup(&mut self) -> usize {
        let now = self.clock.now();
        if let Some(last) = self.last_cleanup {
            if now.saturating_sub(last) < self.config.cleanup_interval_ticks {
                debug!(last, tick = now, "Coherence cleanup throttled");
                return 0;
            }
        }
        self.last_cleanup = Some(now);

        let expired: usize = self
            .caches
            .values()
            .map(|registered| registered.cache().cleanup())
            .sum();
        let evicted = self.enforce_memory_limits();
        debug!(expired, evicted, tick = now, "Coherence cleanup");
        expired + evicted
    }

    /// Persists every cache registered in the durable tier.
    #[instrument(skip(self))]
    pub fn persist(&self) -> usize {
        let written: usize = self
            .caches
            .values()
            .filter(|registered| registered.tier.is_durable())
            .map(|registered| registered.cache().persist())
            .sum();
        if written > 0 {
            info!(written, tick = self.clock.now(), "Durable tier persisted");
        }
        written
    }

    /// Forwards the current tick to every registered cache.
    pub fn advance_tick(&self) {
        for registered in self.caches.values() {
            registered.cache().advance_tick();
        }
    }

    /// Clears every registered namespace. Returns the count removed.
    pub fn clear_all(&mut self) -> usize {
        let removed: usize = self
            .caches
            .values()
            .map(|registered| registered.cache().clear(&registered.namespace))
            .sum();
        info!(removed, "All registered caches cleared");
        removed
    }

    pub fn stats(&self) -> CoherenceStats {
        let mut stats = CoherenceStats {
            memory_budget_bytes: self.config.memory_budget_bytes,
            invalidations: self.invalidations,
            tiers: CacheTier::ALL
                .into_iter()
                .map(|tier| (tier, TierStats::default()))
                .collect(),
            ..Default::default()
        };

        for registered in self.caches.values() {
            let ns_stats = registered.stats();
            let per_entry = self.config.bytes_per_entry(&registered.namespace);

            stats.total_hits += ns_stats.hits;
            stats.total_misses += ns_stats.misses;
            stats.total_evictions += ns_stats.evictions;
            stats.total_size += ns_stats.size;
            stats.estimated_memory_bytes = stats
                .estimated_memory_bytes
                .saturating_add(ns_stats.size.saturating_mul(per_entry));
            stats
                .tiers
                .entry(registered.tier)
                .or_default()
                .add(&ns_stats);
            stats.namespaces.insert(registered.namespace.clone(), ns_stats);
        }

        stats.hit_rate = crate::cache::hit_rate(stats.total_hits, stats.total_misses);
        stats
    }
}

impl std::fmt::Debug for CacheCoherence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheCoherence")
            .field("caches", &self.caches.len())
            .field("memory_budget_bytes", &self.config.memory_budget_bytes)
            .field("patterns", &self.patterns.len())
            .field("invalidations", &self.invalidations)
            .field("last_cleanup", &self.last_cleanup)
            .finish()
    }
}
