//! Process-local store.
//!
//! Entries survive tick boundaries; [`VolatileStore::advance_tick`] only moves
//! a diagnostic marker. Everything is lost on a full state reset.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::backend::CacheStore;
use crate::cache::{CachedEntry, StoreKind};
use crate::clock::TickClock;
use crate::constants::Tick;

pub struct VolatileStore<T> {
    entries: HashMap<String, CachedEntry<T>>,
    clock: TickClock,
    tick_marker: Tick,
    ticks_observed: u64,
}

impl<T> VolatileStore<T> {
    pub fn new(clock: TickClock) -> Self {
        let tick_marker = clock.now();
        Self {
            entries: HashMap::new(),
            clock,
            tick_marker,
            ticks_observed: 0,
        }
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    /// Last tick announced through [`CacheStore::advance_tick`].
    pub fn tick_marker(&self) -> Tick {
        self.tick_marker
    }

    /// Number of distinct ticks announced since construction.
    pub fn ticks_observed(&self) -> u64 {
        self.ticks_observed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&String, &CachedEntry<T>)> {
        self.entries.iter()
    }

    pub(crate) fn entry_mut(&mut self, key: &str) -> Option<&mut CachedEntry<T>> {
        self.entries.get_mut(key)
    }

    /// Removes entries expired at `now` and returns their keys.
    pub(crate) fn drain_expired(&mut self, now: Tick) -> Vec<String> {
        let expired: Vec<String> = self
            .entries
            .extract_if(|_, entry| entry.is_expired(now))
            .map(|(key, _)| key)
            .collect();
        if !expired.is_empty() {
            debug!(removed = expired.len(), tick = now, "Removed expired volatile entries");
        }
        expired
    }
}

impl<T: Send> CacheStore<T> for VolatileStore<T> {
    fn kind(&self) -> StoreKind {
        StoreKind::Volatile
    }

    fn advance_tick(&mut self, tick: Tick) {
        if tick != self.tick_marker {
            trace!(from = self.tick_marker, to = tick, "Volatile store observed new tick");
            self.tick_marker = tick;
            self.ticks_observed += 1;
        }
    }

    fn get(&mut self, key: &str) -> Option<&mut CachedEntry<T>> {
        self.entries.get_mut(key)
    }

    fn peek(&mut self, key: &str) -> Option<&CachedEntry<T>> {
        self.entries.get(key)
    }

    fn set(&mut self, key: &str, entry: CachedEntry<T>) {
        self.entries.insert(key.to_string(), entry);
    }

    fn remove(&mut self, key: &str) -> Option<CachedEntry<T>> {
        self.entries.remove(key)
    }

    fn has(&mut self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn keys(&mut self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn size(&mut self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn cleanup(&mut self) -> usize {
        let now = self.clock.now();
        self.drain_expired(now).len()
    }
}

impl<T> std::fmt::Debug for VolatileStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolatileStore")
            .field("entries", &self.entries.len())
            .field("tick_marker", &self.tick_marker)
            .finish()
    }
}
