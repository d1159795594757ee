//! Shared logical clock.
//!
//! The host advances the clock once per step; every store and manager holds a
//! clone and reads [`TickClock::now`] instead of a wall clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::Tick;

/// Cheaply clonable handle to the current logical tick.
#[derive(Clone, Default)]
pub struct TickClock {
    tick: Arc<AtomicU64>,
}

impl TickClock {
    /// Creates a clock starting at `start`.
    pub fn new(start: Tick) -> Self {
        Self {
            tick: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Returns the current tick.
    #[inline]
    pub fn now(&self) -> Tick {
        self.tick.load(Ordering::Acquire)
    }

    /// Moves the clock to `tick`. Earlier ticks are ignored (the clock is monotonic).
    #[inline]
    pub fn set(&self, tick: Tick) {
        self.tick.fetch_max(tick, Ordering::AcqRel);
    }

    /// Advances the clock by `ticks` and returns the new tick.
    #[inline]
    pub fn advance(&self, ticks: Tick) -> Tick {
        self.tick.fetch_add(ticks, Ordering::AcqRel) + ticks
    }
}

impl std::fmt::Debug for TickClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickClock")
            .field("tick", &self.now())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_starts_at_given_tick() {
        let clock = TickClock::new(42);
        assert_eq!(clock.now(), 42);
    }

    #[test]
    fn test_clock_clones_share_state() {
        let clock = TickClock::new(0);
        let other = clock.clone();
        clock.advance(5);
        assert_eq!(other.now(), 5);
    }

    #[test]
    fn test_clock_never_moves_backward() {
        let clock = TickClock::new(100);
        clock.set(50);
        assert_eq!(clock.now(), 100);
        clock.set(150);
        assert_eq!(clock.now(), 150);
    }
}
