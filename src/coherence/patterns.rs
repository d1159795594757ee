//! Bounded LRU cache of compiled invalidation patterns.

use std::num::NonZeroUsize;

use lru::LruCache;
use regex::Regex;

/// Compiled patterns keyed by source, capped at `capacity`.
///
/// Every reuse refreshes recency; the least recently reused pattern is dropped
/// once the cap is exceeded.
pub struct PatternCache {
    compiled: LruCache<String, Regex>,
}

impl PatternCache {
    /// Creates a cache holding at most `capacity` patterns (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            compiled: LruCache::new(capacity),
        }
    }

    /// Returns the compiled form of `source`, compiling it on first use.
    pub fn get_or_compile(&mut self, source: &str) -> Result<Regex, regex::Error> {
        if let Some(regex) = self.compiled.get(source) {
            return Ok(regex.clone());
        }

        let regex = Regex::new(source)?;
        self.compiled.put(source.to_string(), regex.clone());
        Ok(regex)
    }

    #[inline]
    pub fn contains(&self, source: &str) -> bool {
        self.compiled.contains(source)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.compiled.cap().get()
    }

    pub fn clear(&mut self) {
        self.compiled.clear();
    }
}

impl std::fmt::Debug for PatternCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternCache")
            .field("len", &self.compiled.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
