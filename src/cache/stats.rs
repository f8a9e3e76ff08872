//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, loads, and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of lookups served from a live cached value
    pub hits: u64,
    /// Number of lookups that had to invoke the loader
    pub misses: u64,
    /// Number of loader invocations that failed
    pub load_failures: u64,
    /// Number of retained values released to make room
    pub evictions: u64,
    /// Number of retained values released after their TTL
    pub expirations: u64,
    /// Number of entries removed because their file disappeared
    pub swept: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Current number of values kept alive by the cache
    pub retained: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_load_failure(&mut self) {
        self.load_failures += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn record_swept(&mut self, count: usize) {
        self.swept += count as u64;
    }
}
