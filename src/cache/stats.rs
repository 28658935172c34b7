//! Cache Statistics Module
//!
//! Diagnostics for the memo cache: size, validity split, hits and misses.

use serde::Serialize;

// == Memo Stats ==
/// Snapshot of memo cache metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemoStats {
    /// Number of stored entries, valid or not
    pub size: usize,
    /// Entries still younger than their own TTL
    pub valid: usize,
    /// Entries past their TTL that no cleanup pass has removed yet
    pub expired: usize,
    /// Calls answered from the cache
    pub hits: u64,
    /// Calls that invoked the memoized function
    pub misses: u64,
}

impl MemoStats {
    // == Constructor ==
    /// Creates a new MemoStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no calls have been made.
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
}
