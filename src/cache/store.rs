//! Memo Store Module
//!
//! Holds memoized results for every memoized function of a session.
//! Expiry is lazy: stale entries linger until overwritten or cleaned up.

use std::collections::HashMap;

use crate::cache::{MemoEntry, MemoKey, MemoStats, MemoValue};

// == Memo Store ==
/// Shared storage behind all memoized functions.
#[derive(Debug, Default)]
pub struct MemoStore {
    /// Memoized results by namespace and canonical arguments
    entries: HashMap<MemoKey, MemoEntry>,
    /// Hit/miss counters
    stats: MemoStats,
    /// Next namespace handed to a memoized function
    next_namespace: u64,
}

impl MemoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a namespace for a newly memoized function.
    pub fn register(&mut self) -> u64 {
        let namespace = self.next_namespace;
        self.next_namespace += 1;
        namespace
    }

    // == Lookup ==
    /// Returns the stored value for `key` if it is still valid at `now`.
    ///
    /// Records a hit or a miss. Stale entries are left in place.
    pub fn lookup(&mut self, key: &MemoKey, now: u64) -> Option<MemoValue> {
        match self.entries.get(key) {
            Some(entry) if entry.is_valid(now) => {
                let value = entry.value.clone();
                self.stats.record_hit();
                Some(value)
            }
            _ => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Stores (or overwrites) the entry for `key`.
    pub fn insert(&mut self, key: MemoKey, entry: MemoEntry) {
        self.entries.insert(key, entry);
    }

    pub fn get(&self, key: &MemoKey) -> Option<&MemoEntry> {
        self.entries.get(key)
    }

    // == Clear ==
    /// Evicts every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // == Cleanup ==
    /// Removes entries older than `max_age` (strictly) at `now`.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&mut self, now: u64, max_age: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.age(now) <= max_age);
        before - self.entries.len()
    }

    // == Stats ==
    /// Snapshot of the store, judging each entry against its own TTL.
    pub fn stats(&self, now: u64) -> MemoStats {
        let valid = self
            .entries
            .values()
            .filter(|entry| entry.is_valid(now))
            .count();

        MemoStats {
            size: self.entries.len(),
            valid,
            expired: self.entries.len() - valid,
            ..self.stats.clone()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
