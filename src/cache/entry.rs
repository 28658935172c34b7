//! Memo Entry Module
//!
//! Defines a memoized result together with the time it was computed and the
//! TTL of the function that produced it.

use std::any::Any;
use std::sync::Arc;

/// Type-erased memoized result.
pub type MemoValue = Arc<dyn Any + Send + Sync>;

// == Memo Key ==
/// Cache key: the memoized function's namespace plus its canonical arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoKey {
    pub namespace: u64,
    pub args: String,
}

impl MemoKey {
    pub fn new(namespace: u64, args: impl Into<String>) -> Self {
        Self {
            namespace,
            args: args.into(),
        }
    }
}

// == Memo Entry ==
/// A single memoized result with its metadata.
#[derive(Debug, Clone)]
pub struct MemoEntry {
    /// The stored result
    pub value: MemoValue,
    /// Computation timestamp (milliseconds)
    pub created_at: u64,
    /// TTL of the producing function (milliseconds)
    pub ttl_ms: u64,
}

impl MemoEntry {
    // == Constructor ==
    pub fn new(value: MemoValue, now: u64, ttl_ms: u64) -> Self {
        Self {
            value,
            created_at: now,
            ttl_ms,
        }
    }

    /// Milliseconds since the result was computed.
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    // == Is Valid ==
    /// Valid while strictly younger than its TTL.
    ///
    /// An entry whose age equals the TTL is stale.
    pub fn is_valid(&self, now: u64) -> bool {
        self.age(now) < self.ttl_ms
    }

    pub fn is_expired(&self, now: u64) -> bool {
        !self.is_valid(now)
    }

    /// Remaining validity in milliseconds, 0 once stale.
    pub fn ttl_remaining_ms(&self, now: u64) -> u64 {
        self.ttl_ms.saturating_sub(self.age(now))
    }

    /// Returns the value if it holds an `R`.
    pub fn downcast<R: Clone + 'static>(&self) -> Option<R> {
        self.value.downcast_ref::<R>().cloned()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn entry(created_at: u64, ttl_ms: u64) -> MemoEntry {
        MemoEntry::new(Arc::new(5_i64), created_at, ttl_ms)
    }

    #[test]
    fn test_entry_valid_before_ttl() {
        let entry = entry(1_000, 500);
        assert!(entry.is_valid(1_000));
        assert!(entry.is_valid(1_499));
        assert_eq!(entry.ttl_remaining_ms(1_200), 300);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = entry(1_000, 500);

        // Age equal to TTL is already stale
        assert!(entry.is_expired(1_500));
        assert_eq!(entry.ttl_remaining_ms(1_500), 0);
    }

    #[test]
    fn test_age_never_underflows() {
        let entry = entry(1_000, 500);
        assert_eq!(entry.age(900), 0);
    }

    #[test]
    fn test_downcast() {
        let entry = entry(0, 10);
        assert_eq!(entry.downcast::<i64>(), Some(5));
        assert_eq!(entry.downcast::<String>(), None);
    }

    #[test]
    fn test_key_equality_includes_namespace() {
        assert_eq!(MemoKey::new(1, "[2,3]"), MemoKey::new(1, "[2,3]"));
        assert_ne!(MemoKey::new(1, "[2,3]"), MemoKey::new(2, "[2,3]"));
    }
}
