//! Cache Module
//!
//! Element handle caching and TTL memoization.

mod element;
mod entry;
mod memo;
mod stats;
mod store;


// Re-export public types
pub use element::{Document, ElementCache, StaticDocument};
pub use entry::{MemoEntry, MemoKey, MemoValue};
pub use memo::{canonical_key, Memoized};
pub use stats::MemoStats;
pub use store::MemoStore;

// == Public Constants ==
/// Default memoization TTL in milliseconds (one hour)
pub const DEFAULT_MEMO_TTL_MS: u64 = 3_600_000;

/// Default maximum age used by the automatic cleanup (one hour)
pub const DEFAULT_CLEANUP_MAX_AGE_MS: u64 = 3_600_000;
