//! Write Queue Module
//!
//! Coalesces storage writes: repeated writes to one key within a flush window
//! cost a single store operation.

mod write_queue;

pub use write_queue::{FlushReport, QueuedWrite, StorageQueue};

// == Public Constants ==
/// Default delay between the first queued write and the automatic flush (ms)
pub const DEFAULT_FLUSH_DELAY_MS: u64 = 100;
