//! Memo Cleanup Task
//!
//! Periodic removal of memo entries that outlived the configured maximum age.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::cache::MemoStore;
use crate::scheduler::{Scheduler, TimerHandle};

/// Removes memo entries older than `max_age_ms` and logs the outcome.
///
/// Returns the number of entries removed.
pub fn cleanup_memo(memo: &Mutex<MemoStore>, now: u64, max_age_ms: u64) -> usize {
    let removed = memo.lock().cleanup(now, max_age_ms);

    if removed > 0 {
        info!("Memo cleanup: removed {} stale entries", removed);
    } else {
        debug!("Memo cleanup: no stale entries found");
    }
    removed
}

/// Arms a repeating timer that runs `cleanup_memo` every `interval`.
///
/// The timer only holds weak references, so dropping the memo store or the
/// scheduler turns remaining ticks into no-ops.
///
/// # Returns
/// The timer handle, to be passed to `Scheduler::cancel` to stop the task.
///
/// # Example
/// ```ignore
/// let handle = spawn_cleanup_task(&scheduler, &memo, Duration::from_secs(300), 3_600_000);
/// // Later, during shutdown:
/// scheduler.cancel(handle);
/// ```
pub fn spawn_cleanup_task(
    scheduler: &Arc<dyn Scheduler>,
    memo: &Arc<Mutex<MemoStore>>,
    interval: Duration,
    max_age_ms: u64,
) -> TimerHandle {
    let clock = Arc::downgrade(scheduler);
    let memo = Arc::downgrade(memo);

    let handle = scheduler.schedule_repeating(
        interval,
        Box::new(move || {
            if let (Some(clock), Some(memo)) = (clock.upgrade(), memo.upgrade()) {
                cleanup_memo(&memo, clock.now_ms(), max_age_ms);
            }
        }),
    );

    info!(
        "Started memo cleanup task {} with interval of {:?}",
        handle.id(),
        interval
    );
    handle
}
