//! Scheduler Module
//!
//! Deferred execution primitives used by the write queue, the auto cleanup
//! timer and the debounce helper.
//!
//! # Implementations
//! - `ManualScheduler`: virtual clock advanced explicitly (tests, simulations)
//! - `TokioScheduler`: real timers on a tokio runtime

mod manual;
mod runtime;

pub use manual::ManualScheduler;
pub use runtime::TokioScheduler;

use std::time::Duration;

/// Callback run when a timer fires. Repeating timers reuse the same closure.
pub type TimerTask = Box<dyn FnMut() + Send + 'static>;

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// == Timer Handle ==
/// Opaque identifier of an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub(crate) u64);

impl TimerHandle {
    /// Returns the raw timer id, useful in log lines.
    pub fn id(&self) -> u64 {
        self.0
    }
}

// == Scheduler Trait ==
/// Clock plus timer facility.
///
/// Implementations must never run a task from inside `schedule_once` or
/// `schedule_repeating`; callers may hold their own locks while scheduling.
pub trait Scheduler: Send + Sync {
    /// Current time in milliseconds.
    fn now_ms(&self) -> u64;

    /// Runs `task` once after `delay`.
    fn schedule_once(&self, delay: Duration, task: TimerTask) -> TimerHandle;

    /// Runs `task` every `interval`, first run one interval from now.
    fn schedule_repeating(&self, interval: Duration, task: TimerTask) -> TimerHandle;

    /// Disarms a timer. Unknown, fired or already cancelled handles are ignored.
    fn cancel(&self, handle: TimerHandle);
}
