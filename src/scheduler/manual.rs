//! Manual Scheduler
//!
//! Virtual clock that only moves when told to. Timers fire in due-time order
//! during `advance`, which makes timer-driven code deterministic under test.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use super::{duration_ms, Scheduler, TimerHandle, TimerTask};

struct Timer {
    due: u64,
    interval: Option<u64>,
    task: TimerTask,
}

#[derive(Default)]
struct State {
    now: u64,
    next_id: u64,
    timers: HashMap<u64, Timer>,
    /// Timer whose task is executing right now, and whether it was cancelled meanwhile
    running: Option<(u64, bool)>,
}

// == Manual Scheduler ==
/// Scheduler driven by an explicit virtual clock.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<State>,
}

impl ManualScheduler {
    /// Creates a scheduler whose clock starts at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scheduler whose clock starts at `now_ms`.
    pub fn starting_at(now_ms: u64) -> Self {
        let scheduler = Self::new();
        scheduler.state.lock().now = now_ms;
        scheduler
    }

    // == Advance ==
    /// Moves the clock forward by `by`, firing every timer that falls due.
    ///
    /// Returns the number of task executions.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now.saturating_add(duration_ms(by));
        let mut fired = 0;

        loop {
            // Pick the earliest due timer, ties broken by creation order
            let next = {
                let mut state = self.state.lock();
                let candidate = state
                    .timers
                    .iter()
                    .filter(|(_, timer)| timer.due <= target)
                    .map(|(id, timer)| (timer.due, *id))
                    .min();

                match candidate {
                    Some((due, id)) => {
                        state.now = due;
                        state.running = Some((id, false));
                        state.timers.remove(&id).map(|timer| (id, timer))
                    }
                    None => None,
                }
            };

            let Some((id, mut timer)) = next else {
                break;
            };

            trace!("Manual scheduler firing timer {} at {}ms", id, timer.due);
            (timer.task)();
            fired += 1;

            let mut state = self.state.lock();
            let cancelled = matches!(state.running, Some((_, true)));
            state.running = None;
            if let (Some(interval), false) = (timer.interval, cancelled) {
                timer.due = timer.due.saturating_add(interval);
                state.timers.insert(id, timer);
            }
        }

        self.state.lock().now = target;
        fired
    }

    /// Jumps the clock to an absolute time without firing timers.
    pub fn set_now(&self, now_ms: u64) {
        self.state.lock().now = now_ms;
    }

    /// Number of armed timers.
    pub fn pending(&self) -> usize {
        self.state.lock().timers.len()
    }

    fn arm(&self, delay: Duration, interval: Option<u64>, task: TimerTask) -> TimerHandle {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now.saturating_add(duration_ms(delay));
        state.timers.insert(id, Timer { due, interval, task });
        TimerHandle(id)
    }
}

impl Scheduler for ManualScheduler {
    fn now_ms(&self) -> u64 {
        self.state.lock().now
    }

    fn schedule_once(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        self.arm(delay, None, task)
    }

    fn schedule_repeating(&self, interval: Duration, task: TimerTask) -> TimerHandle {
        // A zero interval would never let `advance` terminate
        let period = duration_ms(interval).max(1);
        self.arm(Duration::from_millis(period), Some(period), task)
    }

    fn cancel(&self, handle: TimerHandle) {
        let mut state = self.state.lock();
        if state.timers.remove(&handle.0).is_none() {
            if let Some((id, cancelled)) = state.running.as_mut() {
                if *id == handle.0 {
                    *cancelled = true;
                }
            }
        }
    }
}
