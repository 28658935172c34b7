//! Debounce
//!
//! Each trigger re-arms a single timer; the wrapped function sees only the
//! arguments of the last trigger before the quiet period.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::scheduler::{Scheduler, TimerHandle};

struct State<A> {
    timer: Option<TimerHandle>,
    args: Option<A>,
    /// Bumped on every call and cancel; a timer task only runs for its own generation
    generation: u64,
}

struct Inner<A> {
    func: Box<dyn Fn(A) + Send + Sync>,
    wait: Duration,
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<State<A>>,
}

// == Debounced ==
/// Debounced wrapper around `func`.
pub struct Debounced<A> {
    inner: Arc<Inner<A>>,
}

impl<A: Send + 'static> Debounced<A> {
    pub fn new<F>(func: F, wait: Duration, scheduler: Arc<dyn Scheduler>) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                func: Box::new(func),
                wait,
                scheduler,
                state: Mutex::new(State {
                    timer: None,
                    args: None,
                    generation: 0,
                }),
            }),
        }
    }

    // == Call ==
    /// Replaces any pending invocation with one for `args` after the wait.
    pub fn call(&self, args: A) {
        let mut state = self.inner.state.lock();
        if let Some(handle) = state.timer.take() {
            self.inner.scheduler.cancel(handle);
        }
        state.args = Some(args);
        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;

        let weak: Weak<Inner<A>> = Arc::downgrade(&self.inner);
        let handle = self.inner.scheduler.schedule_once(
            self.inner.wait,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let args = {
                        let mut state = inner.state.lock();
                        // A cancel that lost the race against this task leaves it stale
                        if state.generation != generation {
                            return;
                        }
                        state.timer = None;
                        state.args.take()
                    };
                    if let Some(args) = args {
                        (inner.func)(args);
                    }
                }
            }),
        );
        state.timer = Some(handle);
    }

    /// Drops the pending invocation, if any.
    pub fn cancel(&self) {
        let mut state = self.inner.state.lock();
        if let Some(handle) = state.timer.take() {
            self.inner.scheduler.cancel(handle);
        }
        state.args = None;
        state.generation = state.generation.wrapping_add(1);
    }

    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().timer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{ManualScheduler, TimerTask};

    /// Scheduler whose `cancel` never reaches an armed timer, as when the timer
    /// task has already been dequeued and is about to run.
    struct LateCancelScheduler(ManualScheduler);

    impl Scheduler for LateCancelScheduler {
        fn now_ms(&self) -> u64 {
            self.0.now_ms()
        }

        fn schedule_once(&self, delay: Duration, task: TimerTask) -> TimerHandle {
            self.0.schedule_once(delay, task)
        }

        fn schedule_repeating(&self, interval: Duration, task: TimerTask) -> TimerHandle {
            self.0.schedule_repeating(interval, task)
        }

        fn cancel(&self, _handle: TimerHandle) {}
    }

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |x: u32| sink.lock().push(x))
    }

    #[test]
    fn test_only_last_trigger_runs() {
        let scheduler = Arc::new(ManualScheduler::new());
        let (seen, func) = recorder();
        let debounced = Debounced::new(func, Duration::from_millis(300), scheduler.clone());

        debounced.call(1);
        scheduler.advance(Duration::from_millis(200));
        debounced.call(2);
        scheduler.advance(Duration::from_millis(200));
        debounced.call(3);

        assert!(seen.lock().is_empty());
        scheduler.advance(Duration::from_millis(300));

        assert_eq!(*seen.lock(), vec![3]);
        assert!(!debounced.is_pending());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_separate_quiet_windows_each_run() {
        let scheduler = Arc::new(ManualScheduler::new());
        let (seen, func) = recorder();
        let debounced = Debounced::new(func, Duration::from_millis(100), scheduler.clone());

        debounced.call(1);
        scheduler.advance(Duration::from_millis(150));
        debounced.call(2);
        scheduler.advance(Duration::from_millis(150));

        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[test]
    fn test_cancel_drops_pending_call() {
        let scheduler = Arc::new(ManualScheduler::new());
        let (seen, func) = recorder();
        let debounced = Debounced::new(func, Duration::from_millis(100), scheduler.clone());

        debounced.call(1);
        debounced.cancel();
        scheduler.advance(Duration::from_secs(1));

        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_stale_timer_does_not_steal_new_args() {
        let scheduler = Arc::new(LateCancelScheduler(ManualScheduler::new()));
        let (seen, func) = recorder();
        let debounced = Debounced::new(func, Duration::from_millis(300), scheduler.clone());

        debounced.call(1);
        scheduler.0.advance(Duration::from_millis(200));
        debounced.call(2);

        // The first timer still fires at 300ms but must neither run nor disarm
        scheduler.0.advance(Duration::from_millis(100));
        assert!(seen.lock().is_empty());
        assert!(debounced.is_pending());

        scheduler.0.advance(Duration::from_millis(200));
        assert_eq!(*seen.lock(), vec![2]);
        assert!(!debounced.is_pending());
    }

    #[test]
    fn test_stale_timer_after_cancel_is_ignored() {
        let scheduler = Arc::new(LateCancelScheduler(ManualScheduler::new()));
        let (seen, func) = recorder();
        let debounced = Debounced::new(func, Duration::from_millis(100), scheduler.clone());

        debounced.call(1);
        debounced.cancel();
        debounced.call(2);
        debounced.cancel();
        scheduler.0.advance(Duration::from_secs(1));

        assert!(seen.lock().is_empty());
    }
}
