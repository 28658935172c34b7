//! Throttle
//!
//! Leading-edge throttle: the first trigger runs immediately, later triggers
//! inside the interval are dropped.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::scheduler::{duration_ms, Scheduler};

// == Throttled ==
pub struct Throttled<A, F> {
    func: F,
    wait_ms: u64,
    clock: Arc<dyn Scheduler>,
    last_call: Mutex<Option<u64>>,
    _marker: PhantomData<fn(A)>,
}

impl<A, F: Fn(A)> Throttled<A, F> {
    pub fn new(func: F, wait: Duration, clock: Arc<dyn Scheduler>) -> Self {
        Self {
            func,
            wait_ms: duration_ms(wait),
            clock,
            last_call: Mutex::new(None),
            _marker: PhantomData,
        }
    }

    /// Runs `func(args)` unless the previous run was less than `wait` ago.
    ///
    /// Returns whether the call went through.
    pub fn call(&self, args: A) -> bool {
        let now = self.clock.now_ms();
        {
            let mut last = self.last_call.lock();
            if let Some(previous) = *last {
                if now.saturating_sub(previous) < self.wait_ms {
                    return false;
                }
            }
            *last = Some(now);
        }
        (self.func)(args);
        true
    }
}
