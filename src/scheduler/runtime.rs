//! Tokio Scheduler
//!
//! Real timers backed by tokio tasks. Each armed timer is a spawned task;
//! cancelling aborts it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use super::{duration_ms, Scheduler, TimerHandle, TimerTask};
use crate::error::{CacheError, Result};

// == Tokio Scheduler ==
/// Scheduler spawning timer tasks on a tokio runtime.
pub struct TokioScheduler {
    runtime: Handle,
    next_id: AtomicU64,
    tasks: Arc<Mutex<HashMap<u64, JoinHandle<()>>>>,
    /// Wall clock at construction (Unix milliseconds)
    epoch_ms: u64,
    /// Runtime instant at construction, so paused test time moves `now_ms`
    started: Instant,
}

impl TokioScheduler {
    // == Constructor ==
    /// Creates a scheduler bound to the runtime of the calling context.
    ///
    /// Fails with `CacheError::Internal` outside a tokio runtime.
    pub fn new() -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| CacheError::Internal(format!("No tokio runtime available: {}", e)))?;
        Ok(Self::with_handle(runtime))
    }

    /// Creates a scheduler bound to an explicit runtime handle.
    pub fn with_handle(runtime: Handle) -> Self {
        let started = {
            let _guard = runtime.enter();
            Instant::now()
        };
        Self {
            runtime,
            next_id: AtomicU64::new(0),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            epoch_ms: Utc::now().timestamp_millis().max(0) as u64,
            started,
        }
    }

    /// Number of timers still armed.
    pub fn pending(&self) -> usize {
        self.tasks.lock().values().filter(|h| !h.is_finished()).count()
    }

    fn spawn_timer<F>(&self, make: F) -> TimerHandle
    where
        F: FnOnce(u64, Arc<Mutex<HashMap<u64, JoinHandle<()>>>>) -> JoinHandle<()>,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        // Hold the map while spawning so the task cannot deregister before it is registered
        let mut tasks = self.tasks.lock();
        let join = make(id, self.tasks.clone());
        tasks.insert(id, join);
        TimerHandle(id)
    }
}

impl Scheduler for TokioScheduler {
    fn now_ms(&self) -> u64 {
        let _guard = self.runtime.enter();
        self.epoch_ms.saturating_add(duration_ms(self.started.elapsed()))
    }

    fn schedule_once(&self, delay: Duration, mut task: TimerTask) -> TimerHandle {
        let runtime = self.runtime.clone();
        self.spawn_timer(move |id, tasks| {
            runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                // Deregister first so a task cancelling its own handle is a no-op
                tasks.lock().remove(&id);
                task();
            })
        })
    }

    fn schedule_repeating(&self, interval: Duration, mut task: TimerTask) -> TimerHandle {
        let runtime = self.runtime.clone();
        let period = interval.max(Duration::from_millis(1));
        self.spawn_timer(move |_, _| {
            runtime.spawn(async move {
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    task();
                }
            })
        })
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(join) = self.tasks.lock().remove(&handle.0) {
            join.abort();
            debug!("Cancelled timer {}", handle.0);
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, join) in self.tasks.lock().drain() {
            join.abort();
        }
    }
}
