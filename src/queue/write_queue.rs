//! Batched Write Queue
//!
//! Queued writes are drained either by the single pending flush timer or by an
//! explicit flush. Draining keeps only the last payload per key.

use std::sync::{Arc, Weak};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::Result;
use crate::scheduler::{Scheduler, TimerHandle};
use crate::storage::KeyValueStore;

// == Queued Write ==
/// A pending write. The payload is already serialized JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedWrite {
    pub key: String,
    pub payload: String,
    /// Enqueue time (milliseconds)
    pub enqueued_at: u64,
}

// == Flush Report ==
/// Outcome of one flush.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Entries drained from the queue, duplicates included
    pub queued: usize,
    /// Keys persisted successfully
    pub written: usize,
    /// Keys whose write failed
    pub failed: Vec<String>,
}

impl FlushReport {
    pub fn is_noop(&self) -> bool {
        self.queued == 0
    }
}

#[derive(Debug, Default)]
struct QueueState {
    pending: Vec<QueuedWrite>,
    timer: Option<TimerHandle>,
}

// == Storage Queue ==
/// Write-coalescing queue in front of a key/value store.
pub struct StorageQueue {
    store: Arc<dyn KeyValueStore>,
    scheduler: Arc<dyn Scheduler>,
    flush_delay: Duration,
    state: Mutex<QueueState>,
    /// Serializes flushes so batches reach the store in flush order
    flush_lock: Mutex<()>,
    this: Weak<StorageQueue>,
}

impl StorageQueue {
    // == Constructor ==
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        scheduler: Arc<dyn Scheduler>,
        flush_delay: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            store,
            scheduler,
            flush_delay,
            state: Mutex::new(QueueState::default()),
            flush_lock: Mutex::new(()),
            this: this.clone(),
        })
    }

    // == Enqueue ==
    /// Serializes `value` and queues it for `key`.
    ///
    /// Arms the flush timer unless one is already pending. Serialization
    /// errors are returned and nothing is queued.
    pub fn enqueue<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        self.enqueue_raw(key, payload);
        Ok(())
    }

    /// Queues an already serialized payload.
    pub fn enqueue_raw(&self, key: &str, payload: String) {
        let mut state = self.state.lock();
        state.pending.push(QueuedWrite {
            key: key.to_string(),
            payload,
            enqueued_at: self.scheduler.now_ms(),
        });

        if state.timer.is_none() {
            let this = self.this.clone();
            let handle = self.scheduler.schedule_once(
                self.flush_delay,
                Box::new(move || {
                    if let Some(queue) = this.upgrade() {
                        queue.flush();
                    }
                }),
            );
            debug!("Armed flush timer {} for {:?}", handle.id(), self.flush_delay);
            state.timer = Some(handle);
        }
    }

    // == Flush ==
    /// Cancels the pending timer and writes the last payload of every key.
    ///
    /// Failures are logged per key and never stop the remaining writes.
    pub fn flush(&self) -> FlushReport {
        let _ordered = self.flush_lock.lock();

        let (pending, timer) = {
            let mut state = self.state.lock();
            (std::mem::take(&mut state.pending), state.timer.take())
        };

        if let Some(handle) = timer {
            self.scheduler.cancel(handle);
        }

        if pending.is_empty() {
            return FlushReport::default();
        }

        let queued = pending.len();
        let mut latest: IndexMap<String, String> = IndexMap::with_capacity(queued);
        for write in pending {
            latest.insert(write.key, write.payload);
        }

        let mut report = FlushReport {
            queued,
            ..FlushReport::default()
        };
        for (key, payload) in latest {
            match self.store.set(&key, &payload) {
                Ok(()) => report.written += 1,
                Err(e) => {
                    error!("Error saving {} to storage: {}", key, e);
                    report.failed.push(key);
                }
            }
        }

        debug!(
            "Flushed storage queue: {} queued, {} written, {} failed",
            report.queued,
            report.written,
            report.failed.len()
        );
        report
    }

    // == Diagnostics ==
    /// Pending writes before deduplication.
    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().pending.is_empty()
    }

    pub fn has_pending_flush(&self) -> bool {
        self.state.lock().timer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::scheduler::ManualScheduler;
    use crate::storage::MemoryStore;

    /// Store failing every write to one key.
    struct FailingKeyStore {
        inner: MemoryStore,
        poisoned: &'static str,
    }

    impl KeyValueStore for FailingKeyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if key == self.poisoned {
                return Err(CacheError::Storage("disk unavailable".to_string()));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }

        fn clear(&self) -> Result<()> {
            self.inner.clear()
        }

        fn len(&self) -> usize {
            self.inner.len()
        }
    }

    fn setup() -> (Arc<StorageQueue>, Arc<MemoryStore>, Arc<ManualScheduler>) {
        let store = Arc::new(MemoryStore::new());
        let scheduler = Arc::new(ManualScheduler::new());
        let queue = StorageQueue::new(
            store.clone(),
            scheduler.clone(),
            Duration::from_millis(100),
        );
        (queue, store, scheduler)
    }

    #[test]
    fn test_single_timer_for_many_writes() {
        let (queue, _, scheduler) = setup();

        queue.enqueue("a", &1).unwrap();
        queue.enqueue("b", &2).unwrap();
        queue.enqueue("a", &3).unwrap();

        assert_eq!(scheduler.pending(), 1);
        assert_eq!(queue.len(), 3);
        assert!(queue.has_pending_flush());
    }

    #[test]
    fn test_timer_flushes_after_delay() {
        let (queue, store, scheduler) = setup();
        queue.enqueue("eurUsdRate", &1.085).unwrap();

        scheduler.advance(Duration::from_millis(99));
        assert!(store.get("eurUsdRate").unwrap().is_none());

        scheduler.advance(Duration::from_millis(1));
        assert_eq!(store.get("eurUsdRate").unwrap().as_deref(), Some("1.085"));
        assert!(queue.is_empty());
        assert!(!queue.has_pending_flush());
    }

    #[test]
    fn test_explicit_flush_cancels_timer() {
        let (queue, store, scheduler) = setup();
        queue.enqueue("a", &1).unwrap();

        let report = queue.flush();
        assert_eq!(report.written, 1);
        assert_eq!(scheduler.pending(), 0);

        scheduler.advance(Duration::from_secs(1));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_empty_flush_is_noop() {
        let (queue, store, _) = setup();

        let report = queue.flush();

        assert!(report.is_noop());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_new_window_after_flush() {
        let (queue, store, scheduler) = setup();
        queue.enqueue("a", &1).unwrap();
        scheduler.advance(Duration::from_millis(100));

        queue.enqueue("a", &2).unwrap();
        assert!(queue.has_pending_flush());
        scheduler.advance(Duration::from_millis(100));

        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn test_failure_does_not_abort_batch() {
        let store = Arc::new(FailingKeyStore {
            inner: MemoryStore::new(),
            poisoned: "b",
        });
        let scheduler = Arc::new(ManualScheduler::new());
        let queue = StorageQueue::new(store.clone(), scheduler, Duration::from_millis(100));

        queue.enqueue("a", &1).unwrap();
        queue.enqueue("b", &2).unwrap();
        queue.enqueue("c", &3).unwrap();
        let report = queue.flush();

        assert_eq!(report.written, 2);
        assert_eq!(report.failed, vec!["b".to_string()]);
        assert_eq!(store.get("c").unwrap().as_deref(), Some("3"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_enqueue_records_timestamp() {
        let (queue, _, scheduler) = setup();
        scheduler.set_now(42);
        queue.enqueue_raw("a", "1".to_string());

        let pending = queue.state.lock().pending.clone();
        assert_eq!(pending[0].enqueued_at, 42);
    }

    #[test]
    fn test_dropped_queue_timer_is_harmless() {
        let (queue, store, scheduler) = setup();
        queue.enqueue("a", &1).unwrap();
        drop(queue);

        scheduler.advance(Duration::from_secs(1));
        assert_eq!(store.write_count(), 0);
    }
}
