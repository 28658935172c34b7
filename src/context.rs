//! Cache Context
//!
//! One explicit object per session owning the element cache, the write queue
//! and the memo cache. Cloning the context shares the same caches.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use crate::cache::{Document, ElementCache, MemoStats, MemoStore, Memoized};
use crate::config::Config;
use crate::error::Result;
use crate::queue::{FlushReport, StorageQueue};
use crate::scheduler::{duration_ms, Scheduler, TimerHandle};
use crate::storage::KeyValueStore;
use crate::tasks::{cleanup_memo, spawn_cleanup_task};
use crate::timing::{Debounced, Throttled};

struct Inner<D: Document> {
    config: Config,
    scheduler: Arc<dyn Scheduler>,
    store: Arc<dyn KeyValueStore>,
    elements: ElementCache<D>,
    queue: Arc<StorageQueue>,
    memo: Arc<Mutex<MemoStore>>,
    /// Auto cleanup timers started through this context
    cleanup_timers: Mutex<Vec<TimerHandle>>,
}

// == Cache Context ==
/// Session-wide caches. Created empty; cleared only by explicit calls.
pub struct CacheContext<D: Document> {
    inner: Arc<Inner<D>>,
}

impl<D: Document> Clone for CacheContext<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D: Document> CacheContext<D> {
    // == Constructor ==
    /// Creates a context resolving elements from `document` and draining
    /// queued writes into `store`.
    pub fn new(
        config: Config,
        document: D,
        store: Arc<dyn KeyValueStore>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let queue = StorageQueue::new(store.clone(), scheduler.clone(), config.flush_delay());
        Self {
            inner: Arc::new(Inner {
                config,
                scheduler,
                store,
                elements: ElementCache::new(document),
                queue,
                memo: Arc::new(Mutex::new(MemoStore::new())),
                cleanup_timers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.inner.scheduler
    }

    /// The backing store, for reads and for direct writes.
    ///
    /// Direct writes to a key that also has queued writes are overwritten by
    /// the next flush.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.store
    }

    pub fn document(&self) -> &D {
        self.inner.elements.document()
    }

    // == Element Cache ==
    /// Returns the handle for `id`, resolving it from the document on first use.
    pub fn get_cached_element(&self, id: &str) -> Option<D::Handle> {
        self.inner.elements.get(id)
    }

    /// Resolves several ids at once. Missing ids map to `None`.
    pub fn get_cached_elements<I, S>(&self, ids: I) -> IndexMap<String, Option<D::Handle>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.inner.elements.get_many(ids)
    }

    pub fn clear_dom_cache(&self) {
        self.inner.elements.clear();
    }

    pub fn dom_cache_len(&self) -> usize {
        self.inner.elements.len()
    }

    // == Write Queue ==
    /// Queues `value` for `key`; a flush follows after the configured delay.
    pub fn queue_storage_write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.inner.queue.enqueue(key, value)
    }

    /// Writes the last queued value of every key and empties the queue.
    pub fn flush_storage_queue(&self) -> FlushReport {
        self.inner.queue.flush()
    }

    /// Same as `flush_storage_queue`, for teardown paths.
    pub fn force_flush_storage_queue(&self) -> FlushReport {
        self.flush_storage_queue()
    }

    /// Queued writes, duplicates included.
    pub fn storage_queue_len(&self) -> usize {
        self.inner.queue.len()
    }

    pub fn has_pending_flush(&self) -> bool {
        self.inner.queue.has_pending_flush()
    }

    // == Memoization ==
    /// Memoizes `func`; results stay valid for `ttl`.
    pub fn memoize_with_ttl<A, R, F>(&self, func: F, ttl: Duration) -> Memoized<A, R, F>
    where
        A: Serialize,
        R: Clone + Send + Sync + 'static,
        F: Fn(A) -> R,
    {
        Memoized::new(
            func,
            duration_ms(ttl),
            self.inner.memo.clone(),
            self.inner.scheduler.clone(),
        )
    }

    /// Memoizes `func` with the configured default TTL.
    pub fn memoize<A, R, F>(&self, func: F) -> Memoized<A, R, F>
    where
        A: Serialize,
        R: Clone + Send + Sync + 'static,
        F: Fn(A) -> R,
    {
        self.memoize_with_ttl(func, Duration::from_millis(self.inner.config.memo_ttl_ms))
    }

    pub fn clear_memo_cache(&self) {
        self.inner.memo.lock().clear();
    }

    /// Size, validity split and hit counters of the memo cache.
    pub fn memo_cache_stats(&self) -> MemoStats {
        self.inner.memo.lock().stats(self.inner.scheduler.now_ms())
    }

    /// Removes memo entries older than `max_age`. Returns how many were removed.
    pub fn cleanup_caches(&self, max_age: Duration) -> usize {
        cleanup_memo(
            &self.inner.memo,
            self.inner.scheduler.now_ms(),
            duration_ms(max_age),
        )
    }

    // == Auto Cleanup ==
    /// Runs `cleanup_caches` with the configured max age every `interval`.
    pub fn start_auto_cleanup(&self, interval: Duration) -> TimerHandle {
        let handle = spawn_cleanup_task(
            &self.inner.scheduler,
            &self.inner.memo,
            interval,
            self.inner.config.cleanup_max_age_ms,
        );
        self.inner.cleanup_timers.lock().push(handle);
        handle
    }

    /// `start_auto_cleanup` with the configured interval.
    pub fn start_default_auto_cleanup(&self) -> TimerHandle {
        self.start_auto_cleanup(self.inner.config.cleanup_interval())
    }

    pub fn stop_auto_cleanup(&self, handle: TimerHandle) {
        self.inner.cleanup_timers.lock().retain(|h| *h != handle);
        self.inner.scheduler.cancel(handle);
    }

    // == Timing Helpers ==
    /// Debounces `func` on this context's scheduler.
    pub fn debounce<A, F>(&self, func: F, wait: Duration) -> Debounced<A>
    where
        A: Send + 'static,
        F: Fn(A) + Send + Sync + 'static,
    {
        Debounced::new(func, wait, self.inner.scheduler.clone())
    }

    /// Debounces `func` with the configured wait.
    pub fn debounce_default<A, F>(&self, func: F) -> Debounced<A>
    where
        A: Send + 'static,
        F: Fn(A) + Send + Sync + 'static,
    {
        self.debounce(func, self.inner.config.debounce_wait())
    }

    /// Throttles `func` on this context's clock.
    pub fn throttle<A, F: Fn(A)>(&self, func: F, wait: Duration) -> Throttled<A, F> {
        Throttled::new(func, wait, self.inner.scheduler.clone())
    }

    // == Shutdown ==
    /// Stops every auto cleanup timer and drains the write queue.
    pub fn shutdown(&self) -> FlushReport {
        let timers: Vec<TimerHandle> = self.inner.cleanup_timers.lock().drain(..).collect();
        for handle in timers {
            self.inner.scheduler.cancel(handle);
        }

        let report = self.force_flush_storage_queue();
        info!(
            "Cache context shut down: {} writes flushed, {} failed",
            report.written,
            report.failed.len()
        );
        report
    }
}
