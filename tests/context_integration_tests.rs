//! Integration Tests for the Cache Context
//!
//! Drives the public API end to end on a virtual clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pilot_cache::cache::StaticDocument;
use pilot_cache::{
    CacheContext, CacheError, Config, KeyValueStore, ManualScheduler, MemoryStore, Result,
    TokioScheduler,
};

// == Helper Functions ==

#[derive(Debug)]
struct Element {
    id: String,
}

type Ctx = CacheContext<StaticDocument<Arc<Element>>>;

/// Store counting every operation it receives.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    ops: AtomicUsize,
}

impl CountingStore {
    fn ops(&self) -> usize {
        self.ops.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for CountingStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.ops.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.ops.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.ops.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key)
    }

    fn clear(&self) -> Result<()> {
        self.ops.fetch_add(1, Ordering::SeqCst);
        self.inner.clear()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

fn create_context() -> (Ctx, Arc<CountingStore>, Arc<ManualScheduler>) {
    let store = Arc::new(CountingStore::default());
    let scheduler = Arc::new(ManualScheduler::new());
    let ctx = CacheContext::new(
        Config::default(),
        StaticDocument::new(),
        store.clone(),
        scheduler.clone(),
    );
    (ctx, store, scheduler)
}

// == Write Queue ==

#[test]
fn test_force_flush_scenario() {
    let (ctx, store, _) = create_context();

    ctx.queue_storage_write("a", &1).unwrap();
    ctx.queue_storage_write("b", &2).unwrap();
    ctx.queue_storage_write("a", &3).unwrap();
    ctx.force_flush_storage_queue();

    assert_eq!(store.get("a").unwrap().as_deref(), Some("3"));
    assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    assert_eq!(ctx.storage_queue_len(), 0);
}

#[test]
fn test_same_key_in_window_persists_last_value_once() {
    let (ctx, store, scheduler) = create_context();

    for rate in [1.05, 1.07, 1.09] {
        ctx.queue_storage_write("eurUsdRate", &rate).unwrap();
        scheduler.advance(Duration::from_millis(20));
    }
    scheduler.advance(Duration::from_millis(100));

    assert_eq!(store.inner.write_count(), 1);
    assert_eq!(store.get("eurUsdRate").unwrap().as_deref(), Some("1.09"));
}

#[test]
fn test_flush_on_empty_queue_touches_nothing() {
    let (ctx, store, _) = create_context();

    let report = ctx.flush_storage_queue();

    assert!(report.is_noop());
    assert_eq!(store.ops(), 0);
}

#[test]
fn test_quota_failure_is_partial() {
    let store = Arc::new(MemoryStore::with_quota(24));
    let scheduler = Arc::new(ManualScheduler::new());
    let ctx: Ctx = CacheContext::new(
        Config::default(),
        StaticDocument::new(),
        store.clone(),
        scheduler,
    );

    ctx.queue_storage_write("small", &1).unwrap();
    ctx.queue_storage_write("large", &"x".repeat(64)).unwrap();
    ctx.queue_storage_write("other", &2).unwrap();
    let report = ctx.flush_storage_queue();

    assert_eq!(report.written, 2);
    assert_eq!(report.failed, vec!["large".to_string()]);
    assert!(store.get("other").unwrap().is_some());
    assert_eq!(ctx.storage_queue_len(), 0);
}

#[test]
fn test_unserializable_payload_is_rejected() {
    let (ctx, _, scheduler) = create_context();
    let mut bad = std::collections::HashMap::new();
    bad.insert((1, 2), "tuple keys are not JSON");

    let result = ctx.queue_storage_write("bad", &bad);

    assert!(matches!(result, Err(CacheError::Serialization(_))));
    assert_eq!(ctx.storage_queue_len(), 0);
    assert_eq!(scheduler.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_queue_auto_flushes_on_tokio_timers() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let flush_delay = config.flush_delay();
    let ctx: Ctx = CacheContext::new(
        config,
        StaticDocument::new(),
        store.clone(),
        Arc::new(TokioScheduler::new().unwrap()),
    );

    ctx.queue_storage_write("eurUsdRate", &1.07).unwrap();
    ctx.queue_storage_write("eurUsdRate", &1.09).unwrap();
    assert!(ctx.has_pending_flush());

    tokio::time::sleep(flush_delay / 2).await;
    assert!(store.get("eurUsdRate").unwrap().is_none());

    tokio::time::sleep(flush_delay).await;
    assert_eq!(store.get("eurUsdRate").unwrap().as_deref(), Some("1.09"));
    assert_eq!(store.write_count(), 1);
    assert_eq!(ctx.storage_queue_len(), 0);
    assert!(!ctx.has_pending_flush());
}

// == Element Cache ==

#[test]
fn test_element_resolved_once() {
    let (ctx, _, _) = create_context();
    ctx.document().insert(
        "total-value",
        Arc::new(Element {
            id: "total-value".to_string(),
        }),
    );

    let first = ctx.get_cached_element("total-value").unwrap();
    let second = ctx.get_cached_element("total-value").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.id, "total-value");
    assert_eq!(ctx.document().resolution_count(), 1);
}

#[test]
fn test_get_cached_elements_and_clear() {
    let (ctx, _, _) = create_context();
    for id in ["stocks-table", "crypto-table"] {
        ctx.document().insert(id, Arc::new(Element { id: id.to_string() }));
    }

    let handles = ctx.get_cached_elements(["stocks-table", "etf-table", "crypto-table"]);
    assert_eq!(handles.len(), 3);
    assert!(handles["etf-table"].is_none());
    assert_eq!(ctx.dom_cache_len(), 2);

    ctx.clear_dom_cache();
    assert_eq!(ctx.dom_cache_len(), 0);
    ctx.get_cached_element("stocks-table");
    assert_eq!(ctx.document().resolution_count(), 4);
}

// == Memoization ==

#[test]
fn test_memoized_sum_scenario() {
    let (ctx, _, _) = create_context();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let sum = ctx.memoize_with_ttl(
        move |(a, b): (i32, i32)| {
            counter.fetch_add(1, Ordering::SeqCst);
            a + b
        },
        Duration::from_millis(1_000),
    );

    assert_eq!(sum.call((2, 3)).unwrap(), 5);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(sum.call((2, 3)).unwrap(), 5);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_memoized_recomputes_after_ttl() {
    let (ctx, _, scheduler) = create_context();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let price = ctx.memoize_with_ttl(
        move |symbol: String| {
            counter.fetch_add(1, Ordering::SeqCst);
            symbol.len() as f64 * 10.0
        },
        Duration::from_millis(1_000),
    );

    price.call("AAPL".to_string()).unwrap();
    scheduler.advance(Duration::from_millis(500));
    price.call("AAPL".to_string()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    scheduler.advance(Duration::from_millis(500));
    price.call("AAPL".to_string()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_memo_stats_and_clear() {
    let (ctx, _, scheduler) = create_context();
    let short = ctx.memoize_with_ttl(|x: u32| x, Duration::from_millis(100));
    let long = ctx.memoize(|x: u32| x * 2);

    short.call(1).unwrap();
    long.call(1).unwrap();
    long.call(1).unwrap();
    scheduler.advance(Duration::from_millis(200));

    let stats = ctx.memo_cache_stats();
    assert_eq!(stats.size, 2);
    assert_eq!(stats.valid, 1);
    assert_eq!(stats.expired, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);

    ctx.clear_memo_cache();
    assert_eq!(ctx.memo_cache_stats().size, 0);
}

#[test]
fn test_cleanup_caches_by_age() {
    let (ctx, _, scheduler) = create_context();
    let memo = ctx.memoize(|x: u32| x);

    memo.call(1).unwrap();
    scheduler.advance(Duration::from_millis(1_000));
    memo.call(2).unwrap();
    scheduler.advance(Duration::from_millis(500));

    // Ages are now 1500 and 500
    let removed = ctx.cleanup_caches(Duration::from_millis(1_000));

    assert_eq!(removed, 1);
    assert_eq!(ctx.memo_cache_stats().size, 1);
}

#[test]
fn test_auto_cleanup_uses_configured_max_age() {
    let (ctx, _, scheduler) = create_context();
    let memo = ctx.memoize_with_ttl(|x: u32| x, Duration::from_millis(10));
    memo.call(7).unwrap();

    let handle = ctx.start_auto_cleanup(Duration::from_secs(300));

    // Default max age is one hour: 12 ticks later the entry is 3600s old, kept
    scheduler.advance(Duration::from_secs(3_600));
    assert_eq!(ctx.memo_cache_stats().size, 1);

    scheduler.advance(Duration::from_secs(300));
    assert_eq!(ctx.memo_cache_stats().size, 0);

    ctx.stop_auto_cleanup(handle);
    assert_eq!(scheduler.pending(), 0);
}
