//! TTL Memoizer
//!
//! Wraps a function so repeated calls with equal arguments reuse the result
//! until the TTL elapses.
//!
//! # Argument canonicalization
//! Arguments must implement `Serialize`. They are converted to a
//! `serde_json::Value` first (object keys end up sorted) and then rendered as
//! compact JSON, so equal values always produce the same key. Values that JSON
//! cannot represent, such as maps with non-string keys, are rejected with
//! `CacheError::Serialization`.

use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::trace;

use crate::cache::{MemoEntry, MemoKey, MemoStore};
use crate::error::Result;
use crate::scheduler::Scheduler;

/// Renders `args` as a stable cache key.
pub fn canonical_key<A: Serialize + ?Sized>(args: &A) -> Result<String> {
    let value = serde_json::to_value(args)?;
    Ok(serde_json::to_string(&value)?)
}

// == Memoized ==
/// A memoized function. Arguments are passed as one value, usually a tuple.
pub struct Memoized<A, R, F> {
    func: F,
    ttl_ms: u64,
    namespace: u64,
    store: Arc<Mutex<MemoStore>>,
    clock: Arc<dyn Scheduler>,
    _marker: PhantomData<fn(A) -> R>,
}

impl<A, R, F> Memoized<A, R, F>
where
    A: Serialize,
    R: Clone + Send + Sync + 'static,
    F: Fn(A) -> R,
{
    pub(crate) fn new(
        func: F,
        ttl_ms: u64,
        store: Arc<Mutex<MemoStore>>,
        clock: Arc<dyn Scheduler>,
    ) -> Self {
        let namespace = store.lock().register();
        Self {
            func,
            ttl_ms,
            namespace,
            store,
            clock,
            _marker: PhantomData,
        }
    }

    // == Call ==
    /// Returns the cached result for `args`, computing it on a miss.
    ///
    /// The store is not locked while the wrapped function runs, so it may
    /// itself call memoized functions.
    pub fn call(&self, args: A) -> Result<R> {
        let key = MemoKey::new(self.namespace, canonical_key(&args)?);
        let now = self.clock.now_ms();

        let cached = self.store.lock().lookup(&key, now);
        if let Some(value) = cached.and_then(|v| v.downcast_ref::<R>().cloned()) {
            trace!("Memo hit for {}", key.args);
            return Ok(value);
        }

        let result = (self.func)(args);
        let entry = MemoEntry::new(Arc::new(result.clone()), now, self.ttl_ms);
        self.store.lock().insert(key, entry);
        Ok(result)
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }
}
