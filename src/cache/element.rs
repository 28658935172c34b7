//! Element Handle Cache
//!
//! Remembers handles resolved from a document so each identifier is looked up
//! at most once. Handles never expire; only `clear` drops them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::trace;

// == Document Trait ==
/// Anything able to resolve an element handle from an identifier.
pub trait Document: Send + Sync {
    type Handle: Clone + Send + Sync;

    /// Returns the element for `id`, or `None` when it does not exist.
    fn resolve(&self, id: &str) -> Option<Self::Handle>;
}

// == Static Document ==
/// Registry of elements that can appear and disappear at runtime.
///
/// Counts resolutions, which makes cache behaviour observable.
#[derive(Debug)]
pub struct StaticDocument<H> {
    elements: RwLock<HashMap<String, H>>,
    resolutions: AtomicUsize,
}

impl<H> Default for StaticDocument<H> {
    fn default() -> Self {
        Self {
            elements: RwLock::new(HashMap::new()),
            resolutions: AtomicUsize::new(0),
        }
    }
}

impl<H: Clone + Send + Sync> StaticDocument<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: impl Into<String>, handle: H) {
        self.elements.write().insert(id.into(), handle);
    }

    pub fn remove(&self, id: &str) -> Option<H> {
        self.elements.write().remove(id)
    }

    /// Number of `resolve` calls served so far, hits and misses alike.
    pub fn resolution_count(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }
}

impl<H: Clone + Send + Sync> Document for StaticDocument<H> {
    type Handle = H;

    fn resolve(&self, id: &str) -> Option<H> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        self.elements.read().get(id).cloned()
    }
}

// == Element Cache ==
/// Caches successful resolutions against a document. Misses are not cached.
pub struct ElementCache<D: Document> {
    document: D,
    handles: RwLock<HashMap<String, D::Handle>>,
}

impl<D: Document> ElementCache<D> {
    pub fn new(document: D) -> Self {
        Self {
            document,
            handles: RwLock::new(HashMap::new()),
        }
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    // == Get ==
    /// Returns the handle for `id`, resolving it on first use.
    pub fn get(&self, id: &str) -> Option<D::Handle> {
        if let Some(handle) = self.handles.read().get(id) {
            return Some(handle.clone());
        }

        let handle = self.document.resolve(id)?;
        trace!("Caching element handle {}", id);
        let mut handles = self.handles.write();
        Some(handles.entry(id.to_string()).or_insert(handle).clone())
    }

    // == Get Many ==
    /// Resolves every id, keeping the requested order. Missing ids map to `None`.
    pub fn get_many<I, S>(&self, ids: I) -> IndexMap<String, Option<D::Handle>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ids.into_iter()
            .map(|id| {
                let id = id.as_ref();
                (id.to_string(), self.get(id))
            })
            .collect()
    }

    // == Clear ==
    pub fn clear(&self) {
        self.handles.write().clear();
    }

    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.read().is_empty()
    }
}
