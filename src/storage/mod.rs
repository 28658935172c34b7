//! Storage Module
//!
//! The persistent key/value store the write queue drains into.
//!
//! # Implementations
//! - `MemoryStore`: in-memory map with an optional byte quota
//! - `FileStore`: JSON object file rewritten on every mutation

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::Result;

// == Key/Value Store Trait ==
/// String-keyed, string-valued persistent store.
///
/// Writes may fail on capacity or availability problems; reads of absent keys
/// return `Ok(None)`.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;

    /// Number of stored keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == Typed JSON Helpers ==
/// JSON helpers available on every store.
pub trait StorageExt: KeyValueStore {
    /// Loads and deserializes `key`.
    ///
    /// Absent keys, unreadable stores and corrupted JSON all yield `None`;
    /// the latter two are logged.
    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                error!("Error loading {} from storage: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding corrupted data under {}: {}", key, e);
                None
            }
        }
    }

    /// Serializes `value` and writes it directly, bypassing any write queue.
    fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw).map_err(|e| {
            error!("Error saving {} to storage: {}", key, e);
            e
        })
    }
}

impl<S: KeyValueStore + ?Sized> StorageExt for S {}
