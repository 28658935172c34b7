//! File Store
//!
//! Persists the whole key space as one JSON object. The file is read once at
//! open and rewritten after every mutation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::KeyValueStore;
use crate::error::{CacheError, Result};

// == File Store ==
/// JSON-file backed store with an optional byte quota on the serialized file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl FileStore {
    // == Open ==
    /// Opens (or lazily creates) the store at `path`.
    ///
    /// A missing file starts an empty store. A file that is not a JSON object
    /// of strings is reported as `CacheError::Storage`.
    pub fn open<P: AsRef<Path>>(path: P, quota: Option<usize>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                CacheError::Storage(format!("Unreadable store {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No store at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        info!("Opened store {} with {} keys", path.display(), entries.len());
        Ok(Self {
            path,
            entries: RwLock::new(entries),
            quota,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renders `next`, checks it against the quota, writes it to disk and only
    /// then installs it as the live map. On any error the live map is untouched.
    fn commit(
        &self,
        entries: &mut BTreeMap<String, String>,
        next: BTreeMap<String, String>,
        key: &str,
    ) -> Result<()> {
        let raw = serde_json::to_string_pretty(&next)?;
        if let Some(quota) = self.quota {
            if raw.len() > quota {
                warn!("Store {} over quota writing {}", self.path.display(), key);
                return Err(CacheError::QuotaExceeded {
                    key: key.to_string(),
                    needed: raw.len(),
                    available: quota,
                });
            }
        }

        self.persist(&raw)?;
        *entries = next;
        Ok(())
    }

    /// Writes `raw` to a sibling temp file, then renames it over the store.
    fn persist(&self, raw: &str) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write();
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.commit(&mut entries, next, key)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.commit(&mut entries, next, key)
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write();
        self.commit(&mut entries, BTreeMap::new(), "*")
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}
