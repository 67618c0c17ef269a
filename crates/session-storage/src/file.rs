//! JSON-file storage backend.

use crate::{SecureStorage, StorageResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Storage persisted as a single JSON object on disk.
///
/// The whole map is rewritten on every mutation; concurrent writers from
/// other processes are last-writer-wins.
pub struct FileStorage {
    path: PathBuf,
    data: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let data = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), entries = data.len(), "Opened file storage");

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, data: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(data)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SecureStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut data = self.data.lock();
        let mut next = data.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *data = next;
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut data = self.data.lock();
        if !data.contains_key(key) {
            return Ok(false);
        }
        let mut next = data.clone();
        next.remove(key);
        self.flush(&next)?;
        *data = next;
        Ok(true)
    }

    fn list_keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .data
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
