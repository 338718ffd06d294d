//! FileKeyValueStore - a single JSON document on disk holding every key.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{KeyValueStore, KvError};

/// Durable key-value store persisted as one JSON object file.
///
/// Every `set`/`remove` rewrites the whole document through a sibling temp
/// file followed by a rename, so readers only ever observe a complete file.
/// A missing file reads as an empty store.
pub struct FileKeyValueStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileKeyValueStore {
    /// Open (or lazily create) the store at `path`. Parent directories are
    /// created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<BTreeMap<String, String>, KvError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => serde_json::from_str(&text).map_err(|e| KvError::Corrupt(e.to_string())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_document(&self, document: &BTreeMap<String, String>) -> Result<(), KvError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let bytes = serde_json::to_vec_pretty(document).map_err(|e| KvError::Io(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let _guard = self.guard.lock().map_err(|_| KvError::LockPoisoned("get"))?;
        let mut document = self.read_document()?;
        Ok(document.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let _guard = self.guard.lock().map_err(|_| KvError::LockPoisoned("set"))?;
        let mut document = self.read_document()?;
        document.insert(key.to_string(), value.to_string());
        self.write_document(&document)
    }

    fn remove(&self, key: &str) -> Result<bool, KvError> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| KvError::LockPoisoned("remove"))?;
        let mut document = self.read_document()?;
        let existed = document.remove(key).is_some();
        if existed {
            self.write_document(&document)?;
        }
        Ok(existed)
    }
}
