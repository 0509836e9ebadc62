//! Key-value backends for session persistence.

use crate::errors::StorageError;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A namespaced string key-value store.
///
/// Stands in for the device's encrypted preferences. Writes of several keys
/// through `set_many` or `remove_many` must be applied as one unit.
pub trait KeyValueStore: Send + Sync {
    /// Reads a value.
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes several values at once.
    fn set_many(&self, namespace: &str, entries: &[(&str, String)]) -> Result<(), StorageError>;

    /// Removes several keys at once. Missing keys are ignored.
    fn remove_many(&self, namespace: &str, keys: &[&str]) -> Result<(), StorageError>;
}

/// A process-local store, lost on exit.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    namespaces: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl InMemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys stored under a namespace.
    #[must_use]
    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces.read().get(namespace).map_or(0, HashMap::len)
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .namespaces
            .read()
            .get(namespace)
            .and_then(|ns| ns.get(key).cloned()))
    }

    fn set_many(&self, namespace: &str, entries: &[(&str, String)]) -> Result<(), StorageError> {
        let mut namespaces = self.namespaces.write();
        let ns = namespaces.entry(namespace.to_string()).or_default();
        for (key, value) in entries {
            ns.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn remove_many(&self, namespace: &str, keys: &[&str]) -> Result<(), StorageError> {
        if let Some(ns) = self.namespaces.write().get_mut(namespace) {
            for key in keys {
                ns.remove(*key);
            }
        }
        Ok(())
    }
}

type Namespaces = BTreeMap<String, BTreeMap<String, String>>;

/// A store persisted as a single JSON document.
///
/// The whole document is rewritten on every change through a temporary file
/// and a rename, so a crash leaves either the old or the new contents.
#[derive(Debug)]
pub struct JsonFileKeyValueStore {
    path: PathBuf,
    data: Mutex<Namespaces>,
}

impl JsonFileKeyValueStore {
    /// Opens the store, creating an empty one if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let data = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => Namespaces::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Corrupt(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Namespaces::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, data: &Namespaces) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(data)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileKeyValueStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .data
            .lock()
            .get(namespace)
            .and_then(|ns| ns.get(key).cloned()))
    }

    fn set_many(&self, namespace: &str, entries: &[(&str, String)]) -> Result<(), StorageError> {
        let mut data = self.data.lock();
        let mut next = data.clone();
        let ns = next.entry(namespace.to_string()).or_default();
        for (key, value) in entries {
            ns.insert((*key).to_string(), value.clone());
        }
        self.flush(&next)?;
        *data = next;
        Ok(())
    }

    fn remove_many(&self, namespace: &str, keys: &[&str]) -> Result<(), StorageError> {
        let mut data = self.data.lock();
        let Some(existing) = data.get(namespace) else {
            return Ok(());
        };
        if !keys.iter().any(|k| existing.contains_key(*k)) {
            return Ok(());
        }

        let mut next = data.clone();
        if let Some(ns) = next.get_mut(namespace) {
            for key in keys {
                ns.remove(*key);
            }
        }
        self.flush(&next)?;
        *data = next;
        Ok(())
    }
}
