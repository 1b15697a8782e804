//! Key-value storage adapters.
//!
//! `MemoryKeyValueStore` models tab-scoped session storage; `JsonFileStore`
//! models origin-scoped durable local storage. Both are confined to a single
//! process; the durable store is read-modify-written per operation, which is
//! acceptable under single-process access (cross-process races are an
//! accepted, documented gap).

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::application::ports::{KeyValueStore, StoreError};
use crate::util::lock::mutex_lock;

const SOURCE: &str = "infra::store";

/// In-memory store; contents live exactly as long as the instance.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(mutex_lock(&self.entries, SOURCE, "get").get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        mutex_lock(&self.entries, SOURCE, "set").insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        mutex_lock(&self.entries, SOURCE, "remove").remove(key);
        Ok(())
    }
}

/// Durable store persisting one JSON object per file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<HashMap<String, String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(StoreError::io),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(error) => Err(StoreError::io(error)),
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        let raw = serde_json::to_string(entries).map_err(StoreError::io)?;
        std::fs::write(&self.path, raw).map_err(StoreError::io)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryKeyValueStore::new();
        assert_eq!(store.get("k").expect("get"), None);
        store.set("k", "v").expect("set");
        assert_eq!(store.get("k").expect("get").as_deref(), Some("v"));
        store.remove("k").expect("remove");
        assert_eq!(store.get("k").expect("get"), None);
    }

    #[test]
    fn file_store_survives_reopening() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");

        let store = JsonFileStore::new(&path);
        store.set("sessionId", "abc").expect("set");
        drop(store);

        let reopened = JsonFileStore::new(&path);
        assert_eq!(
            reopened.get("sessionId").expect("get").as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn file_store_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert_eq!(store.get("k").expect("get"), None);
        store.remove("k").expect("remove is a no-op");
    }
}
