//! In-memory key/value store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{validate_key, KeyValueStore, StorageError, StorageResult};

/// Shared map; clones see the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(
        &self,
        apply: impl FnOnce(&mut HashMap<String, String>) -> T,
    ) -> StorageResult<T> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|error| StorageError::Unavailable(error.to_string()))?;
        Ok(apply(&mut guard))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        validate_key(key)?;
        self.with_entries(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.with_entries(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.with_entries(|entries| {
            entries.remove(key);
        })
    }
}
