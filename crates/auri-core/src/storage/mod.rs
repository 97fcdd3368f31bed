//! Local persisted key/value storage.
//!
//! The session store and review cache only see the [`KeyValueStore`]
//! contract. Two backends ship with the crate: a directory of JSON files for
//! real clients and an in-memory map for tests and throwaway sessions.

mod file;
mod memory;

use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Failures of the local storage backend.
///
/// These are always absorbed by the callers in this crate and only logged.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Local storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// String values addressed by key, persisted across restarts.
pub trait KeyValueStore: Clone + Send + Sync + 'static {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::Unavailable(format!(
            "invalid storage key '{key}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_key_rejects_path_like_keys() {
        assert!(validate_key("auri_session").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("a/b").is_err());
    }
}
