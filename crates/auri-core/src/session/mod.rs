//! Persisted login session.
//!
//! Every operation is infallible from the caller's point of view: storage
//! faults and corrupt records are logged and treated as "not logged in".

use crate::models::{Identity, Session};
use crate::storage::KeyValueStore;

pub const SESSION_KEY: &str = "auri_session";

#[derive(Debug, Clone)]
pub struct SessionStore<K: KeyValueStore> {
    store: K,
}

impl<K: KeyValueStore> SessionStore<K> {
    pub const fn new(store: K) -> Self {
        Self { store }
    }

    /// Persist `identity`, stamped with the current time.
    pub fn save(&self, identity: &Identity) -> Option<Session> {
        let session = Session::new(identity.clone());
        let serialized = match serde_json::to_string(&session) {
            Ok(serialized) => serialized,
            Err(error) => {
                tracing::warn!("Failed to serialize session: {}", error);
                return None;
            }
        };

        if let Err(error) = self.store.set(SESSION_KEY, &serialized) {
            tracing::warn!("Failed to save session: {}", error);
            return None;
        }
        Some(session)
    }

    /// Load the persisted session without checking it against the server.
    pub fn load(&self) -> Option<Session> {
        let raw = match self.store.get(SESSION_KEY) {
            Ok(raw) => raw?,
            Err(error) => {
                tracing::warn!("Failed to read stored session: {}", error);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(error) => {
                tracing::warn!("Ignoring malformed stored session: {}", error);
                None
            }
        }
    }

    pub fn clear(&self) {
        if let Err(error) = self.store.remove(SESSION_KEY) {
            tracing::warn!("Failed to clear stored session: {}", error);
        }
    }
}
