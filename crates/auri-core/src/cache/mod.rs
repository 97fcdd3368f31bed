//! Persisted copy of the review feed.
//!
//! The cache is replaced wholesale on every write; entries are never merged.
//! Like the session store it never fails the caller.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ReviewEntry;
use crate::storage::KeyValueStore;

pub const REVIEWS_CACHE_KEY: &str = "auri_reviews_cache";
pub const LAST_SYNC_KEY: &str = "auri_last_sync";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheRecord {
    reviews: Vec<ReviewEntry>,
    #[serde(default)]
    last_sync_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ReviewCache<K: KeyValueStore> {
    store: K,
}

impl<K: KeyValueStore> ReviewCache<K> {
    pub const fn new(store: K) -> Self {
        Self { store }
    }

    /// Replace the cache with freshly synced data and stamp `lastSyncAt`.
    pub fn save(&self, reviews: &[ReviewEntry]) {
        let now = Utc::now();
        if self.write_record(reviews, Some(now)) {
            if let Err(error) = self
                .store
                .set(LAST_SYNC_KEY, &now.timestamp_millis().to_string())
            {
                tracing::warn!("Failed to save last sync time: {}", error);
            }
        }
    }

    /// Replace the cached collection without claiming a sync happened.
    pub fn store_local(&self, reviews: &[ReviewEntry]) {
        let last_sync_at = self.read_record().and_then(|record| record.last_sync_at);
        self.write_record(reviews, last_sync_at);
    }

    /// Cached feed, or empty when absent or unreadable.
    pub fn load(&self) -> Vec<ReviewEntry> {
        self.read_record()
            .map(|record| record.reviews)
            .unwrap_or_default()
    }

    /// Time of the last successful sync, from the standalone record.
    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        let raw = match self.store.get(LAST_SYNC_KEY) {
            Ok(raw) => raw?,
            Err(error) => {
                tracing::warn!("Failed to read last sync time: {}", error);
                return None;
            }
        };
        let millis = raw.trim().parse::<i64>().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }

    fn write_record(&self, reviews: &[ReviewEntry], last_sync_at: Option<DateTime<Utc>>) -> bool {
        let record = CacheRecord {
            reviews: reviews.to_vec(),
            last_sync_at,
        };
        let serialized = match serde_json::to_string(&record) {
            Ok(serialized) => serialized,
            Err(error) => {
                tracing::warn!("Failed to serialize reviews cache: {}", error);
                return false;
            }
        };

        match self.store.set(REVIEWS_CACHE_KEY, &serialized) {
            Ok(()) => {
                tracing::debug!("Cached {} reviews", reviews.len());
                true
            }
            Err(error) => {
                tracing::warn!("Failed to save reviews cache: {}", error);
                false
            }
        }
    }

    fn read_record(&self) -> Option<CacheRecord> {
        let raw = match self.store.get(REVIEWS_CACHE_KEY) {
            Ok(raw) => raw?,
            Err(error) => {
                tracing::warn!("Failed to read reviews cache: {}", error);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!("Discarding malformed reviews cache: {}", error);
                None
            }
        }
    }
}
