//! Client configuration.
//!
//! `AppwriteConfig` carries the public identifiers needed to reach the review
//! collection. These are safe-to-ship values; no secret belongs here.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::DEFAULT_APP_VERSION;
use crate::util::{is_http_url, normalize_text_option};

pub const ENV_ENDPOINT: &str = "AURI_APPWRITE_ENDPOINT";
pub const ENV_PROJECT_ID: &str = "AURI_APPWRITE_PROJECT_ID";
pub const ENV_DATABASE_ID: &str = "AURI_APPWRITE_DATABASE_ID";
pub const ENV_REVIEWS_COLLECTION_ID: &str = "AURI_APPWRITE_REVIEWS_COLLECTION_ID";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LIST_LIMIT: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppwriteConfig {
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    pub reviews_collection_id: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_list_limit")]
    pub list_limit: u32,
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_list_limit() -> u32 {
    DEFAULT_LIST_LIMIT
}

impl AppwriteConfig {
    pub fn new(
        endpoint: &str,
        project_id: &str,
        database_id: &str,
        reviews_collection_id: &str,
    ) -> Result<Self> {
        Ok(Self {
            endpoint: normalize_endpoint(endpoint)?,
            project_id: required("project id", project_id)?,
            database_id: required("database id", database_id)?,
            reviews_collection_id: required("reviews collection id", reviews_collection_id)?,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            list_limit: DEFAULT_LIST_LIMIT,
        })
    }

    /// Read the `AURI_APPWRITE_*` variables.
    ///
    /// Returns `Ok(None)` when none of them is set and an error when only some
    /// are.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_values(
            std::env::var(ENV_ENDPOINT).ok(),
            std::env::var(ENV_PROJECT_ID).ok(),
            std::env::var(ENV_DATABASE_ID).ok(),
            std::env::var(ENV_REVIEWS_COLLECTION_ID).ok(),
        )
    }

    pub fn from_values(
        endpoint: Option<String>,
        project_id: Option<String>,
        database_id: Option<String>,
        reviews_collection_id: Option<String>,
    ) -> Result<Option<Self>> {
        match (
            normalize_text_option(endpoint),
            normalize_text_option(project_id),
            normalize_text_option(database_id),
            normalize_text_option(reviews_collection_id),
        ) {
            (None, None, None, None) => Ok(None),
            (Some(endpoint), Some(project_id), Some(database_id), Some(collection_id)) => {
                Self::new(&endpoint, &project_id, &database_id, &collection_id).map(Some)
            }
            _ => Err(Error::Configuration(format!(
                "{ENV_ENDPOINT}, {ENV_PROJECT_ID}, {ENV_DATABASE_ID} and {ENV_REVIEWS_COLLECTION_ID} must be set together"
            ))),
        }
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Settings of the running client that are not about the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Tag stored on every submitted review
    pub app_version: String,
    /// Where the file-backed local store keeps its records
    pub storage_dir: PathBuf,
}

impl ClientConfig {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_version: DEFAULT_APP_VERSION.to_string(),
            storage_dir: storage_dir.into(),
        }
    }

    #[must_use]
    pub fn with_app_version(mut self, app_version: &str) -> Self {
        if let Some(version) = normalize_text_option(Some(app_version.to_string())) {
            self.app_version = version;
        }
        self
    }
}

/// Trim, require http(s), drop trailing slashes, and make sure the path ends
/// in `/v1`.
pub fn normalize_endpoint(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::Configuration(
            "Appwrite endpoint must not be empty".to_string(),
        ));
    }
    if !is_http_url(trimmed) {
        return Err(Error::Configuration(
            "Appwrite endpoint must include http:// or https://".to_string(),
        ));
    }
    if trimmed.ends_with("/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/v1"))
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    normalize_text_option(Some(value.to_string()))
        .ok_or_else(|| Error::Configuration(format!("Appwrite {field} must not be empty")))
}
