//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use auri_core::config::{
    ENV_DATABASE_ID, ENV_ENDPOINT, ENV_PROJECT_ID, ENV_REVIEWS_COLLECTION_ID,
};
use auri_core::util::normalize_text_option;
use auri_core::AppwriteConfig;
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "cli-config.json";
pub const PROFILE_ENV: &str = "AURI_PROFILE";
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub appwrite_endpoint: Option<String>,
    #[serde(default)]
    pub appwrite_project_id: Option<String>,
    #[serde(default)]
    pub appwrite_database_id: Option<String>,
    #[serde(default)]
    pub appwrite_reviews_collection_id: Option<String>,
    #[serde(default)]
    pub app_version: Option<String>,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
        .map(|dir| dir.join("auri").join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    normalize_text_option(value.map(ToString::to_string))
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Explicit flag, then `AURI_PROFILE`, then the active profile.
    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        if let Some(profile) = normalize_profile_name(explicit) {
            return profile;
        }
        if let Some(profile) = normalize_profile_name(std::env::var(PROFILE_ENV).ok().as_deref()) {
            return profile;
        }
        if let Some(profile) = normalize_profile_name(self.active_profile.as_deref()) {
            return profile;
        }
        DEFAULT_PROFILE.to_string()
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    /// Backend settings from this profile, each field overridable by its
    /// `AURI_APPWRITE_*` variable.
    pub fn appwrite_config(&self) -> auri_core::Result<Option<AppwriteConfig>> {
        AppwriteConfig::from_values(
            env_or(ENV_ENDPOINT, self.appwrite_endpoint.clone()),
            env_or(ENV_PROJECT_ID, self.appwrite_project_id.clone()),
            env_or(ENV_DATABASE_ID, self.appwrite_database_id.clone()),
            env_or(
                ENV_REVIEWS_COLLECTION_ID,
                self.appwrite_reviews_collection_id.clone(),
            ),
        )
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("endpoint", &self.appwrite_endpoint),
            ("project_id", &self.appwrite_project_id),
            ("database_id", &self.appwrite_database_id),
            ("reviews_collection_id", &self.appwrite_reviews_collection_id),
        ]
        .into_iter()
        .filter(|(_, value)| normalize_text_option((*value).clone()).is_none())
        .map(|(name, _)| name)
        .collect()
    }

    fn normalize(&mut self) {
        self.appwrite_endpoint = normalize_text_option(self.appwrite_endpoint.clone());
        self.appwrite_project_id = normalize_text_option(self.appwrite_project_id.clone());
        self.appwrite_database_id = normalize_text_option(self.appwrite_database_id.clone());
        self.appwrite_reviews_collection_id =
            normalize_text_option(self.appwrite_reviews_collection_id.clone());
        self.app_version = normalize_text_option(self.app_version.clone());
    }
}

fn env_or(key: &str, fallback: Option<String>) -> Option<String> {
    normalize_text_option(std::env::var(key).ok()).or(fallback)
}
