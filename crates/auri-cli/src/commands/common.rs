use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use auri_core::models::DEFAULT_APP_VERSION;
use auri_core::{
    AppwriteClient, ConnectivityMonitor, FileStore, KeyValueStore, ReviewEntry, ReviewId,
    ReviewService,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::cookie_vault::CookieVault;
use crate::error::CliError;

/// Key under which older builds kept the session cookies in the profile store.
const LEGACY_COOKIE_KEY: &str = "auri_cli_cookies";
const STORAGE_DIR_ENV: &str = "AURI_STORAGE_DIR";

pub type CliService = ReviewService<AppwriteClient, AppwriteClient, FileStore>;

/// Options shared by every command that talks to the review service.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub profile: Option<String>,
    pub storage_dir: Option<PathBuf>,
    pub offline: bool,
}

pub struct CliContext {
    pub profile_name: String,
    pub service: CliService,
    client: AppwriteClient,
    vault: CookieVault,
}

impl CliContext {
    pub async fn open(options: &GlobalOptions) -> Result<Self, CliError> {
        let config = CliProfilesConfig::load().map_err(CliError::Config)?;
        let profile_name = config.resolve_profile_name(options.profile.as_deref());
        let profile = config.profile(&profile_name).cloned().unwrap_or_default();
        let appwrite = profile
            .appwrite_config()?
            .ok_or(CliError::NotConfigured)?;

        let client = AppwriteClient::new(appwrite)?;
        let store = FileStore::new(resolve_storage_dir(
            options.storage_dir.clone(),
            &profile_name,
        )?);
        let vault = CookieVault::new(&profile_name);
        if let Some(cookies) = load_cookies(&vault, &store) {
            client.restore_session_cookies(&cookies);
        }

        let connectivity = ConnectivityMonitor::new(false);
        if options.offline {
            tracing::debug!("Offline mode requested; skipping reachability probe");
        } else {
            connectivity.refresh_from(&client).await;
        }

        let service = ReviewService::new(client.clone(), client.clone(), store, connectivity)
            .with_app_version(&app_version(&profile));

        Ok(Self {
            profile_name,
            service,
            client,
            vault,
        })
    }

    /// Remember the remote session for the next invocation.
    pub fn persist_cookies(&self) {
        let Some(cookies) = self.client.session_cookies() else {
            return;
        };
        if let Err(error) = self.vault.save(&cookies) {
            tracing::warn!("Failed to store session cookies: {}", error);
        }
    }

    pub fn clear_cookies(&self) {
        if let Err(error) = self.vault.clear() {
            tracing::warn!("Failed to clear session cookies: {}", error);
        }
    }
}

/// Cookies from the keychain. A plaintext copy left by older builds is moved
/// into the keychain and deleted from disk.
pub fn load_cookies(vault: &CookieVault, store: &impl KeyValueStore) -> Option<String> {
    let stored = match vault.load() {
        Ok(stored) => stored,
        Err(error) => {
            tracing::warn!("Failed to read stored cookies: {}", error);
            None
        }
    };

    let legacy = match store.get(LEGACY_COOKIE_KEY) {
        Ok(legacy) => legacy,
        Err(error) => {
            tracing::warn!("Failed to read legacy cookie file: {}", error);
            None
        }
    };
    let Some(legacy) = legacy else {
        return stored;
    };

    if let Err(error) = store.remove(LEGACY_COOKIE_KEY) {
        tracing::warn!("Failed to remove legacy cookie file: {}", error);
    }
    if stored.is_some() {
        return stored;
    }
    if let Err(error) = vault.save(&legacy) {
        tracing::warn!("Failed to move cookies into the keychain: {}", error);
    }
    Some(legacy)
}

fn app_version(profile: &CliProfile) -> String {
    profile
        .app_version
        .clone()
        .unwrap_or_else(|| DEFAULT_APP_VERSION.to_string())
}

pub fn resolve_storage_dir(
    explicit: Option<PathBuf>,
    profile_name: &str,
) -> Result<PathBuf, CliError> {
    if let Some(dir) = explicit.or_else(|| env::var_os(STORAGE_DIR_ENV).map(PathBuf::from)) {
        return Ok(dir);
    }
    default_storage_dir(profile_name)
}

pub fn default_storage_dir(profile_name: &str) -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("auri").join(profile_name))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

#[derive(Debug, Serialize)]
pub struct ReviewListItem {
    pub id: String,
    pub username: String,
    pub rating: u8,
    pub message: String,
    pub owner_id: String,
    pub verified: bool,
    pub created_at: String,
    pub relative_time: String,
    pub pending_sync: bool,
}

pub fn review_to_list_item(entry: &ReviewEntry, now: DateTime<Utc>) -> ReviewListItem {
    let review = entry.review();
    ReviewListItem {
        id: review.id.to_string(),
        username: review.username.clone(),
        rating: review.rating.get(),
        message: review.message.clone(),
        owner_id: review.owner_id.clone(),
        verified: review.verified,
        created_at: review.created_at.to_rfc3339(),
        relative_time: format_relative_time(review.created_at, now),
        pending_sync: entry.is_pending(),
    }
}

pub fn format_review_lines(entries: &[ReviewEntry], now: DateTime<Utc>) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let review = entry.review();
            let short_id = short_id(review.id.as_str());
            let stars = render_stars(review.rating.get());
            let author = message_preview(&review.username, 16);
            let preview = message_preview(&review.message, 40);
            let relative_time = format_relative_time(review.created_at, now);

            if entry.is_pending() {
                format!("{short_id:<13}  {stars}  {author:<16}  {preview:<40}  {relative_time:<10}  (pending)")
            } else {
                format!("{short_id:<13}  {stars}  {author:<16}  {preview:<40}  {relative_time}")
            }
        })
        .collect()
}

fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

pub fn render_stars(rating: u8) -> String {
    let filled = usize::from(rating.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

pub fn message_preview(message: &str, max_chars: usize) -> String {
    let first_line = message.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_sync_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp.map_or_else(
        || "never".to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now
        .signed_duration_since(timestamp)
        .num_milliseconds()
        .max(0);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Message from the arguments, falling back to piped stdin.
pub fn resolve_message(message_parts: &[String]) -> Result<String, CliError> {
    if let Some(message) = normalize_message(&message_parts.join(" ")) {
        return Ok(message);
    }

    if let Some(message) = read_piped_stdin()? {
        return Ok(message);
    }

    Err(CliError::EmptyMessage)
}

pub fn normalize_message(message: &str) -> Option<String> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_message(&buffer))
}

pub fn normalize_review_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyReviewId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Match `query` against the local feed: an exact id wins, then a unique
/// prefix.
///
/// Unknown ids pass through unchanged so the server can answer for them.
pub fn resolve_review<'a>(
    query: &str,
    entries: &'a [ReviewEntry],
) -> Result<(ReviewId, Option<&'a ReviewEntry>), CliError> {
    let query = normalize_review_identifier(query)?;
    if let Some(entry) = entries.iter().find(|entry| entry.id().as_str() == query) {
        return Ok((entry.id().clone(), Some(entry)));
    }

    let matches = entries
        .iter()
        .filter(|entry| entry.id().as_str().starts_with(&query))
        .collect::<Vec<_>>();

    match matches.as_slice() {
        [] => Ok((ReviewId::new(query), None)),
        [entry] => Ok((entry.id().clone(), Some(*entry))),
        _ => {
            let options = matches
                .iter()
                .take(3)
                .map(|entry| short_id(entry.id().as_str()))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousReviewId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}
