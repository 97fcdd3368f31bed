//! Review model

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Identity;
use crate::error::{Error, Result};
use crate::util::sanitize_text;

/// Prefix for ids generated on this device while a review awaits sync.
pub const LOCAL_ID_PREFIX: &str = "local-";
/// Maximum display name length, in characters.
pub const MAX_USERNAME_CHARS: usize = 255;
/// Maximum review text length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 500;
/// Display name used when none is given.
pub const GUEST_USERNAME: &str = "Guest";
/// App version tag attached to submissions when the client sets none.
pub const DEFAULT_APP_VERSION: &str = "1.0";

/// Identifier of a review, either server-issued or a local placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(String);

impl ReviewId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a placeholder id for an optimistic insert (UUID v7, time-sortable).
    #[must_use]
    pub fn local() -> Self {
        Self(format!("{LOCAL_ID_PREFIX}{}", Uuid::now_v7()))
    }

    /// Whether this id was generated locally and never issued by the server.
    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReviewId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Star rating in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Returns `None` when `value` is outside `1..=5`.
    pub const fn new(value: u8) -> Option<Self> {
        if value >= Self::MIN && value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Lenient conversion for user input.
    ///
    /// Missing or zero ratings become 5 stars; anything else is clamped into
    /// range.
    pub fn from_input(value: Option<i64>) -> Self {
        match value {
            None | Some(0) => Self::default(),
            Some(value) => {
                let clamped = value.clamp(i64::from(Self::MIN), i64::from(Self::MAX));
                Self(u8::try_from(clamped).unwrap_or(Self::MAX))
            }
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for Rating {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

impl TryFrom<i64> for Rating {
    type Error = String;

    fn try_from(value: i64) -> std::result::Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| format!("rating must be between 1 and 5, got {value}"))
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user-authored review as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub username: String,
    pub rating: Rating,
    pub message: String,
    /// Author's identity id; empty for guest submissions
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_app_version")]
    pub app_version: String,
    /// Moderation flag, never changed by this crate
    #[serde(default)]
    pub reported: bool,
}

fn default_app_version() -> String {
    DEFAULT_APP_VERSION.to_string()
}

impl Review {
    /// Build a review from validated input, stamped with the client clock.
    ///
    /// The id is a local placeholder; the remote store issues the real one.
    pub fn compose(draft: &NewReview, author: Option<&Identity>, app_version: &str) -> Self {
        let owner_id = author.map(|identity| identity.id.clone()).unwrap_or_default();
        let app_version = sanitize_text(app_version, MAX_USERNAME_CHARS, DEFAULT_APP_VERSION);
        Self {
            id: ReviewId::local(),
            username: draft.username.clone(),
            rating: draft.rating,
            message: draft.message.clone(),
            verified: !owner_id.is_empty(),
            owner_id,
            created_at: Utc::now(),
            app_version,
            reported: false,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.owner_id.is_empty()
    }

    /// Exact ownership check. Guest reviews are owned by nobody.
    pub fn is_owned_by(&self, identity: &Identity) -> bool {
        !self.owner_id.is_empty() && self.owner_id == identity.id
    }

    pub fn apply(&mut self, patch: &ReviewPatch) {
        self.rating = patch.rating;
        self.message.clone_from(&patch.message);
    }
}

/// Raw review form input, as typed by a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewInput {
    pub username: String,
    pub rating: Option<i64>,
    pub message: String,
}

impl ReviewInput {
    pub fn new(username: impl Into<String>, rating: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            rating,
            message: message.into(),
        }
    }

    /// Trim, default, and cap the input.
    pub fn validate(&self) -> Result<NewReview> {
        Ok(NewReview {
            username: sanitize_text(&self.username, MAX_USERNAME_CHARS, GUEST_USERNAME),
            rating: Rating::from_input(self.rating),
            message: validate_message(&self.message)?,
        })
    }
}

/// Review content that passed local validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub username: String,
    pub rating: Rating,
    pub message: String,
}

/// Fields an author may change on an existing review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPatch {
    pub rating: Rating,
    pub message: String,
}

impl ReviewPatch {
    pub fn new(rating: Option<i64>, message: &str) -> Result<Self> {
        Ok(Self {
            rating: Rating::from_input(rating),
            message: validate_message(message)?,
        })
    }
}

fn validate_message(message: &str) -> Result<String> {
    let message = sanitize_text(message, MAX_MESSAGE_CHARS, "");
    if message.is_empty() {
        return Err(Error::InvalidInput(
            "Review message cannot be empty".to_string(),
        ));
    }
    Ok(message)
}

/// A feed entry: either confirmed by the remote store or still local-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CachedReview", into = "CachedReview")]
pub enum ReviewEntry {
    Confirmed(Review),
    Pending(Review),
}

impl ReviewEntry {
    pub const fn review(&self) -> &Review {
        match self {
            Self::Confirmed(review) | Self::Pending(review) => review,
        }
    }

    pub fn into_review(self) -> Review {
        match self {
            Self::Confirmed(review) | Self::Pending(review) => review,
        }
    }

    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    pub const fn id(&self) -> &ReviewId {
        &self.review().id
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.review().created_at
    }
}

/// Flat on-disk shape of a feed entry.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedReview {
    #[serde(flatten)]
    review: Review,
    #[serde(default)]
    pending_sync: bool,
}

impl From<CachedReview> for ReviewEntry {
    fn from(value: CachedReview) -> Self {
        if value.pending_sync {
            Self::Pending(value.review)
        } else {
            Self::Confirmed(value.review)
        }
    }
}

impl From<ReviewEntry> for CachedReview {
    fn from(value: ReviewEntry) -> Self {
        let pending_sync = value.is_pending();
        Self {
            review: value.into_review(),
            pending_sync,
        }
    }
}

/// Stable sort, newest `created_at` first.
pub fn sort_newest_first(entries: &mut [ReviewEntry]) {
    entries.sort_by(|left, right| right.created_at().cmp(&left.created_at()));
}

/// Aggregate shown above the review list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub count: usize,
    pub average: f64,
    /// Average rounded to whole stars
    pub rounded: u8,
}

impl RatingSummary {
    pub fn from_entries(entries: &[ReviewEntry]) -> Self {
        if entries.is_empty() {
            return Self {
                count: 0,
                average: f64::from(Rating::MAX),
                rounded: Rating::MAX,
            };
        }

        let total: u32 = entries
            .iter()
            .map(|entry| u32::from(entry.review().rating.get()))
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let average = f64::from(total) / entries.len() as f64;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rounded = average.round().clamp(1.0, 5.0) as u8;

        Self {
            count: entries.len(),
            average,
            rounded,
        }
    }
}
