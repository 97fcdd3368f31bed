//! Data models for Auri reviews

mod identity;
mod review;

pub use identity::{Credentials, Identity, Session, DEFAULT_ACCOUNT_NAME, MAX_EMAIL_CHARS};
pub use review::{
    sort_newest_first, NewReview, Rating, RatingSummary, Review, ReviewEntry, ReviewId,
    ReviewInput, ReviewPatch, DEFAULT_APP_VERSION, GUEST_USERNAME, LOCAL_ID_PREFIX,
    MAX_MESSAGE_CHARS, MAX_USERNAME_CHARS,
};
