//! Error types for auri-core

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type alias using auri-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Typed outcomes returned by the sync coordinator and the review service.
///
/// Local storage faults never show up here; they are absorbed (and logged)
/// by the session store and the review cache.
#[derive(Error, Debug)]
pub enum Error {
    /// Remote store or auth service could not be reached
    #[error("Remote service unavailable: {0}")]
    RemoteUnavailable(String),

    /// Review does not exist in the remote store
    #[error("Review not found: {0}")]
    NotFound(String),

    /// Acting identity does not own the review
    #[error("Only the author of a review can change it")]
    NotOwner,

    /// Remote store rejected the payload
    #[error("Rejected by remote store: {0}")]
    ValidationRejected(String),

    /// Login failed
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// A mutation was attempted without a signed-in identity
    #[error("You must be signed in to do that")]
    NotAuthenticated,

    /// Input failed local validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An online submission failed; nothing was written locally
    #[error("Failed to submit review: {0}")]
    SubmitFailed(#[source] RemoteError),

    /// Client configuration is missing or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RemoteUnavailable,
    NotFound,
    NotOwner,
    ValidationRejected,
    InvalidCredentials,
    NotAuthenticated,
    InvalidInput,
    Configuration,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RemoteUnavailable(_) => ErrorKind::RemoteUnavailable,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NotOwner => ErrorKind::NotOwner,
            Self::ValidationRejected(_) => ErrorKind::ValidationRejected,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::SubmitFailed(source) => Self::from(source.clone()).kind(),
        }
    }

    /// Only transport-level failures are worth trying again later.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::RemoteUnavailable
    }

    /// Sentence suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::RemoteUnavailable(_) => {
                "Can't reach the review server right now. Please try again later.".to_string()
            }
            Self::NotFound(_) => "That review no longer exists.".to_string(),
            Self::NotOwner => "You can only change your own reviews.".to_string(),
            Self::ValidationRejected(message) => {
                format!("The review server rejected this request: {message}")
            }
            Self::InvalidCredentials => "Unable to sign in with those credentials.".to_string(),
            Self::NotAuthenticated => "You must be logged in to change reviews.".to_string(),
            Self::InvalidInput(message) => message.clone(),
            Self::SubmitFailed(RemoteError::Unavailable(_)) => {
                "Failed to submit review. Check your connection and try again.".to_string()
            }
            Self::SubmitFailed(source) => format!("Failed to submit review: {source}"),
            Self::Configuration(message) => format!("Auri is not configured: {message}"),
        }
    }
}

impl From<RemoteError> for Error {
    fn from(value: RemoteError) -> Self {
        match value {
            RemoteError::Unavailable(message) => Self::RemoteUnavailable(message),
            RemoteError::NotFound(id) => Self::NotFound(id),
            RemoteError::ValidationRejected(message) => Self::ValidationRejected(message),
            RemoteError::InvalidCredentials => Self::InvalidCredentials,
            RemoteError::Forbidden(_) => Self::NotOwner,
        }
    }
}
