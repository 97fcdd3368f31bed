use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{}", .0.user_message())]
    Core(#[from] auri_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No review message provided")]
    EmptyMessage,
    #[error("Review ID cannot be empty")]
    EmptyReviewId,
    #[error("{0}")]
    AmbiguousReviewId(String),
    #[error("Nothing to change. Pass --rating and/or --message")]
    NothingToEdit,
    #[error("Could not reach the review server; kept cached reviews")]
    SyncFailed,
    #[error("Cannot sync while --offline is set")]
    OfflineMode,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
    #[error(
        "Auri is not configured. Run `auri config init` or set the AURI_APPWRITE_* environment variables."
    )]
    NotConfigured,
}
