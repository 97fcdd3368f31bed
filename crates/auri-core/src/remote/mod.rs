//! Contracts for the remote document store and auth service.
//!
//! The core never talks HTTP directly; it is handed implementations of these
//! traits at construction time. [`AppwriteClient`] is the production adapter.

mod appwrite;

use thiserror::Error;

use crate::models::{Credentials, Identity, Review, ReviewId, ReviewPatch};

pub use appwrite::AppwriteClient;

/// Failures reported by a remote collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Network or server failure
    #[error("remote unavailable: {0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Payload rejected by the server
    #[error("rejected: {0}")]
    ValidationRejected(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    /// The server's own permission check refused the caller
    #[error("forbidden: {0}")]
    Forbidden(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Remote review collection.
#[allow(async_fn_in_trait)]
pub trait RemoteReviewStore {
    /// All reviews, newest `created_at` first.
    async fn list(&self) -> RemoteResult<Vec<Review>>;

    /// Store `review`; the returned copy carries the server-issued id.
    async fn create(&self, review: &Review) -> RemoteResult<Review>;

    async fn get(&self, id: &ReviewId) -> RemoteResult<Review>;

    async fn update(&self, id: &ReviewId, patch: &ReviewPatch) -> RemoteResult<Review>;

    async fn delete(&self, id: &ReviewId) -> RemoteResult<()>;
}

/// Remote authentication service.
#[allow(async_fn_in_trait)]
pub trait RemoteAuthService {
    /// Identity of the live remote session, `None` when there is none.
    async fn current_identity(&self) -> RemoteResult<Option<Identity>>;

    async fn create_session(&self, credentials: &Credentials) -> RemoteResult<Identity>;

    async fn create_account(&self, credentials: &Credentials, name: &str)
        -> RemoteResult<Identity>;

    async fn delete_current_session(&self) -> RemoteResult<()>;

    async fn delete_all_sessions(&self) -> RemoteResult<()>;
}
