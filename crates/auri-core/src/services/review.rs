//! Review service facade.

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::cache::ReviewCache;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{Error, Result};
use crate::models::{
    Credentials, Identity, RatingSummary, ReviewEntry, ReviewId, ReviewInput, ReviewPatch,
    DEFAULT_ACCOUNT_NAME, DEFAULT_APP_VERSION, MAX_USERNAME_CHARS,
};
use crate::remote::{RemoteAuthService, RemoteError, RemoteReviewStore};
use crate::session::SessionStore;
use crate::state::SyncPhase;
use crate::storage::KeyValueStore;
use crate::sync::{ResyncOutcome, SyncCoordinator};
use crate::util::sanitize_text;

/// Result of [`ReviewService::restore_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// The auth service confirmed the session
    Verified(Identity),
    /// Server unreachable or session expired; last persisted identity.
    /// Display only: ownership is always re-checked remotely.
    Cached(Identity),
    Anonymous,
}

impl SessionStatus {
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Verified(identity) | Self::Cached(identity) => Some(identity),
            Self::Anonymous => None,
        }
    }
}

/// Entry point used by clients: validates input, tracks the signed-in
/// identity, and delegates feed work to the [`SyncCoordinator`].
pub struct ReviewService<R, A, K>
where
    R: RemoteReviewStore,
    A: RemoteAuthService,
    K: KeyValueStore,
{
    coordinator: SyncCoordinator<R, K>,
    auth: A,
    sessions: SessionStore<K>,
    connectivity: ConnectivityMonitor,
    identity: RwLock<Option<Identity>>,
    app_version: String,
}

impl<R, A, K> ReviewService<R, A, K>
where
    R: RemoteReviewStore,
    A: RemoteAuthService,
    K: KeyValueStore,
{
    pub fn new(remote: R, auth: A, store: K, connectivity: ConnectivityMonitor) -> Self {
        Self {
            coordinator: SyncCoordinator::new(
                remote,
                ReviewCache::new(store.clone()),
                connectivity.clone(),
            ),
            auth,
            sessions: SessionStore::new(store),
            connectivity,
            identity: RwLock::new(None),
            app_version: DEFAULT_APP_VERSION.to_string(),
        }
    }

    #[must_use]
    pub fn with_app_version(mut self, app_version: &str) -> Self {
        self.app_version = sanitize_text(app_version, MAX_USERNAME_CHARS, DEFAULT_APP_VERSION);
        self
    }

    pub async fn initialize(&self) -> SyncPhase {
        self.coordinator.initialize().await
    }

    /// The feed, newest first. Loads it on first use.
    pub async fn list_reviews(&self) -> Vec<ReviewEntry> {
        self.coordinator.entries().await
    }

    pub async fn rating_summary(&self) -> RatingSummary {
        RatingSummary::from_entries(&self.coordinator.entries().await)
    }

    /// Validate and submit a review. `acting` is `None` for guests.
    pub async fn submit_review(
        &self,
        input: &ReviewInput,
        acting: Option<&Identity>,
    ) -> Result<ReviewEntry> {
        let draft = input.validate()?;
        self.coordinator
            .submit(&draft, acting, &self.app_version)
            .await
    }

    pub async fn edit_review(
        &self,
        id: &ReviewId,
        rating: Option<i64>,
        message: &str,
    ) -> Result<ReviewEntry> {
        let acting = self.require_identity().await?;
        let patch = ReviewPatch::new(rating, message)?;
        self.coordinator.edit(id, &patch, &acting).await
    }

    pub async fn delete_review(&self, id: &ReviewId) -> Result<()> {
        let acting = self.require_identity().await?;
        self.coordinator.delete(id, &acting).await
    }

    async fn require_identity(&self) -> Result<Identity> {
        self.identity
            .read()
            .await
            .clone()
            .ok_or(Error::NotAuthenticated)
    }

    /// Sign in, reusing a live session for the same email.
    ///
    /// The session is persisted only once the auth service has confirmed the
    /// identity.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
        let credentials = Credentials::new(email, password)?;

        match self.auth.current_identity().await {
            Ok(Some(identity)) if identity.has_email(&credentials.email) => {
                tracing::debug!("Reusing active session for {}", credentials.email);
                return Ok(self.remember(identity).await);
            }
            Ok(Some(identity)) => {
                tracing::debug!("Replacing active session of {}", identity.label());
                if let Err(error) = self.auth.delete_current_session().await {
                    tracing::debug!("Failed to clear previous session: {}", error);
                }
            }
            Ok(None) => {}
            Err(error) => tracing::debug!("No active session: {}", error),
        }

        let identity = self
            .auth
            .create_session(&credentials)
            .await
            .map_err(|error| match error {
                RemoteError::Forbidden(_) | RemoteError::InvalidCredentials => {
                    Error::InvalidCredentials
                }
                other => Error::from(other),
            })?;
        tracing::info!("Signed in as {}", identity.label());
        Ok(self.remember(identity).await)
    }

    /// Create an account, then sign in with it.
    pub async fn signup(&self, email: &str, password: &str, name: &str) -> Result<Identity> {
        let credentials = Credentials::new(email, password)?;
        let name = sanitize_text(name, MAX_USERNAME_CHARS, DEFAULT_ACCOUNT_NAME);
        self.auth.create_account(&credentials, &name).await?;
        tracing::info!("Created account for {}", credentials.email);
        self.login(&credentials.email, &credentials.password).await
    }

    /// Sign out everywhere. Remote failures are logged; local state is
    /// always cleared.
    pub async fn logout(&self) {
        if let Err(error) = self.auth.delete_all_sessions().await {
            tracing::warn!("Logout error: {}", error);
        }
        self.sessions.clear();
        *self.identity.write().await = None;
        tracing::info!("Signed out");
    }

    pub async fn restore_session(&self) -> SessionStatus {
        match self.auth.current_identity().await {
            Ok(Some(identity)) => {
                let identity = self.remember(identity).await;
                return SessionStatus::Verified(identity);
            }
            Ok(None) => tracing::debug!("No remote session to restore"),
            Err(error) => tracing::warn!("Failed to verify session: {}", error),
        }

        match self.sessions.load() {
            Some(session) => {
                tracing::debug!("Using cached session of {}", session.identity.label());
                *self.identity.write().await = Some(session.identity.clone());
                SessionStatus::Cached(session.identity)
            }
            None => {
                *self.identity.write().await = None;
                SessionStatus::Anonymous
            }
        }
    }

    async fn remember(&self, identity: Identity) -> Identity {
        self.sessions.save(&identity);
        *self.identity.write().await = Some(identity.clone());
        identity
    }

    pub async fn current_identity(&self) -> Option<Identity> {
        self.identity.read().await.clone()
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn sync_phase(&self) -> SyncPhase {
        self.coordinator.phase()
    }

    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        self.coordinator.last_sync_at()
    }

    pub async fn refresh(&self) -> ResyncOutcome {
        self.coordinator.refresh().await
    }

    /// Record a reachability report and react to it right away.
    ///
    /// Returns `None` when the flag did not change.
    pub async fn set_online(&self, online: bool) -> Option<ResyncOutcome> {
        let transition = self.connectivity.set_online(online)?;
        Some(self.coordinator.handle_transition(transition).await)
    }

    /// Drive the coordinator from monitor events reported through other
    /// handles. Runs until the future is dropped.
    pub async fn watch_connectivity(&self) {
        let mut events = self.connectivity.subscribe();
        while let Some(transition) = events.next_transition().await {
            let outcome = self.coordinator.handle_transition(transition).await;
            tracing::debug!("Handled {:?}: {:?}", transition, outcome);
        }
    }
}
