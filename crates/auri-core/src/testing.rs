//! In-crate test doubles for the remote contracts and local storage.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

use crate::models::{Credentials, Identity, Rating, Review, ReviewEntry, ReviewId, ReviewPatch};
use crate::remote::{RemoteAuthService, RemoteError, RemoteResult, RemoteReviewStore};
use crate::storage::{KeyValueStore, StorageError, StorageResult};

pub fn review(id: &str, created_at: &str, rating: u8, owner_id: &str) -> Review {
    Review {
        id: ReviewId::from(id),
        username: format!("user-{id}"),
        rating: Rating::new(rating).unwrap(),
        message: format!("message {id}"),
        owner_id: owner_id.to_string(),
        verified: !owner_id.is_empty(),
        created_at: created_at.parse().unwrap(),
        app_version: "1.0".to_string(),
        reported: false,
    }
}

pub fn confirmed(id: &str, created_at: &str, rating: u8, owner_id: &str) -> ReviewEntry {
    ReviewEntry::Confirmed(review(id, created_at, rating, owner_id))
}

pub fn pending(id: &str, created_at: &str, rating: u8, owner_id: &str) -> ReviewEntry {
    ReviewEntry::Pending(review(id, created_at, rating, owner_id))
}

/// Storage backend whose every operation fails.
#[derive(Debug, Clone, Copy)]
pub struct UnavailableStore;

impl KeyValueStore for UnavailableStore {
    fn get(&self, _key: &str) -> StorageResult<Option<String>> {
        Err(StorageError::Unavailable("quota exceeded".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable("quota exceeded".to_string()))
    }

    fn remove(&self, _key: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable("quota exceeded".to_string()))
    }
}

/// Calls observed by [`MockRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Create,
    Get(String),
    Update(String),
    Delete(String),
    CurrentIdentity,
    CreateSession(String),
    CreateAccount(String),
    DeleteCurrentSession,
    DeleteAllSessions,
}

#[derive(Default)]
struct MockState {
    reviews: Vec<Review>,
    next_id: u32,
    store_unavailable: bool,
    auth_unavailable: bool,
    reject_create: Option<RemoteError>,
    accounts: Vec<(String, String, Identity)>,
    current: Option<Identity>,
    calls: Vec<Call>,
}

/// Recording fake of the document store and auth service.
///
/// Clones share state, so a test can keep a handle after moving one into the
/// service.
#[derive(Clone, Default)]
pub struct MockRemote {
    state: Arc<Mutex<MockState>>,
    list_gate: Arc<Mutex<Option<Arc<Notify>>>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reviews(reviews: Vec<Review>) -> Self {
        let remote = Self::new();
        remote.set_reviews(reviews);
        remote
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Server-side contents, in the order `list` will return them.
    pub fn set_reviews(&self, reviews: Vec<Review>) {
        self.state().reviews = reviews;
    }

    pub fn reviews(&self) -> Vec<Review> {
        self.state().reviews.clone()
    }

    pub fn set_store_unavailable(&self, unavailable: bool) {
        self.state().store_unavailable = unavailable;
    }

    pub fn set_auth_unavailable(&self, unavailable: bool) {
        self.state().auth_unavailable = unavailable;
    }

    pub fn reject_next_create(&self, error: RemoteError) {
        self.state().reject_create = Some(error);
    }

    pub fn register(&self, email: &str, password: &str, identity: Identity) {
        self.state()
            .accounts
            .push((email.to_string(), password.to_string(), identity));
    }

    pub fn set_current(&self, identity: Option<Identity>) {
        self.state().current = identity;
    }

    pub fn current(&self) -> Option<Identity> {
        self.state().current.clone()
    }

    /// Make subsequent `list` calls wait until the returned handle is notified.
    pub fn gate_list(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.list_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn ungate_list(&self) {
        *self.list_gate.lock().unwrap() = None;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }

    fn store_check(&self) -> RemoteResult<()> {
        if self.state().store_unavailable {
            Err(RemoteError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn auth_check(&self) -> RemoteResult<()> {
        if self.state().auth_unavailable {
            Err(RemoteError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn find(&self, id: &ReviewId) -> RemoteResult<Review> {
        self.state()
            .reviews
            .iter()
            .find(|review| &review.id == id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }
}

impl RemoteReviewStore for MockRemote {
    async fn list(&self) -> RemoteResult<Vec<Review>> {
        self.record(Call::List);
        let gate = self.list_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.store_check()?;
        Ok(self.reviews())
    }

    async fn create(&self, review: &Review) -> RemoteResult<Review> {
        self.record(Call::Create);
        self.store_check()?;
        let mut state = self.state();
        if let Some(error) = state.reject_create.take() {
            return Err(error);
        }
        state.next_id += 1;
        let mut created = review.clone();
        created.id = ReviewId::new(format!("srv{}", state.next_id));
        state.reviews.insert(0, created.clone());
        Ok(created)
    }

    async fn get(&self, id: &ReviewId) -> RemoteResult<Review> {
        self.record(Call::Get(id.to_string()));
        self.store_check()?;
        self.find(id)
    }

    async fn update(&self, id: &ReviewId, patch: &ReviewPatch) -> RemoteResult<Review> {
        self.record(Call::Update(id.to_string()));
        self.store_check()?;
        let mut state = self.state();
        let review = state
            .reviews
            .iter_mut()
            .find(|review| &review.id == id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        review.apply(patch);
        Ok(review.clone())
    }

    async fn delete(&self, id: &ReviewId) -> RemoteResult<()> {
        self.record(Call::Delete(id.to_string()));
        self.store_check()?;
        let mut state = self.state();
        let before = state.reviews.len();
        state.reviews.retain(|review| &review.id != id);
        if state.reviews.len() == before {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

impl RemoteAuthService for MockRemote {
    async fn current_identity(&self) -> RemoteResult<Option<Identity>> {
        self.record(Call::CurrentIdentity);
        self.auth_check()?;
        Ok(self.current())
    }

    async fn create_session(&self, credentials: &Credentials) -> RemoteResult<Identity> {
        self.record(Call::CreateSession(credentials.email.clone()));
        self.auth_check()?;
        let mut state = self.state();
        let identity = state
            .accounts
            .iter()
            .find(|(email, password, _)| {
                email.eq_ignore_ascii_case(&credentials.email) && password == &credentials.password
            })
            .map(|(_, _, identity)| identity.clone())
            .ok_or(RemoteError::InvalidCredentials)?;
        state.current = Some(identity.clone());
        Ok(identity)
    }

    async fn create_account(
        &self,
        credentials: &Credentials,
        name: &str,
    ) -> RemoteResult<Identity> {
        self.record(Call::CreateAccount(credentials.email.clone()));
        self.auth_check()?;
        let mut state = self.state();
        if state
            .accounts
            .iter()
            .any(|(email, _, _)| email.eq_ignore_ascii_case(&credentials.email))
        {
            return Err(RemoteError::ValidationRejected(
                "user_already_exists".to_string(),
            ));
        }
        let identity = Identity::new(format!("acct{}", state.accounts.len() + 1))
            .with_email(credentials.email.clone())
            .with_name(name);
        state.accounts.push((
            credentials.email.clone(),
            credentials.password.clone(),
            identity.clone(),
        ));
        Ok(identity)
    }

    async fn delete_current_session(&self) -> RemoteResult<()> {
        self.record(Call::DeleteCurrentSession);
        self.auth_check()?;
        self.state().current = None;
        Ok(())
    }

    async fn delete_all_sessions(&self) -> RemoteResult<()> {
        self.record(Call::DeleteAllSessions);
        self.auth_check()?;
        self.state().current = None;
        Ok(())
    }
}
