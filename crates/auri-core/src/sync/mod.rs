//! Review feed synchronization.
//!
//! [`SyncCoordinator`] owns the in-memory feed and decides when it is
//! refetched from the remote store, when it falls back to the local cache,
//! and how writes land while offline. A successful fetch always replaces the
//! whole feed; local-only entries that the server does not return are
//! dropped, never re-submitted.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};

use crate::cache::ReviewCache;
use crate::connectivity::{ConnectivityMonitor, Transition};
use crate::error::{Error, Result};
use crate::models::{
    sort_newest_first, Identity, NewReview, Review, ReviewEntry, ReviewId, ReviewPatch,
};
use crate::remote::RemoteReviewStore;
use crate::state::SyncPhase;
use crate::storage::KeyValueStore;

/// Result of a resync request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncOutcome {
    /// The feed was replaced with `count` remote reviews
    Synced { count: usize },
    /// The fetch failed; the feed is unchanged and marked offline
    Failed,
    /// Another resync was already in flight
    Coalesced,
    /// Nothing to do in the current phase
    Skipped,
}

#[derive(Debug, Default)]
struct Feed {
    entries: Vec<ReviewEntry>,
}

/// Resets the in-flight flag even if the resync future is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncCoordinator<R: RemoteReviewStore, K: KeyValueStore> {
    remote: R,
    cache: ReviewCache<K>,
    connectivity: ConnectivityMonitor,
    feed: Mutex<Feed>,
    phase: watch::Sender<SyncPhase>,
    resync_in_flight: AtomicBool,
}

impl<R: RemoteReviewStore, K: KeyValueStore> SyncCoordinator<R, K> {
    pub fn new(remote: R, cache: ReviewCache<K>, connectivity: ConnectivityMonitor) -> Self {
        let (phase, _receiver) = watch::channel(SyncPhase::Idle);
        Self {
            remote,
            cache,
            connectivity,
            feed: Mutex::new(Feed::default()),
            phase,
            resync_in_flight: AtomicBool::new(false),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        self.cache.last_sync_at()
    }

    fn set_phase(&self, phase: SyncPhase) {
        let previous = self.phase.send_replace(phase);
        if previous != phase {
            tracing::debug!("Sync phase: {} -> {}", previous.label(), phase.label());
        }
    }

    /// First load of the feed. Later calls return the current phase untouched.
    pub async fn initialize(&self) -> SyncPhase {
        let mut feed = self.feed.lock().await;
        self.ensure_loaded(&mut feed).await;
        self.phase()
    }

    /// Snapshot of the feed, newest first.
    pub async fn entries(&self) -> Vec<ReviewEntry> {
        let mut feed = self.feed.lock().await;
        self.ensure_loaded(&mut feed).await;
        feed.entries.clone()
    }

    /// React to a connectivity change.
    ///
    /// Coming online resyncs only when the feed is showing offline data.
    /// Going offline just flips the indicator, unless the monitor is back
    /// online by the time the feed lock is acquired.
    pub async fn handle_transition(&self, transition: Transition) -> ResyncOutcome {
        match transition {
            Transition::CameOnline => self.resync(true).await,
            Transition::WentOffline => {
                let _feed = self.feed.lock().await;
                // A resync that finished while we waited already saw the newer signal.
                if !self.connectivity.is_online()
                    && self.phase() == (SyncPhase::Ready { online: true })
                {
                    self.set_phase(SyncPhase::Ready { online: false });
                }
                ResyncOutcome::Skipped
            }
        }
    }

    /// Refetch on demand, from either ready state.
    pub async fn refresh(&self) -> ResyncOutcome {
        self.resync(false).await
    }

    async fn resync(&self, only_when_offline: bool) -> ResyncOutcome {
        let Some(_in_flight) = InFlight::acquire(&self.resync_in_flight) else {
            tracing::debug!("Resync already in flight");
            return ResyncOutcome::Coalesced;
        };

        let mut feed = self.feed.lock().await;
        match self.phase() {
            SyncPhase::Idle => {
                if only_when_offline {
                    return ResyncOutcome::Skipped;
                }
                if self.load(&mut feed).await {
                    return ResyncOutcome::Synced {
                        count: feed.entries.len(),
                    };
                }
                return ResyncOutcome::Failed;
            }
            SyncPhase::Ready { online: true } if only_when_offline => {
                return ResyncOutcome::Skipped;
            }
            SyncPhase::Ready { .. } => {}
            SyncPhase::Loading | SyncPhase::Resyncing => return ResyncOutcome::Skipped,
        }

        self.set_phase(SyncPhase::Resyncing);
        match self.remote.list().await {
            Ok(reviews) => {
                self.replace(&mut feed, reviews);
                self.set_phase(SyncPhase::Ready { online: true });
                ResyncOutcome::Synced {
                    count: feed.entries.len(),
                }
            }
            Err(error) => {
                tracing::warn!("Resync failed, keeping cached reviews: {}", error);
                self.set_phase(SyncPhase::Ready { online: false });
                ResyncOutcome::Failed
            }
        }
    }

    /// Submit a validated review.
    ///
    /// Online, the review is created remotely and the feed refetched; a failed
    /// create leaves no local trace. Offline, it is inserted at the head as a
    /// pending entry and the call returns without touching the network.
    pub async fn submit(
        &self,
        draft: &NewReview,
        author: Option<&Identity>,
        app_version: &str,
    ) -> Result<ReviewEntry> {
        let review = Review::compose(draft, author, app_version);
        let mut feed = self.feed.lock().await;
        self.ensure_loaded(&mut feed).await;

        if !self.connectivity.is_online() {
            let entry = ReviewEntry::Pending(review);
            feed.entries.insert(0, entry.clone());
            self.cache.store_local(&feed.entries);
            tracing::info!("Queued review {} while offline", entry.id());
            return Ok(entry);
        }

        let created = self.remote.create(&review).await.map_err(|error| {
            tracing::warn!("Failed to submit review: {}", error);
            Error::SubmitFailed(error)
        })?;
        tracing::info!("Submitted review {}", created.id);

        match self.remote.list().await {
            Ok(reviews) => {
                self.replace(&mut feed, reviews);
                self.set_phase(SyncPhase::Ready { online: true });
            }
            Err(error) => {
                tracing::warn!("Refetch after submit failed: {}", error);
                insert_sorted(&mut feed.entries, ReviewEntry::Confirmed(created.clone()));
                self.cache.store_local(&feed.entries);
                self.set_phase(SyncPhase::Ready { online: false });
            }
        }
        Ok(ReviewEntry::Confirmed(created))
    }

    /// Change rating and message of a review owned by `acting`.
    ///
    /// Ownership is checked against the server copy, never the cache.
    pub async fn edit(
        &self,
        id: &ReviewId,
        patch: &ReviewPatch,
        acting: &Identity,
    ) -> Result<ReviewEntry> {
        let mut feed = self.feed.lock().await;
        self.ensure_loaded(&mut feed).await;

        self.verify_owner(id, acting).await?;
        let updated = self.remote.update(id, patch).await?;
        tracing::info!("Updated review {}", id);

        if self.connectivity.is_online() {
            match self.remote.list().await {
                Ok(reviews) => {
                    self.replace(&mut feed, reviews);
                    self.set_phase(SyncPhase::Ready { online: true });
                    let entry = feed
                        .entries
                        .iter()
                        .find(|entry| entry.id() == id)
                        .cloned()
                        .unwrap_or(ReviewEntry::Confirmed(updated));
                    return Ok(entry);
                }
                Err(error) => {
                    tracing::warn!("Refetch after edit failed: {}", error);
                    self.set_phase(SyncPhase::Ready { online: false });
                }
            }
        }

        Ok(self.patch_in_place(&mut feed, updated, patch))
    }

    /// Delete a review owned by `acting`.
    pub async fn delete(&self, id: &ReviewId, acting: &Identity) -> Result<()> {
        let mut feed = self.feed.lock().await;
        self.ensure_loaded(&mut feed).await;

        self.verify_owner(id, acting).await?;
        self.remote.delete(id).await?;
        tracing::info!("Deleted review {}", id);

        feed.entries.retain(|entry| entry.id() != id);
        self.cache.store_local(&feed.entries);
        Ok(())
    }

    async fn verify_owner(&self, id: &ReviewId, acting: &Identity) -> Result<()> {
        let authoritative = self.remote.get(id).await?;
        if authoritative.is_owned_by(acting) {
            Ok(())
        } else {
            tracing::warn!("Identity {} does not own review {}", acting.id, id);
            Err(Error::NotOwner)
        }
    }

    async fn ensure_loaded(&self, feed: &mut Feed) {
        if self.phase() == SyncPhase::Idle {
            self.load(feed).await;
        }
    }

    /// Initial load. Returns whether remote data was obtained.
    async fn load(&self, feed: &mut Feed) -> bool {
        self.set_phase(SyncPhase::Loading);

        if self.connectivity.is_online() {
            match self.remote.list().await {
                Ok(reviews) => {
                    self.replace(feed, reviews);
                    self.set_phase(SyncPhase::Ready { online: true });
                    return true;
                }
                Err(error) => {
                    tracing::warn!("Failed to fetch reviews, using cache: {}", error);
                }
            }
        } else {
            tracing::debug!("Offline at startup, loading cached reviews");
        }

        feed.entries = self.cache.load();
        sort_newest_first(&mut feed.entries);
        self.set_phase(SyncPhase::Ready { online: false });
        false
    }

    fn replace(&self, feed: &mut Feed, reviews: Vec<Review>) {
        let dropped = feed.entries.iter().filter(|entry| entry.is_pending()).count();
        feed.entries = reviews.into_iter().map(ReviewEntry::Confirmed).collect();
        sort_newest_first(&mut feed.entries);
        self.cache.save(&feed.entries);
        if dropped > 0 {
            tracing::info!("Resync superseded {} local-only reviews", dropped);
        }
        tracing::debug!("Feed replaced with {} reviews", feed.entries.len());
    }

    fn patch_in_place(&self, feed: &mut Feed, updated: Review, patch: &ReviewPatch) -> ReviewEntry {
        let entry = match feed.entries.iter_mut().find(|entry| entry.id() == &updated.id) {
            Some(slot) => {
                let mut review = slot.review().clone();
                review.apply(patch);
                *slot = ReviewEntry::Pending(review);
                slot.clone()
            }
            None => {
                let entry = ReviewEntry::Pending(updated);
                insert_sorted(&mut feed.entries, entry.clone());
                entry
            }
        };
        self.cache.store_local(&feed.entries);
        entry
    }
}

fn insert_sorted(entries: &mut Vec<ReviewEntry>, entry: ReviewEntry) {
    let index = entries
        .iter()
        .position(|existing| existing.created_at() < entry.created_at())
        .unwrap_or(entries.len());
    entries.insert(index, entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::REVIEWS_CACHE_KEY;
    use crate::models::{Rating, ReviewInput};
    use crate::remote::RemoteError;
    use crate::storage::MemoryStore;
    use crate::testing::{confirmed, pending, review, Call, MockRemote, UnavailableStore};
    use pretty_assertions::assert_eq;

    fn coordinator(
        remote: &MockRemote,
        store: &MemoryStore,
        online: bool,
    ) -> (SyncCoordinator<MockRemote, MemoryStore>, ConnectivityMonitor) {
        let monitor = ConnectivityMonitor::new(online);
        let coordinator = SyncCoordinator::new(
            remote.clone(),
            ReviewCache::new(store.clone()),
            monitor.clone(),
        );
        (coordinator, monitor)
    }

    fn draft(username: &str, rating: i64, message: &str) -> NewReview {
        ReviewInput::new(username, Some(rating), message)
            .validate()
            .unwrap()
    }

    fn ids(entries: &[ReviewEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.id().as_str()).collect()
    }

    fn list_calls(remote: &MockRemote) -> usize {
        remote.count(|call| call == &Call::List)
    }

    #[tokio::test(flavor = "current_thread")]
    async fn initialize_online_caches_remote_order() {
        let remote = MockRemote::with_reviews(vec![
            review("r1", "2024-01-02T00:00:00Z", 5, ""),
            review("r2", "2024-01-01T00:00:00Z", 3, ""),
        ]);
        let store = MemoryStore::new();
        let (coordinator, _monitor) = coordinator(&remote, &store, true);

        assert_eq!(
            coordinator.initialize().await,
            SyncPhase::Ready { online: true }
        );
        let entries = coordinator.entries().await;
        assert_eq!(ids(&entries), vec!["r1", "r2"]);
        assert_eq!(ReviewCache::new(store).load(), entries);
        assert!(coordinator.last_sync_at().is_some());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn fetched_feed_is_sorted_newest_first() {
        let remote = MockRemote::with_reviews(vec![
            review("old", "2023-06-01T00:00:00Z", 4, ""),
            review("new", "2024-03-01T00:00:00Z", 2, ""),
            review("mid", "2024-01-01T00:00:00Z", 5, ""),
        ]);
        let (coordinator, _monitor) = coordinator(&remote, &MemoryStore::new(), true);

        let entries = coordinator.entries().await;
        assert_eq!(ids(&entries), vec!["new", "mid", "old"]);
        assert!(entries
            .windows(2)
            .all(|pair| pair[0].created_at() >= pair[1].created_at()));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn initialize_falls_back_to_cache_when_fetch_fails() {
        let store = MemoryStore::new();
        ReviewCache::new(store.clone()).save(&[confirmed("r9", "2024-01-01T00:00:00Z", 4, "")]);
        let remote = MockRemote::new();
        remote.set_store_unavailable(true);
        let (coordinator, monitor) = coordinator(&remote, &store, true);

        assert_eq!(
            coordinator.initialize().await,
            SyncPhase::Ready { online: false }
        );
        assert!(monitor.is_online());
        assert_eq!(ids(&coordinator.entries().await), vec!["r9"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn initialize_offline_skips_network() {
        let store = MemoryStore::new();
        ReviewCache::new(store.clone()).save(&[confirmed("r1", "2024-01-01T00:00:00Z", 4, "")]);
        let remote = MockRemote::with_reviews(vec![review("r2", "2024-02-01T00:00:00Z", 5, "")]);
        let (coordinator, _monitor) = coordinator(&remote, &store, false);

        assert_eq!(
            coordinator.initialize().await,
            SyncPhase::Ready { online: false }
        );
        assert_eq!(ids(&coordinator.entries().await), vec!["r1"]);
        assert_eq!(list_calls(&remote), 0);
        assert_eq!(coordinator.initialize().await, SyncPhase::Ready { online: false });
    }

    #[tokio::test(flavor = "current_thread")]
    async fn offline_submit_inserts_pending_head() {
        let store = MemoryStore::new();
        let remote = MockRemote::new();
        let (coordinator, _monitor) = coordinator(&remote, &store, false);
        coordinator.initialize().await;

        let entry = coordinator
            .submit(&draft("Bo", 2, "meh"), None, "1.0")
            .await
            .unwrap();

        assert!(entry.is_pending());
        assert!(entry.id().is_local());
        let head = coordinator.entries().await.remove(0);
        assert!(head.is_pending());
        assert_eq!(head.review().username, "Bo");
        assert_eq!(head.review().rating, Rating::new(2).unwrap());

        let cached = ReviewCache::new(store.clone()).load();
        assert_eq!(cached.first(), Some(&head));
        assert!(store.get(REVIEWS_CACHE_KEY).unwrap().unwrap().contains("\"pendingSync\":true"));
        assert_eq!(remote.count(|call| call == &Call::Create), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn online_submit_creates_then_refetches() {
        let remote = MockRemote::with_reviews(vec![review("r1", "2024-01-01T00:00:00Z", 5, "")]);
        let (coordinator, _monitor) = coordinator(&remote, &MemoryStore::new(), true);
        coordinator.initialize().await;
        let author = Identity::new("u1");

        let entry = coordinator
            .submit(&draft("Ana", 4, "lovely"), Some(&author), "2.0")
            .await
            .unwrap();

        assert!(!entry.is_pending());
        assert_eq!(entry.review().owner_id, "u1");
        assert!(entry.review().verified);
        assert_eq!(entry.review().app_version, "2.0");
        assert_eq!(ids(&coordinator.entries().await), vec!["srv1", "r1"]);
        assert_eq!(list_calls(&remote), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn failed_online_submit_leaves_no_trace() {
        let store = MemoryStore::new();
        let remote = MockRemote::with_reviews(vec![review("r1", "2024-01-01T00:00:00Z", 5, "")]);
        let (coordinator, _monitor) = coordinator(&remote, &store, true);
        coordinator.initialize().await;
        remote.reject_next_create(RemoteError::ValidationRejected("too long".to_string()));

        let error = coordinator
            .submit(&draft("Ana", 4, "hi"), None, "1.0")
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            Error::SubmitFailed(RemoteError::ValidationRejected(_))
        ));
        assert!(!error.is_retryable());
        assert_eq!(ids(&coordinator.entries().await), vec!["r1"]);
        assert_eq!(ids(&ReviewCache::new(store).load()), vec!["r1"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn created_review_survives_failed_refetch() {
        let remote = MockRemote::with_reviews(vec![review("r1", "2024-01-01T00:00:00Z", 5, "")]);
        let (coordinator, _monitor) = coordinator(&remote, &MemoryStore::new(), true);
        coordinator.initialize().await;

        let ana = draft("Ana", 4, "hi");
        let gate = remote.gate_list();
        let (submitted, ()) = tokio::join!(
            coordinator.submit(&ana, None, "1.0"),
            async {
                tokio::task::yield_now().await;
                remote.set_store_unavailable(true);
                gate.notify_one();
            }
        );

        let submitted = submitted.unwrap();
        assert_eq!(submitted.id().as_str(), "srv1");
        assert_eq!(ids(&coordinator.entries().await), vec!["srv1", "r1"]);
        assert_eq!(coordinator.phase(), SyncPhase::Ready { online: false });
    }

    #[tokio::test(flavor = "current_thread")]
    async fn resync_on_reconnect_supersedes_pending_entries() {
        let remote = MockRemote::with_reviews(vec![review("r1", "2024-01-01T00:00:00Z", 5, "")]);
        let store = MemoryStore::new();
        let (coordinator, monitor) = coordinator(&remote, &store, false);
        coordinator.initialize().await;
        coordinator
            .submit(&draft("Bo", 2, "meh"), None, "1.0")
            .await
            .unwrap();
        assert_eq!(coordinator.entries().await.len(), 1);

        let transition = monitor.set_online(true).unwrap();
        assert_eq!(
            coordinator.handle_transition(transition).await,
            ResyncOutcome::Synced { count: 1 }
        );

        let entries = coordinator.entries().await;
        assert_eq!(ids(&entries), vec!["r1"]);
        assert!(entries.iter().all(|entry| !entry.is_pending()));
        assert_eq!(ReviewCache::new(store).load(), entries);
        assert_eq!(coordinator.phase(), SyncPhase::Ready { online: true });
    }

    #[tokio::test(flavor = "current_thread")]
    async fn failed_resync_keeps_offline_feed() {
        let store = MemoryStore::new();
        ReviewCache::new(store.clone())
            .store_local(&[pending("local-1", "2024-01-01T00:00:00Z", 3, "")]);
        let remote = MockRemote::new();
        remote.set_store_unavailable(true);
        let (coordinator, monitor) = coordinator(&remote, &store, false);
        coordinator.initialize().await;

        let transition = monitor.set_online(true).unwrap();
        assert_eq!(
            coordinator.handle_transition(transition).await,
            ResyncOutcome::Failed
        );
        assert_eq!(coordinator.phase(), SyncPhase::Ready { online: false });
        assert_eq!(ids(&coordinator.entries().await), vec!["local-1"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn reconnect_while_online_does_not_refetch() {
        let remote = MockRemote::new();
        let (coordinator, _monitor) = coordinator(&remote, &MemoryStore::new(), true);
        coordinator.initialize().await;

        assert_eq!(
            coordinator.handle_transition(Transition::CameOnline).await,
            ResyncOutcome::Skipped
        );
        assert_eq!(list_calls(&remote), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn going_offline_flips_indicator_only() {
        let remote = MockRemote::with_reviews(vec![review("r1", "2024-01-01T00:00:00Z", 5, "")]);
        let (coordinator, monitor) = coordinator(&remote, &MemoryStore::new(), true);
        coordinator.initialize().await;

        monitor.set_online(false);
        coordinator.handle_transition(Transition::WentOffline).await;
        assert_eq!(coordinator.phase(), SyncPhase::Ready { online: false });
        assert_eq!(ids(&coordinator.entries().await), vec!["r1"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn stale_offline_event_does_not_outlive_reconnect() {
        let remote = MockRemote::with_reviews(vec![review("r1", "2024-01-01T00:00:00Z", 5, "")]);
        let (coordinator, monitor) = coordinator(&remote, &MemoryStore::new(), true);
        coordinator.initialize().await;
        monitor.set_online(false);
        coordinator.handle_transition(Transition::WentOffline).await;

        let gate = remote.gate_list();
        monitor.set_online(true);
        let (first, second, third) = tokio::join!(
            coordinator.handle_transition(Transition::CameOnline),
            async {
                while coordinator.phase() != SyncPhase::Resyncing {
                    tokio::task::yield_now().await;
                }
                monitor.set_online(false);
                coordinator.handle_transition(Transition::WentOffline).await
            },
            async {
                while monitor.is_online() {
                    tokio::task::yield_now().await;
                }
                monitor.set_online(true);
                let third = coordinator.handle_transition(Transition::CameOnline).await;
                gate.notify_one();
                third
            }
        );

        assert_eq!(first, ResyncOutcome::Synced { count: 1 });
        assert_eq!(second, ResyncOutcome::Skipped);
        assert_eq!(third, ResyncOutcome::Coalesced);
        assert!(monitor.is_online());
        assert_eq!(coordinator.phase(), SyncPhase::Ready { online: true });
    }

    #[tokio::test(flavor = "current_thread")]
    async fn overlapping_resyncs_issue_one_fetch() {
        let remote = MockRemote::with_reviews(vec![review("r1", "2024-01-01T00:00:00Z", 5, "")]);
        let (coordinator, _monitor) = coordinator(&remote, &MemoryStore::new(), true);
        coordinator.initialize().await;
        let before = list_calls(&remote);

        let gate = remote.gate_list();
        let (first, second) = tokio::join!(coordinator.refresh(), async {
            tokio::task::yield_now().await;
            assert_eq!(coordinator.phase(), SyncPhase::Resyncing);
            let second = coordinator.refresh().await;
            gate.notify_one();
            second
        });

        assert_eq!(first, ResyncOutcome::Synced { count: 1 });
        assert_eq!(second, ResyncOutcome::Coalesced);
        assert_eq!(list_calls(&remote), before + 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn submit_during_resync_lands_after_replace() {
        let remote = MockRemote::with_reviews(vec![review("r1", "2024-01-01T00:00:00Z", 5, "")]);
        let (coordinator, _monitor) = coordinator(&remote, &MemoryStore::new(), false);
        coordinator.initialize().await;

        let gate = remote.gate_list();
        let (outcome, submitted, ()) = tokio::join!(
            coordinator.refresh(),
            async {
                tokio::task::yield_now().await;
                coordinator.submit(&draft("Bo", 2, "meh"), None, "1.0").await
            },
            async {
                tokio::task::yield_now().await;
                tokio::task::yield_now().await;
                remote.ungate_list();
                gate.notify_one();
            }
        );

        assert_eq!(outcome, ResyncOutcome::Synced { count: 1 });
        let submitted = submitted.unwrap();
        let entries = coordinator.entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], submitted);
        assert_eq!(entries[1].id().as_str(), "r1");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn owner_edit_updates_feed() {
        let remote = MockRemote::with_reviews(vec![review("r1", "2024-01-01T00:00:00Z", 3, "u1")]);
        let (coordinator, _monitor) = coordinator(&remote, &MemoryStore::new(), true);
        coordinator.initialize().await;
        let patch = ReviewPatch::new(Some(5), "better now").unwrap();

        let entry = coordinator
            .edit(&ReviewId::from("r1"), &patch, &Identity::new("u1"))
            .await
            .unwrap();

        assert!(!entry.is_pending());
        assert_eq!(entry.review().rating, Rating::new(5).unwrap());
        assert_eq!(entry.review().message, "better now");
        assert_eq!(coordinator.entries().await[0], entry);
        assert_eq!(remote.count(|call| call == &Call::Update("r1".to_string())), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn non_owner_edit_is_rejected_before_update() {
        let store = MemoryStore::new();
        // Stale cache claims u2 owns it; the server says otherwise.
        ReviewCache::new(store.clone()).save(&[confirmed("r1", "2024-01-01T00:00:00Z", 3, "u2")]);
        let remote = MockRemote::with_reviews(vec![review("r1", "2024-01-01T00:00:00Z", 3, "u1")]);
        let (coordinator, _monitor) = coordinator(&remote, &store, false);
        coordinator.initialize().await;
        let patch = ReviewPatch::new(Some(1), "mine now").unwrap();

        let error = coordinator
            .edit(&ReviewId::from("r1"), &patch, &Identity::new("u2"))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::NotOwner));

        let error = coordinator
            .delete(&ReviewId::from("r1"), &Identity::new("u2"))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::NotOwner));

        assert_eq!(
            remote.count(|call| matches!(call, Call::Update(_) | Call::Delete(_))),
            0
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn guest_reviews_belong_to_nobody() {
        let remote = MockRemote::with_reviews(vec![review("r1", "2024-01-01T00:00:00Z", 3, "")]);
        let (coordinator, _monitor) = coordinator(&remote, &MemoryStore::new(), true);

        let error = coordinator
            .delete(&ReviewId::from("r1"), &Identity::new(""))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::NotOwner));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn offline_edit_patches_entry_as_pending() {
        let store = MemoryStore::new();
        ReviewCache::new(store.clone()).save(&[
            confirmed("r2", "2024-01-02T00:00:00Z", 4, ""),
            confirmed("r1", "2024-01-01T00:00:00Z", 3, "u1"),
        ]);
        let remote = MockRemote::with_reviews(vec![review("r1", "2024-01-01T00:00:00Z", 3, "u1")]);
        let (coordinator, _monitor) = coordinator(&remote, &store, false);
        let patch = ReviewPatch::new(Some(5), "edited").unwrap();

        let entry = coordinator
            .edit(&ReviewId::from("r1"), &patch, &Identity::new("u1"))
            .await
            .unwrap();

        assert!(entry.is_pending());
        assert_eq!(entry.review().message, "edited");
        let cached = ReviewCache::new(store).load();
        assert_eq!(ids(&cached), vec!["r2", "r1"]);
        assert_eq!(cached[1], entry);
        assert_eq!(list_calls(&remote), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn owner_delete_removes_from_feed_and_cache() {
        let store = MemoryStore::new();
        let remote = MockRemote::with_reviews(vec![
            review("r2", "2024-01-02T00:00:00Z", 4, "u1"),
            review("r1", "2024-01-01T00:00:00Z", 3, ""),
        ]);
        let (coordinator, _monitor) = coordinator(&remote, &store, true);
        coordinator.initialize().await;

        coordinator
            .delete(&ReviewId::from("r2"), &Identity::new("u1"))
            .await
            .unwrap();

        assert_eq!(ids(&coordinator.entries().await), vec!["r1"]);
        assert_eq!(ids(&ReviewCache::new(store).load()), vec!["r1"]);
        let remaining: Vec<String> = remote
            .reviews()
            .into_iter()
            .map(|review| review.id.to_string())
            .collect();
        assert_eq!(remaining, vec!["r1".to_string()]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn missing_review_reports_not_found() {
        let remote = MockRemote::new();
        let (coordinator, _monitor) = coordinator(&remote, &MemoryStore::new(), true);

        let error = coordinator
            .delete(&ReviewId::from("gone"), &Identity::new("u1"))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::NotFound(_)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn failing_storage_never_fails_operations() {
        let remote = MockRemote::with_reviews(vec![review("r1", "2024-01-01T00:00:00Z", 5, "")]);
        let coordinator = SyncCoordinator::new(
            remote,
            ReviewCache::new(UnavailableStore),
            ConnectivityMonitor::new(true),
        );

        assert_eq!(ids(&coordinator.entries().await), vec!["r1"]);
        coordinator
            .submit(&draft("Ana", 5, "works"), None, "1.0")
            .await
            .unwrap();
        assert!(coordinator.last_sync_at().is_none());
    }

    #[test]
    fn insert_sorted_keeps_newest_first() {
        let mut entries = vec![
            confirmed("r3", "2024-01-03T00:00:00Z", 5, ""),
            confirmed("r1", "2024-01-01T00:00:00Z", 5, ""),
        ];
        insert_sorted(&mut entries, confirmed("r2", "2024-01-02T00:00:00Z", 5, ""));
        insert_sorted(&mut entries, confirmed("r0", "2023-12-31T00:00:00Z", 5, ""));
        assert_eq!(ids(&entries), vec!["r3", "r2", "r1", "r0"]);
    }
}
