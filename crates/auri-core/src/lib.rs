//! auri-core - Core library for Auri reviews
//!
//! This crate contains the review models, the local persistence layer, the
//! remote store/auth contracts (plus the Appwrite adapter), and the sync
//! coordinator behind the `ReviewService` facade used by every Auri client.

pub mod cache;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod session;
pub mod state;
pub mod storage;
pub mod sync;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{AppwriteConfig, ClientConfig};
pub use connectivity::{ConnectivityMonitor, Transition};
pub use error::{Error, ErrorKind, Result};
pub use models::{
    Identity, Rating, RatingSummary, Review, ReviewEntry, ReviewId, ReviewInput, ReviewPatch,
    Session,
};
pub use remote::AppwriteClient;
pub use services::{ReviewService, SessionStatus};
pub use state::SyncPhase;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use sync::ResyncOutcome;
