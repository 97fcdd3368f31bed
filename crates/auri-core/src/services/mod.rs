//! Client-facing services shared by every Auri frontend.

mod review;

pub use review::{ReviewService, SessionStatus};
