//! Sync phase of the review feed, as shown by clients.

/// Lifecycle of the review feed held by the sync coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncPhase {
    /// Nothing loaded yet
    Idle,
    /// Initial load in progress
    Loading,
    /// Feed available. `online` is false when the last fetch attempt failed or
    /// connectivity is down, even if the device itself reports a network.
    Ready { online: bool },
    /// Full refetch in flight
    Resyncing,
}

impl SyncPhase {
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// Whether the feed is currently showing authoritative remote data.
    pub const fn is_effectively_online(self) -> bool {
        matches!(self, Self::Ready { online: true })
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready { online: true } => "online",
            Self::Ready { online: false } => "offline",
            Self::Resyncing => "syncing",
        }
    }
}
