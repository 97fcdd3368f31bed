//! Network reachability signal.
//!
//! The monitor only observes: it records the latest online flag and hands out
//! transition events. Reacting to them is the sync coordinator's job.

use std::sync::Arc;

use tokio::sync::watch;

/// A change of the online flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// offline -> online
    CameOnline,
    /// online -> offline
    WentOffline,
}

impl Transition {
    const fn to(online: bool) -> Self {
        if online {
            Self::CameOnline
        } else {
            Self::WentOffline
        }
    }
}

/// Something that can tell whether the backend is reachable right now.
#[allow(async_fn_in_trait)]
pub trait ReachabilityProbe {
    async fn is_reachable(&self) -> bool;
}

/// Current online flag plus a stream of transitions. Clones share state.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    sender: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    pub fn new(online: bool) -> Self {
        let (sender, _receiver) = watch::channel(online);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    /// Record the latest reachability report.
    ///
    /// Returns the transition this report caused, or `None` when the flag did
    /// not change.
    pub fn set_online(&self, online: bool) -> Option<Transition> {
        let mut transition = None;
        self.sender.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                transition = Some(Transition::to(online));
                true
            }
        });
        if let Some(transition) = transition {
            tracing::debug!("Connectivity transition: {:?}", transition);
        }
        transition
    }

    /// Ask `probe` and record the answer.
    pub async fn refresh_from(&self, probe: &impl ReachabilityProbe) -> Option<Transition> {
        let reachable = probe.is_reachable().await;
        self.set_online(reachable)
    }

    pub fn subscribe(&self) -> ConnectivityEvents {
        let receiver = self.sender.subscribe();
        let last = *receiver.borrow();
        ConnectivityEvents { receiver, last }
    }
}

/// Receiver side of [`ConnectivityMonitor::subscribe`].
#[derive(Debug)]
pub struct ConnectivityEvents {
    receiver: watch::Receiver<bool>,
    last: bool,
}

impl ConnectivityEvents {
    /// Wait for the next transition.
    ///
    /// Flapping that ends where it started between two polls yields nothing.
    /// Returns `None` once every monitor handle has been dropped.
    pub async fn next_transition(&mut self) -> Option<Transition> {
        loop {
            self.receiver.changed().await.ok()?;
            let online = *self.receiver.borrow_and_update();
            if online != self.last {
                self.last = online;
                return Some(Transition::to(online));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe(bool);

    impl ReachabilityProbe for FixedProbe {
        async fn is_reachable(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn set_online_reports_only_real_changes() {
        let monitor = ConnectivityMonitor::new(false);
        assert_eq!(monitor.set_online(false), None);
        assert_eq!(monitor.set_online(true), Some(Transition::CameOnline));
        assert_eq!(monitor.set_online(true), None);
        assert!(monitor.is_online());
        assert_eq!(monitor.set_online(false), Some(Transition::WentOffline));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn subscribers_receive_each_transition_once() {
        let monitor = ConnectivityMonitor::new(false);
        let mut events = monitor.subscribe();

        monitor.set_online(true);
        assert_eq!(events.next_transition().await, Some(Transition::CameOnline));

        monitor.set_online(false);
        assert_eq!(events.next_transition().await, Some(Transition::WentOffline));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn flapping_back_to_start_is_coalesced() {
        let monitor = ConnectivityMonitor::new(false);
        let mut events = monitor.subscribe();

        monitor.set_online(true);
        monitor.set_online(false);
        monitor.set_online(true);
        assert_eq!(events.next_transition().await, Some(Transition::CameOnline));

        drop(monitor);
        assert_eq!(events.next_transition().await, None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn refresh_from_probe_updates_flag() {
        let monitor = ConnectivityMonitor::new(false);
        assert_eq!(
            monitor.refresh_from(&FixedProbe(true)).await,
            Some(Transition::CameOnline)
        );
        assert!(monitor.is_online());
    }
}
