//! Connectivity observer.
//!
//! Munin does not probe the network itself — the host app feeds OS
//! reachability events into a [`Connectivity`] handle, and the request
//! coordinator and sync manager read from it. Transitions are broadcast
//! over a `tokio::sync::watch` channel, so any number of observers can
//! subscribe without the handle knowing about them.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Shared online/offline signal.
///
/// Cheaply cloneable; all clones observe the same state. Starts online —
/// hosts that boot without network should call
/// [`set_online(false)`](Connectivity::set_online) before first use.
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    /// Create a handle reporting online.
    pub fn new() -> Self {
        Self {
            tx: Arc::new(watch::channel(true).0),
        }
    }

    /// Record a reachability change. Subscribers are only woken on actual
    /// transitions; repeated reports of the same state are absorbed.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|state| {
            if *state == online {
                false
            } else {
                *state = online;
                true
            }
        });
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn is_offline(&self) -> bool {
        !self.is_online()
    }

    /// Subscribe to transitions. The receiver observes the current state
    /// immediately and every transition thereafter.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Transitions as a `Stream<Item = bool>`, for UI layers that consume
    /// streams rather than watch receivers.
    pub fn stream(&self) -> WatchStream<bool> {
        WatchStream::new(self.tx.subscribe())
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_online() {
        let conn = Connectivity::new();
        assert!(conn.is_online());
        assert!(!conn.is_offline());
    }

    #[test]
    fn clones_share_state() {
        let conn = Connectivity::new();
        let other = conn.clone();
        conn.set_online(false);
        assert!(other.is_offline());
    }

    #[tokio::test]
    async fn subscriber_sees_transitions() {
        let conn = Connectivity::new();
        let mut rx = conn.subscribe();
        conn.set_online(false);
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
    }

    #[tokio::test]
    async fn repeated_state_does_not_wake_subscribers() {
        let conn = Connectivity::new();
        let mut rx = conn.subscribe();
        rx.borrow_and_update();
        conn.set_online(true); // no transition
        assert!(!rx.has_changed().unwrap());
    }
}
