//! Shared observable state.
//!
//! Snapshots live behind [`parking_lot::RwLock`]; every write also publishes
//! the new snapshot on a broadcast channel so interested parties (UI bindings,
//! tests) can follow along without polling.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::domain::{ConnectionState, TrackingState};

/// Handle to the controller's observable state. Cheap to clone; all clones
/// share the same underlying snapshots and channels.
#[derive(Clone)]
pub struct StateHub {
    inner: Arc<StateHubInner>,
}

struct StateHubInner {
    connection: RwLock<ConnectionState>,
    tracking: RwLock<TrackingState>,
    connection_tx: broadcast::Sender<ConnectionState>,
    tracking_tx: broadcast::Sender<TrackingState>,
}

impl StateHub {
    /// Create a hub with both snapshots at their defaults.
    ///
    /// `capacity` bounds each broadcast channel; slow subscribers that fall
    /// more than `capacity` updates behind observe a lag error and resume
    /// from the newest update.
    pub fn new(capacity: usize) -> Self {
        let (connection_tx, _) = broadcast::channel(capacity);
        let (tracking_tx, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(StateHubInner {
                connection: RwLock::new(ConnectionState::default()),
                tracking: RwLock::new(TrackingState::default()),
                connection_tx,
                tracking_tx,
            }),
        }
    }

    /// Current connection snapshot.
    pub fn connection(&self) -> ConnectionState {
        self.inner.connection.read().clone()
    }

    /// Current tracking snapshot.
    pub fn tracking(&self) -> TrackingState {
        self.inner.tracking.read().clone()
    }

    /// Subscribe to connection snapshot updates.
    pub fn subscribe_connection(&self) -> broadcast::Receiver<ConnectionState> {
        self.inner.connection_tx.subscribe()
    }

    /// Subscribe to tracking snapshot updates.
    pub fn subscribe_tracking(&self) -> broadcast::Receiver<TrackingState> {
        self.inner.tracking_tx.subscribe()
    }

    pub(crate) fn set_connection(&self, next: ConnectionState) {
        *self.inner.connection.write() = next.clone();
        // A send error only means there are no subscribers right now.
        let _ = self.inner.connection_tx.send(next);
    }

    pub(crate) fn set_tracking(&self, next: TrackingState) {
        *self.inner.tracking.write() = next.clone();
        let _ = self.inner.tracking_tx.send(next);
    }

    /// Apply `apply` to the current tracking snapshot under the write lock,
    /// then publish the result. Fields the closure does not touch carry over.
    pub(crate) fn update_tracking(&self, apply: impl FnOnce(&mut TrackingState)) {
        let next = {
            let mut guard = self.inner.tracking.write();
            apply(&mut guard);
            guard.clone()
        };
        let _ = self.inner.tracking_tx.send(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_hub_starts_at_defaults() {
        let hub = StateHub::new(8);
        assert_eq!(hub.connection(), ConnectionState::default());
        assert_eq!(hub.tracking(), TrackingState::default());
    }

    #[test]
    fn test_set_connection_updates_snapshot() {
        let hub = StateHub::new(8);
        hub.set_connection(ConnectionState::established());
        assert!(hub.connection().connected);
    }

    #[tokio::test]
    async fn test_subscribers_see_each_update() {
        let hub = StateHub::new(8);
        let mut rx = hub.subscribe_tracking();

        hub.update_tracking(|s| {
            s.running = true;
            s.heart_rate = "64".to_string();
        });
        hub.set_tracking(TrackingState::default());

        let first = rx.recv().await.unwrap();
        assert!(first.running);
        assert_eq!(first.heart_rate, "64");

        let second = rx.recv().await.unwrap();
        assert_eq!(second, TrackingState::default());
    }

    #[test]
    fn test_update_preserves_untouched_fields() {
        let hub = StateHub::new(8);
        hub.update_tracking(|s| s.message = "low battery".to_string());
        hub.update_tracking(|s| s.heart_rate = "71".to_string());

        let snapshot = hub.tracking();
        assert_eq!(snapshot.message, "low battery");
        assert_eq!(snapshot.heart_rate, "71");
    }

    #[test]
    fn test_writes_without_subscribers_do_not_panic() {
        let hub = StateHub::new(1);
        hub.set_connection(ConnectionState::ended());
        hub.set_tracking(TrackingState::faulted("sensor failure"));
        assert!(hub.tracking().error);
    }
}
