//! The tracking controller: connection and session state machines plus the
//! periodic peer relay.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::domain::{
    format_heart_rate, ConnectionEvent, ConnectionState, TrackerEvent, TrackingState, HR_SENTINEL,
    MSG_TRACKING_UNAVAILABLE,
};
use crate::provider::{HealthConnectionProvider, HealthTrackerProvider};
use crate::relay::PeerSender;
use crate::state::StateHub;
use crate::ControllerConfig;

/// Drives the connection and tracking state machines and owns their tasks.
///
/// Cheap to clone; clones share state, providers, and task handles. All
/// commands are safe to call in any order and at any time: their bodies are
/// serialized, so concurrent calls never interleave.
#[derive(Clone)]
pub struct TrackingController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    state: StateHub,
    tracker: Arc<dyn HealthTrackerProvider>,
    connection: Arc<dyn HealthConnectionProvider>,
    sender: Arc<PeerSender>,
    tasks: Mutex<TaskHandles>,
    // Serializes command bodies; the task slots are only swapped while held.
    commands: AsyncMutex<()>,
}

#[derive(Default)]
struct TaskHandles {
    connection: Option<JoinHandle<()>>,
    session: Option<JoinHandle<()>>,
    relay: Option<JoinHandle<()>>,
}

/// How a session consumer came to an end.
enum SessionEnd {
    Graceful,
    Faulted(String),
}

impl TrackingController {
    /// Create a controller over the given collaborators.
    pub fn new(
        config: ControllerConfig,
        tracker: Arc<dyn HealthTrackerProvider>,
        connection: Arc<dyn HealthConnectionProvider>,
        sender: Arc<PeerSender>,
    ) -> Self {
        let state = StateHub::new(config.state_channel_capacity);
        Self {
            inner: Arc::new(ControllerInner {
                config,
                state,
                tracker,
                connection,
                sender,
                tasks: Mutex::new(TaskHandles::default()),
                commands: AsyncMutex::new(()),
            }),
        }
    }

    /// Current connection snapshot.
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.state.connection()
    }

    /// Current tracking snapshot.
    pub fn tracking_state(&self) -> TrackingState {
        self.inner.state.tracking()
    }

    /// Whether the service link is currently up.
    ///
    /// Convenience for activation hooks that bind only when not yet
    /// connected.
    pub fn is_connected(&self) -> bool {
        self.inner.state.connection().connected
    }

    /// Subscribe to connection snapshot updates.
    pub fn subscribe_connection(&self) -> broadcast::Receiver<ConnectionState> {
        self.inner.state.subscribe_connection()
    }

    /// Subscribe to tracking snapshot updates.
    pub fn subscribe_tracking(&self) -> broadcast::Receiver<TrackingState> {
        self.inner.state.subscribe_tracking()
    }

    /// Bind to the health tracking service and keep applying its lifecycle
    /// events for as long as the binding lives.
    ///
    /// Replaces any previous binding. Independent of the tracking session:
    /// stopping tracking leaves the binding in place.
    pub async fn set_up_tracking(&self) {
        let _guard = self.inner.commands.lock().await;

        let prior = self.inner.tasks.lock().connection.take();
        cancel(prior).await;

        let mut events = self.inner.connection.connect().await;
        let state = self.inner.state.clone();
        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                tracing::info!(event = event.event_type(), "Connection event");
                match event {
                    ConnectionEvent::Success => {
                        state.set_connection(ConnectionState::established());
                    }
                    ConnectionEvent::Failed { fault } => {
                        state.set_connection(ConnectionState::failed(fault));
                    }
                    ConnectionEvent::Ended => {
                        state.set_connection(ConnectionState::ended());
                    }
                }
            }
            tracing::debug!("Connection event stream closed");
        });
        self.inner.tasks.lock().connection = Some(handle);
    }

    /// Start a tracking session and the periodic peer relay.
    ///
    /// Any prior session and relay are fully canceled first, so at most one
    /// of each ever runs. When the hardware lacks the heart-rate capability
    /// the start is rejected through `TrackingState` and no session is
    /// created.
    pub async fn start_tracking(&self) {
        let _guard = self.inner.commands.lock().await;

        let (session, relay) = {
            let mut tasks = self.inner.tasks.lock();
            (tasks.session.take(), tasks.relay.take())
        };
        cancel(session).await;
        cancel(relay).await;

        if !self.inner.tracker.capabilities_available() {
            tracing::warn!("Heart-rate tracking capability missing, rejecting start");
            self.inner
                .state
                .set_tracking(TrackingState::faulted(MSG_TRACKING_UNAVAILABLE));
            return;
        }

        let session_id = Uuid::new_v4();
        tracing::info!(session = %session_id, "Starting tracking session");

        // Both handles are in their slots before the guard drops, so even a
        // session that ends immediately finds the relay handle to cancel.
        let relay_handle = self.spawn_relay(session_id);
        self.inner.tasks.lock().relay = Some(relay_handle);

        let events = self.inner.tracker.start_session().await;
        let session_handle = self.spawn_session(session_id, events);
        self.inner.tasks.lock().session = Some(session_handle);
    }

    /// Stop the session and relay and reset `TrackingState` to its defaults.
    ///
    /// Safe to call with nothing running. Both tasks are gone by the time
    /// this returns; a broadcast already in flight may still finish
    /// afterwards.
    pub async fn stop_tracking(&self) {
        let _guard = self.inner.commands.lock().await;

        if let Err(e) = self.inner.tracker.stop_session().await {
            tracing::warn!(error = %e, "Tracking service stop reported an error");
        }

        let (session, relay) = {
            let mut tasks = self.inner.tasks.lock();
            (tasks.session.take(), tasks.relay.take())
        };
        cancel(session).await;
        cancel(relay).await;

        self.inner.state.set_tracking(TrackingState::default());
        tracing::info!("Tracking stopped");
    }

    fn spawn_relay(&self, session_id: Uuid) -> JoinHandle<()> {
        let state = self.inner.state.clone();
        let sender = Arc::clone(&self.inner.sender);
        let interval = Duration::from_millis(self.inner.config.relay_interval_ms);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // After a stall: one late tick, then back on cadence, never a
            // catch-up burst of the same reading.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let heart_rate = state.tracking().heart_rate;
                if heart_rate == HR_SENTINEL {
                    tracing::trace!(session = %session_id, "No reading yet, skipping relay tick");
                    continue;
                }
                // Detached so a slow peer can never delay the next tick.
                let sender = Arc::clone(&sender);
                tokio::spawn(async move {
                    sender.broadcast(heart_rate.into_bytes()).await;
                });
            }
        })
    }

    fn spawn_session(
        &self,
        session_id: Uuid,
        mut events: mpsc::Receiver<TrackerEvent>,
    ) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            let outcome = loop {
                let event = match events.recv().await {
                    Some(event) => event,
                    // Stream vanished without a terminal event; treat it as
                    // a graceful end.
                    None => break SessionEnd::Graceful,
                };
                tracing::debug!(session = %session_id, event = event.event_type(), "Tracker event");
                match event {
                    TrackerEvent::Data(sample) => {
                        let heart_rate = format_heart_rate(sample.hr);
                        controller.inner.state.update_tracking(|s| {
                            s.running = true;
                            s.error = false;
                            s.heart_rate = heart_rate;
                            s.ibi = sample.ibi;
                        });
                    }
                    TrackerEvent::Warning { detail } => {
                        controller.inner.state.update_tracking(|s| {
                            s.error = false;
                            s.message = detail;
                        });
                    }
                    TrackerEvent::FlushCompleted => break SessionEnd::Graceful,
                    TrackerEvent::Error { detail } => break SessionEnd::Faulted(detail),
                }
            };
            controller.finish_session(session_id, outcome).await;
        })
    }

    /// Session-side full stop. The session consumer is already unwinding on
    /// its own, so only the relay needs cancelling here. Takes its turn on
    /// the command guard; an explicit stop that wins the race aborts this
    /// task while it is still waiting.
    async fn finish_session(&self, session_id: Uuid, outcome: SessionEnd) {
        let _guard = self.inner.commands.lock().await;

        let relay = self.inner.tasks.lock().relay.take();
        cancel(relay).await;

        if let Err(e) = self.inner.tracker.stop_session().await {
            tracing::warn!(error = %e, "Tracking service stop reported an error");
        }
        self.inner.state.set_tracking(TrackingState::default());

        match outcome {
            SessionEnd::Graceful => {
                tracing::info!(session = %session_id, "Tracking session ended");
            }
            SessionEnd::Faulted(detail) => {
                tracing::warn!(session = %session_id, detail = %detail, "Tracking session faulted");
                self.inner.state.set_tracking(TrackingState::faulted(detail));
            }
        }
    }
}

/// Abort a task and wait until it is actually gone.
async fn cancel(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        handle.abort();
        let _ = handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FaultInfo, MSG_CONNECTED, MSG_CONNECTION_FAILED};
    use crate::provider::{SimulatedConnectionProvider, SimulatedTrackerProvider};
    use crate::relay::NullPeerMessenger;

    fn test_controller(
        tracker: SimulatedTrackerProvider,
        connection: SimulatedConnectionProvider,
    ) -> TrackingController {
        TrackingController::new(
            ControllerConfig::default(),
            Arc::new(tracker),
            Arc::new(connection),
            Arc::new(PeerSender::new(Arc::new(NullPeerMessenger))),
        )
    }

    #[tokio::test]
    async fn test_start_rejected_without_capability() {
        let controller = test_controller(
            SimulatedTrackerProvider::without_capabilities(),
            SimulatedConnectionProvider::connecting(),
        );

        controller.start_tracking().await;

        let state = controller.tracking_state();
        assert!(!state.running);
        assert!(state.error);
        assert_eq!(state.message, MSG_TRACKING_UNAVAILABLE);

        let tasks = controller.inner.tasks.lock();
        assert!(tasks.session.is_none());
        assert!(tasks.relay.is_none());
    }

    #[tokio::test]
    async fn test_connection_success_updates_state() {
        let controller = test_controller(
            SimulatedTrackerProvider::default(),
            SimulatedConnectionProvider::connecting(),
        );

        let mut updates = controller.subscribe_connection();
        controller.set_up_tracking().await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        let update = updates.recv().await.unwrap();
        assert_eq!(update, ConnectionState::established());

        let state = controller.connection_state();
        assert!(state.connected);
        assert_eq!(state.message, MSG_CONNECTED);
        assert!(controller.is_connected());
    }

    #[tokio::test]
    async fn test_connection_failure_preserves_fault() {
        let fault = FaultInfo::new(4, "service unavailable", true);
        let controller = test_controller(
            SimulatedTrackerProvider::default(),
            SimulatedConnectionProvider::with_script(vec![ConnectionEvent::Failed {
                fault: fault.clone(),
            }]),
        );

        controller.set_up_tracking().await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        let state = controller.connection_state();
        assert!(!state.connected);
        assert_eq!(state.message, MSG_CONNECTION_FAILED);
        assert_eq!(state.fault, Some(fault));
    }

    #[tokio::test]
    async fn test_stop_without_start_is_harmless() {
        let controller = test_controller(
            SimulatedTrackerProvider::default(),
            SimulatedConnectionProvider::connecting(),
        );

        controller.stop_tracking().await;

        assert_eq!(controller.tracking_state(), TrackingState::default());
    }

    #[tokio::test]
    async fn test_stop_resets_tracking_state() {
        let controller = test_controller(
            SimulatedTrackerProvider::default(),
            SimulatedConnectionProvider::connecting(),
        );

        controller.inner.state.update_tracking(|s| {
            s.running = true;
            s.heart_rate = "88".to_string();
            s.ibi = vec![680, 700];
            s.message = "measuring".to_string();
        });

        controller.stop_tracking().await;

        assert_eq!(controller.tracking_state(), TrackingState::default());
    }

    #[tokio::test]
    async fn test_rejected_start_leaves_connection_state_alone() {
        let controller = test_controller(
            SimulatedTrackerProvider::without_capabilities(),
            SimulatedConnectionProvider::connecting(),
        );

        controller.set_up_tracking().await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        controller.start_tracking().await;

        assert!(controller.connection_state().connected);
        assert!(controller.tracking_state().error);
    }
}
