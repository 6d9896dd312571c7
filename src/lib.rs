//! # Heartlink
//!
//! Core logic for a wearable heart-rate companion app: a connection state
//! machine for the on-device health tracking service, a tracking session
//! state machine fed by sensor events, and a fixed-interval relay that
//! forwards the current reading to paired peer devices.
//!
//! The crate is UI-free. A frontend issues commands on
//! [`TrackingController`] and renders the [`ConnectionState`] and
//! [`TrackingState`] snapshots it observes; platform specifics stay behind
//! the provider and messenger traits.
//!
//! ## Architecture
//!
//! - [`domain`]: state snapshots and the event types that drive them
//! - [`provider`]: seams to the device platform, plus simulated stand-ins
//! - [`relay`]: best-effort fan-out of readings to peers
//! - [`state`]: shared snapshots with broadcast change notification
//! - [`controller`]: the command surface tying it all together
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use heartlink::{
//!     ControllerConfig, NullPeerMessenger, PeerSender, SimulatedConnectionProvider,
//!     SimulatedTrackerProvider, TrackingController,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let controller = TrackingController::new(
//!         ControllerConfig::default(),
//!         Arc::new(SimulatedTrackerProvider::default()),
//!         Arc::new(SimulatedConnectionProvider::connecting()),
//!         Arc::new(PeerSender::new(Arc::new(NullPeerMessenger))),
//!     );
//!
//!     controller.set_up_tracking().await;
//!     controller.start_tracking().await;
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(3)).await;
//!     println!("heart rate: {}", controller.tracking_state().heart_rate);
//!
//!     controller.stop_tracking().await;
//! }
//! ```

#![warn(missing_docs)]

pub mod controller;
pub mod domain;
pub mod provider;
pub mod relay;
pub mod state;

pub use controller::TrackingController;
pub use domain::{
    format_heart_rate, ConnectionEvent, ConnectionState, FaultInfo, HeartRateSample, TrackerEvent,
    TrackingState, HR_SENTINEL, MSG_CONNECTED, MSG_CONNECTION_ENDED, MSG_CONNECTION_FAILED,
    MSG_TRACKING_UNAVAILABLE,
};
pub use provider::{
    HealthConnectionProvider, HealthTrackerProvider, SimulatedConnectionProvider,
    SimulatedTrackerConfig, SimulatedTrackerProvider,
};
pub use relay::{NullPeerMessenger, Peer, PeerMessenger, PeerSender, RelayStats, HEART_RATE_PATH};
pub use state::StateHub;

use thiserror::Error;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const MIN_RELAY_INTERVAL_MS: u64 = 10;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, HeartlinkError>;

/// Errors surfaced by the platform seams.
///
/// Controller commands never return these; failures inside the state
/// machines are reported through the state snapshots instead.
#[derive(Error, Debug)]
pub enum HeartlinkError {
    /// Peers could not be enumerated.
    #[error("Peer discovery error: {0}")]
    PeerDiscovery(String),

    /// Delivery to one peer failed.
    #[error("Delivery to peer {peer} failed: {reason}")]
    Delivery {
        /// Identifier of the unreachable peer.
        peer: String,
        /// What the transport reported.
        reason: String,
    },

    /// The device tracking service rejected a request.
    #[error("Tracking service error: {0}")]
    Tracker(String),
}

/// Tuning knobs for [`TrackingController`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Gap between relay ticks, milliseconds.
    pub relay_interval_ms: u64,
    /// Capacity of each state notification channel.
    pub state_channel_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            relay_interval_ms: 1000,
            state_channel_capacity: 32,
        }
    }
}

impl ControllerConfig {
    /// Start building a config from the defaults.
    pub fn builder() -> ControllerConfigBuilder {
        ControllerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ControllerConfig`].
pub struct ControllerConfigBuilder {
    config: ControllerConfig,
}

impl ControllerConfigBuilder {
    /// Gap between relay ticks, clamped to at least 10 ms.
    pub fn relay_interval_ms(mut self, interval_ms: u64) -> Self {
        self.config.relay_interval_ms = interval_ms.max(MIN_RELAY_INTERVAL_MS);
        self
    }

    /// Capacity of each state notification channel, at least 1.
    pub fn state_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.state_channel_capacity = capacity.max(1);
        self
    }

    /// Finish building.
    pub fn build(self) -> ControllerConfig {
        self.config
    }
}

/// Common imports for working with the crate.
pub mod prelude {
    pub use crate::controller::TrackingController;
    pub use crate::domain::{
        ConnectionEvent, ConnectionState, FaultInfo, HeartRateSample, TrackerEvent, TrackingState,
    };
    pub use crate::provider::{HealthConnectionProvider, HealthTrackerProvider};
    pub use crate::relay::{Peer, PeerMessenger, PeerSender};
    pub use crate::{ControllerConfig, HeartlinkError, Result};
}
