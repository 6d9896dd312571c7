//! Domain types shared across the crate: connection and tracking state
//! snapshots plus the event streams that drive them.

pub mod connection;
pub mod tracking;

pub use connection::{
    ConnectionEvent, ConnectionState, FaultInfo, MSG_CONNECTED, MSG_CONNECTION_ENDED,
    MSG_CONNECTION_FAILED,
};
pub use tracking::{
    format_heart_rate, HeartRateSample, TrackerEvent, TrackingState, HR_SENTINEL,
    MSG_TRACKING_UNAVAILABLE,
};
