//! Connection lifecycle of the link to the on-device health tracking service.

use serde::{Deserialize, Serialize};

/// Status line shown once the service link is up.
pub const MSG_CONNECTED: &str = "Connected to Health Tracking Service";

/// Status line shown when establishing the link failed.
pub const MSG_CONNECTION_FAILED: &str = "Connection failed";

/// Status line shown when an established link was torn down.
pub const MSG_CONNECTION_ENDED: &str = "Connection ended";

/// Structured description of a connection failure, carried alongside the
/// human-readable status so callers can drive resolution flows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultInfo {
    /// Service-defined error code.
    pub code: i32,
    /// Short description of the failure.
    pub message: String,
    /// Whether the service offers a resolution flow for this fault.
    pub resolvable: bool,
}

impl FaultInfo {
    /// Build a fault record.
    pub fn new(code: i32, message: impl Into<String>, resolvable: bool) -> Self {
        Self {
            code,
            message: message.into(),
            resolvable,
        }
    }
}

/// Lifecycle events emitted by the service link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionEvent {
    /// The link is established and usable.
    Success,
    /// Establishing the link failed.
    Failed {
        /// What went wrong, as reported by the service.
        fault: FaultInfo,
    },
    /// A previously established link was closed.
    Ended,
}

impl ConnectionEvent {
    /// Short tag for logs and diagnostics.
    pub fn event_type(&self) -> &'static str {
        match self {
            ConnectionEvent::Success => "success",
            ConnectionEvent::Failed { .. } => "failed",
            ConnectionEvent::Ended => "ended",
        }
    }
}

/// Observable snapshot of the service link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    /// Whether the link is currently usable.
    pub connected: bool,
    /// Human-readable status line.
    pub message: String,
    /// Failure details, present only after a failed connection attempt.
    pub fault: Option<FaultInfo>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            connected: false,
            message: String::new(),
            fault: None,
        }
    }
}

impl ConnectionState {
    /// Snapshot after the link came up.
    pub fn established() -> Self {
        Self {
            connected: true,
            message: MSG_CONNECTED.to_string(),
            fault: None,
        }
    }

    /// Snapshot after a connection attempt failed.
    pub fn failed(fault: FaultInfo) -> Self {
        Self {
            connected: false,
            message: MSG_CONNECTION_FAILED.to_string(),
            fault: Some(fault),
        }
    }

    /// Snapshot after an established link was closed.
    pub fn ended() -> Self {
        Self {
            connected: false,
            message: MSG_CONNECTION_ENDED.to_string(),
            fault: None,
        }
    }
}
