//! Heart-rate session state and the events a tracker session produces.

use serde::{Deserialize, Serialize};

/// Displayed and relayed while no valid heart-rate reading exists.
pub const HR_SENTINEL: &str = "-";

/// Status line shown when the hardware lacks heart-rate tracking.
pub const MSG_TRACKING_UNAVAILABLE: &str = "HR tracking not available";

/// One reading from the heart-rate sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateSample {
    /// Heart rate in beats per minute. Zero or negative means the sensor
    /// produced no valid value for this reading.
    pub hr: i32,
    /// Inter-beat intervals in milliseconds captured with this reading.
    pub ibi: Vec<i32>,
}

impl HeartRateSample {
    /// Build a sample.
    pub fn new(hr: i32, ibi: Vec<i32>) -> Self {
        Self { hr, ibi }
    }
}

/// Render a heart-rate value for display and relay.
///
/// Positive values render as their decimal digits; everything else collapses
/// to [`HR_SENTINEL`].
pub fn format_heart_rate(hr: i32) -> String {
    if hr > 0 {
        hr.to_string()
    } else {
        HR_SENTINEL.to_string()
    }
}

/// Events emitted by a running tracker session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerEvent {
    /// A new sensor reading.
    Data(HeartRateSample),
    /// The session finished draining buffered data and is done.
    FlushCompleted,
    /// The session failed and will produce no further readings.
    Error {
        /// Service-reported description of the failure.
        detail: String,
    },
    /// A non-fatal condition, e.g. poor skin contact.
    Warning {
        /// Service-reported description of the condition.
        detail: String,
    },
}

impl TrackerEvent {
    /// Short tag for logs and diagnostics.
    pub fn event_type(&self) -> &'static str {
        match self {
            TrackerEvent::Data(_) => "data",
            TrackerEvent::FlushCompleted => "flush_completed",
            TrackerEvent::Error { .. } => "error",
            TrackerEvent::Warning { .. } => "warning",
        }
    }
}

/// Observable snapshot of the tracking session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingState {
    /// Whether a session is currently producing readings.
    pub running: bool,
    /// Whether the session is in a terminal error condition.
    pub error: bool,
    /// Latest heart rate, rendered for display. [`HR_SENTINEL`] when absent.
    pub heart_rate: String,
    /// Inter-beat intervals from the latest reading, milliseconds.
    pub ibi: Vec<i32>,
    /// Latest status or diagnostic line. Empty when there is nothing to say.
    pub message: String,
}

impl Default for TrackingState {
    fn default() -> Self {
        Self {
            running: false,
            error: false,
            heart_rate: HR_SENTINEL.to_string(),
            ibi: Vec::new(),
            message: String::new(),
        }
    }
}

impl TrackingState {
    /// Terminal error snapshot: everything at defaults except the error flag
    /// and its explanation.
    pub fn faulted(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_idle_with_sentinel() {
        let state = TrackingState::default();
        assert!(!state.running);
        assert!(!state.error);
        assert_eq!(state.heart_rate, HR_SENTINEL);
        assert!(state.ibi.is_empty());
        assert!(state.message.is_empty());
    }

    #[test]
    fn test_faulted_keeps_defaults_except_error() {
        let state = TrackingState::faulted(MSG_TRACKING_UNAVAILABLE);
        assert!(!state.running);
        assert!(state.error);
        assert_eq!(state.heart_rate, HR_SENTINEL);
        assert!(state.ibi.is_empty());
        assert_eq!(state.message, MSG_TRACKING_UNAVAILABLE);
    }

    #[test]
    fn test_format_positive_heart_rate() {
        assert_eq!(format_heart_rate(72), "72");
        assert_eq!(format_heart_rate(1), "1");
        assert_eq!(format_heart_rate(183), "183");
    }

    #[test]
    fn test_format_invalid_heart_rate_collapses_to_sentinel() {
        assert_eq!(format_heart_rate(0), HR_SENTINEL);
        assert_eq!(format_heart_rate(-5), HR_SENTINEL);
    }

    #[test]
    fn test_event_type_tags() {
        assert_eq!(
            TrackerEvent::Data(HeartRateSample::new(72, vec![833])).event_type(),
            "data"
        );
        assert_eq!(TrackerEvent::FlushCompleted.event_type(), "flush_completed");
        assert_eq!(
            TrackerEvent::Error {
                detail: "sensor failure".to_string()
            }
            .event_type(),
            "error"
        );
        assert_eq!(
            TrackerEvent::Warning {
                detail: "wear the device snugly".to_string()
            }
            .event_type(),
            "warning"
        );
    }
}
