//! Seam to the device's heart-rate tracking capability.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::TrackerEvent;
use crate::Result;

/// Source of heart-rate tracking sessions.
///
/// Implementations wrap a device SDK; [`SimulatedTrackerProvider`] ships for
/// development off-device.
///
/// [`SimulatedTrackerProvider`]: crate::provider::SimulatedTrackerProvider
#[async_trait]
pub trait HealthTrackerProvider: Send + Sync {
    /// Whether the device exposes heart-rate tracking at all.
    ///
    /// Checked before every session start; a `false` answer means no session
    /// is created.
    fn capabilities_available(&self) -> bool;

    /// Begin a tracking session.
    ///
    /// Session events arrive on the returned channel. A session that fails to
    /// start reports [`TrackerEvent::Error`] in-stream rather than failing
    /// this call. Closing the channel without a terminal event counts as a
    /// graceful end.
    async fn start_session(&self) -> mpsc::Receiver<TrackerEvent>;

    /// Tear the session down on the service side.
    ///
    /// Must tolerate being called with no session running.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying service rejects the teardown.
    /// Callers treat this as diagnostic only.
    async fn stop_session(&self) -> Result<()>;
}
