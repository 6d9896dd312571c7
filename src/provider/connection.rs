//! Seam to the health tracking service's connection lifecycle.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::ConnectionEvent;

/// Source of service-link lifecycle events.
///
/// Implementations wrap a device SDK binding; [`SimulatedConnectionProvider`]
/// ships for development off-device.
///
/// [`SimulatedConnectionProvider`]: crate::provider::SimulatedConnectionProvider
#[async_trait]
pub trait HealthConnectionProvider: Send + Sync {
    /// Bind to the health tracking service.
    ///
    /// Lifecycle events arrive on the returned channel for as long as the
    /// binding lives. Connection failures report [`ConnectionEvent::Failed`]
    /// in-stream rather than failing this call.
    async fn connect(&self) -> mpsc::Receiver<ConnectionEvent>;
}
