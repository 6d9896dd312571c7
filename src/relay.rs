//! Fan-out of the current reading to paired peer devices.
//!
//! Delivery is strictly best-effort: a peer that cannot be reached is logged
//! and skipped, and no delivery outcome ever feeds back into tracking state.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Logical channel path heart-rate payloads are addressed to.
pub const HEART_RATE_PATH: &str = "/heart_rate";

/// A reachable peer device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Stable identifier of the peer.
    pub id: String,
    /// Human-readable name, for logs and pairing UI.
    pub display_name: String,
}

impl Peer {
    /// Build a peer record.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Transport for device-to-device messages.
///
/// Implementations wrap a platform messaging client; [`NullPeerMessenger`]
/// ships for demos and tests.
#[async_trait]
pub trait PeerMessenger: Send + Sync {
    /// Peers currently reachable over the device-to-device channel.
    ///
    /// # Errors
    ///
    /// Returns an error when the platform cannot enumerate peers.
    async fn connected_peers(&self) -> Result<Vec<Peer>>;

    /// Deliver one payload to one peer on a logical channel path.
    ///
    /// # Errors
    ///
    /// Returns an error when delivery to this peer fails.
    async fn send_message(&self, peer: &Peer, path: &str, payload: &[u8]) -> Result<()>;
}

/// Messenger with no peers; every broadcast becomes a no-op.
pub struct NullPeerMessenger;

#[async_trait]
impl PeerMessenger for NullPeerMessenger {
    async fn connected_peers(&self) -> Result<Vec<Peer>> {
        Ok(Vec::new())
    }

    async fn send_message(&self, _peer: &Peer, _path: &str, _payload: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// Counters describing relay activity since construction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RelayStats {
    /// Broadcasts attempted, regardless of outcome.
    pub broadcasts: u64,
    /// Individual deliveries that succeeded.
    pub peers_reached: u64,
    /// Individual deliveries that failed.
    pub delivery_failures: u64,
    /// Broadcasts dropped because peers could not be enumerated.
    pub discovery_failures: u64,
    /// When the last broadcast attempt finished.
    pub last_broadcast_at: Option<DateTime<Utc>>,
}

/// Fans one payload out to every reachable peer.
pub struct PeerSender {
    messenger: Arc<dyn PeerMessenger>,
    path: String,
    stats: Mutex<RelayStats>,
}

impl PeerSender {
    /// Sender addressing the heart-rate channel.
    pub fn new(messenger: Arc<dyn PeerMessenger>) -> Self {
        Self::with_path(messenger, HEART_RATE_PATH)
    }

    /// Sender addressing a custom channel path.
    pub fn with_path(messenger: Arc<dyn PeerMessenger>, path: impl Into<String>) -> Self {
        Self {
            messenger,
            path: path.into(),
            stats: Mutex::new(RelayStats::default()),
        }
    }

    /// Channel path this sender addresses.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Relay activity counters.
    pub fn stats(&self) -> RelayStats {
        self.stats.lock().clone()
    }

    /// Deliver `payload` to every currently reachable peer.
    ///
    /// Failures are logged per peer and swallowed.
    pub async fn broadcast(&self, payload: Vec<u8>) {
        let peers = match self.messenger.connected_peers().await {
            Ok(peers) => peers,
            Err(e) => {
                tracing::warn!(error = %e, "Peer enumeration failed, dropping broadcast");
                self.stats.lock().discovery_failures += 1;
                return;
            }
        };

        if peers.is_empty() {
            tracing::trace!("No peers connected, nothing to relay");
        }

        for peer in &peers {
            match self.messenger.send_message(peer, &self.path, &payload).await {
                Ok(()) => {
                    tracing::debug!(
                        peer = %peer.id,
                        path = %self.path,
                        bytes = payload.len(),
                        "Relayed reading to peer"
                    );
                    self.stats.lock().peers_reached += 1;
                }
                Err(e) => {
                    tracing::warn!(peer = %peer.id, error = %e, "Failed to relay reading to peer");
                    self.stats.lock().delivery_failures += 1;
                }
            }
        }

        let mut stats = self.stats.lock();
        stats.broadcasts += 1;
        stats.last_broadcast_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeartlinkError;

    struct RecordingMessenger {
        peers: Vec<Peer>,
        fail_for: Option<String>,
        sent: Mutex<Vec<(String, String, Vec<u8>)>>,
    }

    impl RecordingMessenger {
        fn with_peers(peers: Vec<Peer>) -> Self {
            Self {
                peers,
                fail_for: None,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn failing_for(mut self, peer_id: &str) -> Self {
            self.fail_for = Some(peer_id.to_string());
            self
        }
    }

    #[async_trait]
    impl PeerMessenger for RecordingMessenger {
        async fn connected_peers(&self) -> Result<Vec<Peer>> {
            Ok(self.peers.clone())
        }

        async fn send_message(&self, peer: &Peer, path: &str, payload: &[u8]) -> Result<()> {
            if self.fail_for.as_deref() == Some(peer.id.as_str()) {
                return Err(HeartlinkError::Delivery {
                    peer: peer.id.clone(),
                    reason: "peer unreachable".to_string(),
                });
            }
            self.sent
                .lock()
                .push((peer.id.clone(), path.to_string(), payload.to_vec()));
            Ok(())
        }
    }

    fn test_peers() -> Vec<Peer> {
        vec![
            Peer::new("node-1", "Watch"),
            Peer::new("node-2", "Phone"),
        ]
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_peer() {
        let messenger = Arc::new(RecordingMessenger::with_peers(test_peers()));
        let sender = PeerSender::new(messenger.clone());

        sender.broadcast(b"72".to_vec()).await;

        let sent = messenger.sent.lock();
        assert_eq!(sent.len(), 2);
        for (_, path, payload) in sent.iter() {
            assert_eq!(path, HEART_RATE_PATH);
            assert_eq!(payload, b"72");
        }

        let stats = sender.stats();
        assert_eq!(stats.broadcasts, 1);
        assert_eq!(stats.peers_reached, 2);
        assert!(stats.last_broadcast_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_peer_does_not_block_the_rest() {
        let messenger =
            Arc::new(RecordingMessenger::with_peers(test_peers()).failing_for("node-1"));
        let sender = PeerSender::new(messenger.clone());

        sender.broadcast(b"68".to_vec()).await;

        let sent = messenger.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "node-2");

        let stats = sender.stats();
        assert_eq!(stats.broadcasts, 1);
        assert_eq!(stats.peers_reached, 1);
        assert_eq!(stats.delivery_failures, 1);
    }

    #[tokio::test]
    async fn test_discovery_failure_drops_broadcast() {
        struct BrokenMessenger;

        #[async_trait]
        impl PeerMessenger for BrokenMessenger {
            async fn connected_peers(&self) -> Result<Vec<Peer>> {
                Err(HeartlinkError::PeerDiscovery("radio off".to_string()))
            }

            async fn send_message(&self, _: &Peer, _: &str, _: &[u8]) -> Result<()> {
                unreachable!("no peers should be enumerated")
            }
        }

        let sender = PeerSender::new(Arc::new(BrokenMessenger));
        sender.broadcast(b"70".to_vec()).await;

        let stats = sender.stats();
        assert_eq!(stats.broadcasts, 0);
        assert_eq!(stats.discovery_failures, 1);
    }

    #[tokio::test]
    async fn test_null_messenger_is_a_quiet_no_op() {
        let sender = PeerSender::new(Arc::new(NullPeerMessenger));
        sender.broadcast(b"64".to_vec()).await;

        let stats = sender.stats();
        assert_eq!(stats.broadcasts, 1);
        assert_eq!(stats.peers_reached, 0);
    }

    #[test]
    fn test_custom_path() {
        let sender = PeerSender::with_path(Arc::new(NullPeerMessenger), "/spo2");
        assert_eq!(sender.path(), "/spo2");
    }
}
