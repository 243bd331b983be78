//! Transport seam between the pipeline and its consumers
//!
//! The disseminator pushes every outgoing batch through a [`Transport`].
//! The default [`ChannelTransport`] fans out over a tokio broadcast
//! channel and never loses the connection; a real deployment substitutes
//! a WebSocket-backed implementation behind the same trait, and tests
//! substitute a scriptable mock.

use crate::core::{Domain, TransportError};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Named dissemination channel a subscriber can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    System,
    Market,
    Trading,
    Analysis,
    Validation,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::System,
        Channel::Market,
        Channel::Trading,
        Channel::Analysis,
        Channel::Validation,
    ];

    pub fn for_domain(domain: Domain) -> Self {
        match domain {
            Domain::System => Channel::System,
            Domain::Market => Channel::Market,
            Domain::Trading => Channel::Trading,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Market => "market",
            Self::Trading => "trading",
            Self::Analysis => "analysis",
            Self::Validation => "validation",
        }
    }
}

/// One outgoing snapshot, ready for fan-out. Ephemeral: retained only in
/// the disseminator's bounded buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionBatch {
    pub channel: Channel,
    pub payload: serde_json::Value,
    pub timestamp_ms: u64,
}

/// Outbound delivery seam.
pub trait Transport: Send {
    /// (Re)establish the connection.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Deliver one batch.
    fn send(&mut self, batch: &SubscriptionBatch) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;
}

/// In-process transport over a tokio broadcast channel.
///
/// Delivery is independent of the consumer count: sending with no
/// receivers is a no-op, not an error.
pub struct ChannelTransport {
    tx: broadcast::Sender<SubscriptionBatch>,
}

impl ChannelTransport {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SubscriptionBatch> {
        self.tx.subscribe()
    }
}

impl Transport for ChannelTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn send(&mut self, batch: &SubscriptionBatch) -> Result<(), TransportError> {
        // SendError here only means no receiver is currently subscribed.
        let _ = self.tx.send(batch.clone());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(channel: Channel) -> SubscriptionBatch {
        SubscriptionBatch {
            channel,
            payload: serde_json::json!({"health_score": 0.9}),
            timestamp_ms: 1,
        }
    }

    #[test]
    fn test_channel_for_domain() {
        assert_eq!(Channel::for_domain(Domain::Market), Channel::Market);
        assert_eq!(Channel::for_domain(Domain::System), Channel::System);
    }

    #[tokio::test]
    async fn test_channel_transport_delivers() {
        let mut transport = ChannelTransport::new(8);
        let mut rx = transport.subscribe();

        transport.send(&batch(Channel::Market)).unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.channel, Channel::Market);
    }

    #[test]
    fn test_send_without_receivers_is_ok() {
        let mut transport = ChannelTransport::new(8);
        assert!(transport.send(&batch(Channel::Analysis)).is_ok());
        assert!(transport.is_connected());
    }
}
