//! Dissemination layer: decouples computation cadence from delivery
//!
//! On each tick the orchestrator hands the latest per-domain snapshots to
//! the disseminator, which records them in a bounded outgoing buffer,
//! fans them out to in-process subscribers, and forwards them through the
//! external [`Transport`]. Transport failures trigger the reconnect
//! policy; an exhausted budget parks the connection in `Failed`, which
//! the status surface reports until the transport is manually reset.

pub mod reconnect;
pub mod transport;

pub use reconnect::{ConnectionState, ReconnectPolicy, ReconnectStats};
pub use transport::{Channel, ChannelTransport, SubscriptionBatch, Transport};

use crate::config::DisseminationConfig;
use crate::core::TransportError;
use crate::pipeline::{AnalysisResult, CompositeScore, ValidationResult};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Delivery statistics for the status surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisseminationStats {
    pub batches_published: u64,
    pub send_failures: u64,
    pub reconnects: ReconnectStats,
}

/// A filtered view of the dissemination stream.
pub struct Subscription {
    rx: broadcast::Receiver<SubscriptionBatch>,
    channels: HashSet<Channel>,
}

impl Subscription {
    /// Wrap a raw broadcast receiver with a channel filter. An empty
    /// channel set subscribes to everything.
    pub fn new(rx: broadcast::Receiver<SubscriptionBatch>, channels: &[Channel]) -> Self {
        let channels: HashSet<Channel> = if channels.is_empty() {
            Channel::ALL.into_iter().collect()
        } else {
            channels.iter().copied().collect()
        };
        Self { rx, channels }
    }

    /// Next batch on one of the subscribed channels. `None` once the
    /// disseminator is gone. Batches missed while lagging are skipped.
    pub async fn recv(&mut self) -> Option<SubscriptionBatch> {
        loop {
            match self.rx.recv().await {
                Ok(batch) if self.channels.contains(&batch.channel) => return Some(batch),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Batches one tick's outputs and fans them out.
pub struct Disseminator<T: Transport> {
    transport: T,
    policy: ReconnectPolicy,
    state: ConnectionState,
    history: VecDeque<SubscriptionBatch>,
    history_cap: usize,
    subscribers: broadcast::Sender<SubscriptionBatch>,
    stats: DisseminationStats,
}

impl<T: Transport> Disseminator<T> {
    pub fn new(transport: T, cfg: &DisseminationConfig) -> Self {
        let (subscribers, _) = broadcast::channel(cfg.channel_capacity.max(1));
        Self {
            transport,
            policy: ReconnectPolicy::new(
                Duration::from_millis(cfg.reconnect_delay_ms),
                cfg.jitter_factor,
                cfg.max_reconnect_attempts,
            ),
            state: ConnectionState::Connected,
            history: VecDeque::new(),
            history_cap: cfg.batch_history_cap.max(1),
            subscribers,
            stats: DisseminationStats::default(),
        }
    }

    /// Subscribe to a set of channels. An empty set subscribes to all.
    pub fn subscribe(&self, channels: &[Channel]) -> Subscription {
        Subscription::new(self.subscribers.subscribe(), channels)
    }

    /// Handle for creating subscriptions without holding the disseminator.
    pub fn subscriber_sender(&self) -> broadcast::Sender<SubscriptionBatch> {
        self.subscribers.clone()
    }

    /// Publish one tick's batches.
    ///
    /// In-process subscribers always receive the batches; the external
    /// transport may be mid-reconnect, in which case this tick's batches
    /// are dropped for it (they are ephemeral snapshots and the next tick
    /// supersedes them).
    pub async fn publish(
        &mut self,
        batches: Vec<SubscriptionBatch>,
    ) -> Result<(), TransportError> {
        for batch in &batches {
            self.history.push_back(batch.clone());
            while self.history.len() > self.history_cap {
                self.history.pop_front();
            }
            // No subscribers is fine; delivery is independent of consumers.
            let _ = self.subscribers.send(batch.clone());
        }

        if self.state == ConnectionState::Failed {
            return Err(TransportError::ReconnectExhausted {
                attempts: self.policy.max_attempts(),
            });
        }

        for batch in &batches {
            if let Err(e) = self.transport.send(batch) {
                warn!("transport send failed: {}", e);
                self.stats.send_failures += 1;
                self.state = ConnectionState::Reconnecting;
                self.reconnect().await?;
                // Remaining batches of this tick are dropped; the next
                // tick publishes fresh snapshots.
                break;
            }
            self.stats.batches_published += 1;
        }

        Ok(())
    }

    /// Retry the connection on the fixed-delay budget.
    async fn reconnect(&mut self) -> Result<(), TransportError> {
        while let Some(delay) = self.policy.next_delay() {
            self.stats.reconnects.attempts += 1;
            tokio::time::sleep(delay).await;

            match self.transport.connect() {
                Ok(()) => {
                    info!(
                        "transport reconnected (attempt #{})",
                        self.policy.attempt_number()
                    );
                    self.state = ConnectionState::Connected;
                    self.stats.reconnects.successes += 1;
                    self.policy.reset();
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "reconnect attempt #{} failed: {}",
                        self.policy.attempt_number(),
                        e
                    );
                    self.stats.reconnects.failures += 1;
                }
            }
        }

        self.state = ConnectionState::Failed;
        Err(TransportError::ReconnectExhausted {
            attempts: self.policy.max_attempts(),
        })
    }

    /// Clear a failed state and retry immediately (manual recovery).
    pub async fn reset_transport(&mut self) -> Result<(), TransportError> {
        self.policy.reset();
        self.state = ConnectionState::Reconnecting;
        self.reconnect().await
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn stats(&self) -> DisseminationStats {
        self.stats
    }

    /// Current outgoing buffer, oldest first.
    pub fn history(&self) -> Vec<SubscriptionBatch> {
        self.history.iter().cloned().collect()
    }
}

/// Assemble one tick's outgoing batches from the stage outputs.
pub fn batches_for_tick(
    scores: &[CompositeScore],
    analysis: Option<&AnalysisResult>,
    validation: Option<&ValidationResult>,
    timestamp_ms: u64,
) -> Vec<SubscriptionBatch> {
    let mut batches = Vec::with_capacity(scores.len() + 2);

    for score in scores {
        if let Ok(payload) = serde_json::to_value(score) {
            batches.push(SubscriptionBatch {
                channel: Channel::for_domain(score.domain),
                payload,
                timestamp_ms,
            });
        }
    }

    if let Some(analysis) = analysis {
        if let Ok(payload) = serde_json::to_value(analysis) {
            batches.push(SubscriptionBatch {
                channel: Channel::Analysis,
                payload,
                timestamp_ms,
            });
        }
    }

    if let Some(validation) = validation {
        if let Ok(payload) = serde_json::to_value(validation) {
            batches.push(SubscriptionBatch {
                channel: Channel::Validation,
                payload,
                timestamp_ms,
            });
        }
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Domain;
    use crate::testing::MockTransport;

    fn test_config() -> DisseminationConfig {
        DisseminationConfig {
            batch_history_cap: 5,
            reconnect_delay_ms: 1,
            max_reconnect_attempts: 3,
            jitter_factor: 0.0,
            channel_capacity: 16,
        }
    }

    fn batch(channel: Channel, ts: u64) -> SubscriptionBatch {
        SubscriptionBatch {
            channel,
            payload: serde_json::json!({"tick": ts}),
            timestamp_ms: ts,
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let mut diss = Disseminator::new(ChannelTransport::new(16), &test_config());
        let mut sub = diss.subscribe(&[Channel::Market]);

        diss.publish(vec![batch(Channel::System, 1), batch(Channel::Market, 1)])
            .await
            .unwrap();

        // The market subscriber sees only its channel.
        let received = sub.recv().await.unwrap();
        assert_eq!(received.channel, Channel::Market);
    }

    #[tokio::test]
    async fn test_empty_channel_set_subscribes_all() {
        let mut diss = Disseminator::new(ChannelTransport::new(16), &test_config());
        let mut sub = diss.subscribe(&[]);

        diss.publish(vec![batch(Channel::Validation, 7)]).await.unwrap();
        assert_eq!(sub.recv().await.unwrap().channel, Channel::Validation);
    }

    #[tokio::test]
    async fn test_history_capped() {
        let mut diss = Disseminator::new(ChannelTransport::new(16), &test_config());

        for tick in 0..20u64 {
            diss.publish(vec![batch(Channel::System, tick)]).await.unwrap();
        }

        let history = diss.history();
        assert_eq!(history.len(), 5);
        assert_eq!(history.last().unwrap().timestamp_ms, 19);
    }

    #[tokio::test]
    async fn test_disconnect_retries_then_fails() {
        // Transport that fails every send and every reconnect.
        let transport = MockTransport::always_down();
        let mut diss = Disseminator::new(transport, &test_config());

        let err = diss
            .publish(vec![batch(Channel::System, 1)])
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::ReconnectExhausted { attempts: 3 });
        assert_eq!(diss.state(), ConnectionState::Failed);
        assert_eq!(diss.stats().reconnects.attempts, 3);

        // Once failed, publishing keeps surfacing the persistent error.
        let err = diss
            .publish(vec![batch(Channel::System, 2)])
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ReconnectExhausted { .. }));
    }

    #[tokio::test]
    async fn test_reconnect_recovers_after_transient_outage() {
        // Fails the first send, then accepts the reconnect.
        let transport = MockTransport::flaky(1);
        let mut diss = Disseminator::new(transport, &test_config());

        diss.publish(vec![batch(Channel::System, 1)]).await.unwrap();
        assert_eq!(diss.state(), ConnectionState::Connected);
        assert_eq!(diss.stats().reconnects.successes, 1);

        // Subsequent publishes deliver normally.
        diss.publish(vec![batch(Channel::System, 2)]).await.unwrap();
        assert!(diss.stats().batches_published >= 1);
    }

    #[tokio::test]
    async fn test_reset_transport_recovers_failed_state() {
        let transport = MockTransport::flaky(1);
        let mut diss = Disseminator::new(transport, &test_config());
        diss.state = ConnectionState::Failed;

        diss.reset_transport().await.unwrap();
        assert_eq!(diss.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_batches_for_tick_layout() {
        let scores = [CompositeScore {
            domain: Domain::Market,
            health_score: 0.8,
            performance_score: 0.9,
            resource_score: 0.7,
            timestamp_ms: 5,
        }];

        let batches = batches_for_tick(&scores, None, None, 5);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].channel, Channel::Market);
        assert_eq!(batches[0].payload["health_score"], 0.8);
    }
}
