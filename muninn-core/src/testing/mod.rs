//! Test helper utilities for pipeline tests
//!
//! Provides canned sample feeders and a scriptable transport mock used
//! across the stage and orchestrator tests.

use crate::core::{Domain, TransportError};
use crate::dissemination::{SubscriptionBatch, Transport};
use crate::store::MetricStore;

/// Feed a price/volume walk into the market domain.
pub fn feed_market_series(store: &MetricStore, prices: &[f64], volumes: &[f64], start_ms: u64) {
    for (i, &price) in prices.iter().enumerate() {
        store.append(Domain::Market, "price", price, start_ms + i as u64 * 1_000);
    }
    for (i, &volume) in volumes.iter().enumerate() {
        store.append(Domain::Market, "volume", volume, start_ms + i as u64 * 1_000);
    }
}

/// Feed a healthy baseline into all three domains.
pub fn feed_healthy_baseline(store: &MetricStore, samples: usize, start_ms: u64) {
    for i in 0..samples as u64 {
        let ts = start_ms + i * 1_000;
        store.append(Domain::System, "uptime", 1.0, ts);
        store.append(Domain::System, "error_rate", 0.01, ts);
        store.append(Domain::System, "api_latency", 50.0, ts);
        store.append(Domain::Market, "price", 100.0 + (i % 5) as f64, ts);
        store.append(Domain::Market, "volume", 50.0, ts);
        store.append(Domain::Market, "liquidity", 150_000.0, ts);
        store.append(Domain::Market, "spread", 0.01, ts);
        store.append(Domain::Market, "price_updates", 12.0, ts);
        store.append(Domain::Trading, "fill_rate", 0.95, ts);
        store.append(Domain::Trading, "rejection_rate", 0.01, ts);
        store.append(Domain::Trading, "order_latency", 80.0, ts);
        store.append(Domain::Trading, "exposure", 50_000.0, ts);
    }
}

/// Scriptable transport for failure-path tests.
pub struct MockTransport {
    fail_sends_remaining: u64,
    connect_fails: bool,
    pub sent: Vec<SubscriptionBatch>,
}

impl MockTransport {
    /// Every send and every reconnect attempt fails.
    pub fn always_down() -> Self {
        Self {
            fail_sends_remaining: u64::MAX,
            connect_fails: true,
            sent: Vec::new(),
        }
    }

    /// The first `n` sends fail; reconnects succeed.
    pub fn flaky(n: u64) -> Self {
        Self {
            fail_sends_remaining: n,
            connect_fails: false,
            sent: Vec::new(),
        }
    }

    /// Never fails.
    pub fn reliable() -> Self {
        Self::flaky(0)
    }
}

impl Transport for MockTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        if self.connect_fails {
            Err(TransportError::Disconnected)
        } else {
            Ok(())
        }
    }

    fn send(&mut self, batch: &SubscriptionBatch) -> Result<(), TransportError> {
        if self.fail_sends_remaining > 0 {
            self.fail_sends_remaining = self.fail_sends_remaining.saturating_sub(1);
            return Err(TransportError::SendFailed {
                reason: "mock outage".to_string(),
            });
        }
        self.sent.push(batch.clone());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.connect_fails
    }
}
