//! Shared value types for the telemetry pipeline
//!
//! Everything here is a small copy type that crosses stage boundaries:
//! the metric domain tag and the raw sample cell stored in the ring
//! buffers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Metric domain: which subsystem a sample describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Process/system health: uptime, error rates, API latency, resources
    System,
    /// Market data: prices, volumes, spreads, liquidity
    Market,
    /// Trading activity: fills, rejections, order latency, exposure
    Trading,
}

impl Domain {
    /// All domains in pipeline evaluation order.
    pub const ALL: [Domain; 3] = [Domain::System, Domain::Market, Domain::Trading];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Market => "market",
            Self::Trading => "trading",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw metric sample: one numeric observation at one instant.
///
/// Values are stored unvalidated; NaN and infinities can and do land here
/// when an upstream feed misbehaves. Downstream stages must tolerate them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub value: f64,
    pub timestamp_ms: u64,
}

impl Sample {
    pub fn new(value: f64, timestamp_ms: u64) -> Self {
        Self {
            value,
            timestamp_ms,
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_round_trip() {
        for domain in Domain::ALL {
            let json = serde_json::to_string(&domain).unwrap();
            let back: Domain = serde_json::from_str(&json).unwrap();
            assert_eq!(domain, back);
        }
    }

    #[test]
    fn test_domain_as_str() {
        assert_eq!(Domain::System.as_str(), "system");
        assert_eq!(Domain::Market.as_str(), "market");
        assert_eq!(Domain::Trading.as_str(), "trading");
    }

    #[test]
    fn test_now_ms_monotonic_enough() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
    }
}
