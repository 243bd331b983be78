//! Error taxonomy for the telemetry pipeline
//!
//! Three failure classes with different handling policies:
//! - [`IngestError`]: a malformed sample at the API boundary. Logged and
//!   dropped; never reaches the store.
//! - [`ComputeError`]: a stage produced an unusable result for this tick.
//!   The orchestrator records it and reuses the stage's previous output;
//!   the next tick runs normally.
//! - [`TransportError`]: the dissemination channel failed. Triggers the
//!   reconnect policy; exhausted retries surface as a persistent failed
//!   state, not a crash.

use super::types::Domain;
use thiserror::Error;

/// A sample rejected at the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("empty metric name for domain {domain}")]
    EmptyMetricName { domain: Domain },

    #[error("invalid timestamp {timestamp_ms} for {domain}.{metric}")]
    InvalidTimestamp {
        domain: Domain,
        metric: String,
        timestamp_ms: u64,
    },
}

/// A stage failed to produce usable output for the current tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputeError {
    #[error("{stage} produced non-finite {field}: {value}")]
    NonFiniteResult {
        stage: &'static str,
        field: &'static str,
        value: f64,
    },
}

/// A dissemination transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport disconnected")]
    Disconnected,

    #[error("transport send failed: {reason}")]
    SendFailed { reason: String },

    #[error("reconnect attempts exhausted after {attempts} tries")]
    ReconnectExhausted { attempts: u32 },
}
