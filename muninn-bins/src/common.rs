//! Common utilities for all binaries
//!
//! Shared initialization, CLI parsing, and setup code.

use anyhow::{Context, Result};
use clap::Parser;
use muninn_core::prelude::*;
use serde::Deserialize;
use std::path::PathBuf;

/// Common CLI arguments for all binaries
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CommonArgs {
    /// Path to a JSON configuration file (defaults apply when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,
}

/// Initialize tracing/logging
pub fn init_logging(args: &CommonArgs) {
    muninn_core::utils::init_logger(&args.log_level, args.json_logs);
}

/// Load and validate the monitor configuration
pub fn load_config(path: &Option<PathBuf>) -> Result<MonitorConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            MonitorConfig::from_json(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))
        }
        None => Ok(MonitorConfig::default()),
    }
}

/// One JSON-lines sample as fed on stdin.
#[derive(Debug, Deserialize)]
pub struct SampleRecord {
    pub domain: Domain,
    pub metric: String,
    pub value: f64,
    /// Defaults to the ingestion wall clock when the feed omits it.
    #[serde(default)]
    pub timestamp_ms: Option<u64>,
}

/// Print final statistics
pub fn print_status(status: &MonitorStatus) {
    tracing::info!("=== Final Status ===");
    tracing::info!("Ticks completed: {}", status.ticks_completed);
    if let Some(score) = &status.system {
        tracing::info!("System health: {:.2}", score.health_score);
    }
    if let Some(score) = &status.market {
        tracing::info!("Market health: {:.2}", score.health_score);
    }
    if let Some(score) = &status.trading {
        tracing::info!("Trading health: {:.2}", score.health_score);
    }
    tracing::info!(
        "Alerts: {} critical, {} warning, {} info",
        status.alerts.critical,
        status.alerts.warning,
        status.alerts.info
    );
    tracing::info!("Transport: {:?}", status.connection);
    tracing::info!("Stage errors: {}", status.stage_errors.total());
    tracing::info!(
        "Resident memory: {:.2} MB",
        status.resident_memory_bytes as f64 / 1_048_576.0
    );
}
