//! Live monitor fed by JSON-lines samples on stdin
//!
//! Each stdin line is one sample:
//!
//! ```text
//! {"domain":"market","metric":"price","value":50123.5,"timestamp_ms":1717000000000}
//! ```
//!
//! Malformed lines are logged and dropped; the pipeline keeps ticking on
//! its configured interval until Ctrl-C, then shuts down cleanly and
//! prints the final status.

use anyhow::Result;
use clap::Parser;
use muninn_bins::common::{init_logging, load_config, print_status, CommonArgs, SampleRecord};
use muninn_core::prelude::*;
use std::io::BufRead;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CommonArgs::parse();
    init_logging(&args);

    let config = load_config(&args.config)?;
    tracing::info!("=== Muninn: Live Monitor ===");
    tracing::info!(
        "Tick interval: {}ms, window: {}, retention: {}",
        config.pipeline.update_interval_ms,
        config.pipeline.window_size,
        config.pipeline.retention
    );

    let monitor = Arc::new(Monitor::new(config)?);
    monitor.start()?;

    // Ingestion: a blocking reader thread so stdin never stalls the
    // tick scheduler.
    let ingest_monitor = Arc::clone(&monitor);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!("stdin read failed: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<SampleRecord>(&line) {
                Ok(record) => {
                    let timestamp = record.timestamp_ms.unwrap_or_else(now_ms);
                    if let Err(e) = ingest_monitor.ingest(
                        record.domain,
                        &record.metric,
                        record.value,
                        timestamp,
                    ) {
                        tracing::warn!("sample dropped: {}", e);
                    }
                }
                Err(e) => tracing::warn!("malformed sample line dropped: {}", e),
            }
        }
        tracing::info!("ingestion stream ended");
    });

    // Periodic status logging alongside the pipeline.
    let status_monitor = Arc::clone(&monitor);
    let status_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let status = status_monitor.status();
            tracing::info!(
                "status: ticks={} valid={:?} alerts={} transport={:?}",
                status.ticks_completed,
                status.data_valid,
                status.alerts.total(),
                status.connection
            );
        }
    });

    // Wait for Ctrl-C.
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })?;
    shutdown_rx.recv().await;

    tracing::info!("shutting down...");
    status_task.abort();
    monitor.stop().await;
    print_status(&monitor.status());

    Ok(())
}
