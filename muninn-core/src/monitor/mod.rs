//! Monitoring orchestrator: lifecycle and composite status surface
//!
//! The orchestrator owns the metric store, the stage engines, the
//! dissemination layer, and the only timer in the system. On each tick it
//! runs processor -> analytics -> validation -> alerts -> dissemination
//! against one consistent store snapshot.
//!
//! Failure policy: a stage that errors costs only its own output for that
//! tick; downstream stages receive the previous tick's cached value and
//! the next tick runs on schedule. Only the scheduler itself dying is
//! fatal.

pub mod status;

pub use status::{MonitorStatus, StageErrorCounts};

use crate::config::MonitorConfig;
use crate::core::{now_ms, Domain, IngestError};
use crate::dissemination::{
    batches_for_tick, Channel, ChannelTransport, ConnectionState, Disseminator, Subscription,
    SubscriptionBatch, Transport,
};
use crate::pipeline::{
    Alert, AlertEngine, AlertFilter, AlertKind, AlertSeverity, AnalysisResult, AnalyticsEngine,
    CompositeScore, ValidationEngine, ValidationResult, WindowedProcessor,
};
use crate::store::{DomainSnapshot, MetricStore};
use anyhow::Result;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outputs of the last successful run of each stage, reused when a stage
/// fails mid-tick.
#[derive(Default)]
struct TickCache {
    scores: HashMap<Domain, CompositeScore>,
    analysis: Option<AnalysisResult>,
    validation: Option<ValidationResult>,
}

struct StageErrors {
    processor: AtomicU64,
    analytics: AtomicU64,
    dissemination: AtomicU64,
}

impl StageErrors {
    fn new() -> Self {
        Self {
            processor: AtomicU64::new(0),
            analytics: AtomicU64::new(0),
            dissemination: AtomicU64::new(0),
        }
    }

    fn snapshot(&self) -> StageErrorCounts {
        StageErrorCounts {
            processor: self.processor.load(Ordering::Relaxed),
            analytics: self.analytics.load(Ordering::Relaxed),
            dissemination: self.dissemination.load(Ordering::Relaxed),
        }
    }
}

struct Inner<T: Transport> {
    config: RwLock<MonitorConfig>,
    store: MetricStore,
    processor: WindowedProcessor,
    analytics: RwLock<AnalyticsEngine>,
    validation: RwLock<ValidationEngine>,
    alerts: RwLock<AlertEngine>,
    disseminator: tokio::sync::Mutex<Disseminator<T>>,
    subscribers: broadcast::Sender<SubscriptionBatch>,
    connection: RwLock<ConnectionState>,
    cache: RwLock<TickCache>,
    stage_errors: StageErrors,
    ticks_completed: AtomicU64,
    last_tick_ms: AtomicU64,
    running: AtomicBool,
    transport_alerted: AtomicBool,
    started_at: Instant,
}

/// The monitoring engine exposed to the dashboard layer.
pub struct Monitor<T: Transport + 'static> {
    inner: Arc<Inner<T>>,
    shutdown: RwLock<Option<watch::Sender<bool>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Monitor<ChannelTransport> {
    /// Create a monitor with the in-process broadcast transport.
    pub fn new(config: MonitorConfig) -> Result<Self> {
        let capacity = config.dissemination.channel_capacity;
        Self::with_transport(config, ChannelTransport::new(capacity))
    }
}

impl<T: Transport + Send + 'static> Monitor<T> {
    /// Create a monitor with a custom transport.
    pub fn with_transport(mut config: MonitorConfig, transport: T) -> Result<Self> {
        config.validate()?;
        config.weights.normalize();

        let store = MetricStore::new(config.pipeline.retention);
        let disseminator = Disseminator::new(transport, &config.dissemination);
        let subscribers = disseminator.subscriber_sender();

        info!(
            "monitor initialized: interval {}ms, window {}, retention {}",
            config.pipeline.update_interval_ms,
            config.pipeline.window_size,
            config.pipeline.retention
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config: RwLock::new(config),
                store,
                processor: WindowedProcessor::new(),
                analytics: RwLock::new(AnalyticsEngine::new()),
                validation: RwLock::new(ValidationEngine::new()),
                alerts: RwLock::new(AlertEngine::new()),
                disseminator: tokio::sync::Mutex::new(disseminator),
                subscribers,
                connection: RwLock::new(ConnectionState::Connected),
                cache: RwLock::new(TickCache::default()),
                stage_errors: StageErrors::new(),
                ticks_completed: AtomicU64::new(0),
                last_tick_ms: AtomicU64::new(0),
                running: AtomicBool::new(false),
                transport_alerted: AtomicBool::new(false),
                started_at: Instant::now(),
            }),
            shutdown: RwLock::new(None),
            task: Mutex::new(None),
        })
    }

    /// Feed one raw sample into the store.
    ///
    /// Malformed samples are rejected here and never reach the store;
    /// values themselves are not range-checked (downstream tolerates
    /// garbage).
    pub fn ingest(
        &self,
        domain: Domain,
        metric: &str,
        value: f64,
        timestamp_ms: u64,
    ) -> Result<(), IngestError> {
        if metric.is_empty() {
            warn!("dropping sample with empty metric name ({})", domain);
            return Err(IngestError::EmptyMetricName { domain });
        }
        if timestamp_ms == 0 {
            warn!("dropping {}.{} sample with zero timestamp", domain, metric);
            return Err(IngestError::InvalidTimestamp {
                domain,
                metric: metric.to_string(),
                timestamp_ms,
            });
        }

        self.inner.store.append(domain, metric, value, timestamp_ms);
        Ok(())
    }

    /// Replace the configuration. Takes effect on the next tick.
    pub fn configure(&self, mut config: MonitorConfig) -> Result<()> {
        config.validate()?;
        config.weights.normalize();

        self.inner.store.set_retention(config.pipeline.retention);
        *self.inner.config.write() = config;
        info!("monitor reconfigured");
        Ok(())
    }

    /// Start the tick scheduler. Errors if already running.
    pub fn start(&self) -> Result<()> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            anyhow::bail!("monitor already running");
        }

        let (tx, mut rx) = watch::channel(false);
        *self.shutdown.write() = Some(tx);

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let mut period = inner.config.read().pipeline.update_interval_ms;
            let mut interval = tokio::time::interval(Duration::from_millis(period));
            // Never run overlapping ticks: a firing that lands while the
            // previous tick is still in flight is skipped, not queued.
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        run_tick(&inner).await;

                        let new_period = inner.config.read().pipeline.update_interval_ms;
                        if new_period != period {
                            period = new_period;
                            interval = tokio::time::interval(Duration::from_millis(period));
                            interval
                                .set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                        }
                    }
                    _ = rx.changed() => break,
                }
            }

            inner.running.store(false, Ordering::SeqCst);
            info!("monitor stopped");
        });

        *self.task.lock() = Some(handle);
        Ok(())
    }

    /// Stop the scheduler. An in-flight tick completes before the task
    /// exits; no further ticks start after this returns.
    pub async fn stop(&self) {
        let tx = self.shutdown.write().take();
        if let Some(tx) = tx {
            let _ = tx.send(true);
        }

        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.inner.running.store(false, Ordering::SeqCst);
    }

    /// Run exactly one pipeline tick. Used by tests and by callers that
    /// drive the cadence themselves instead of `start()`.
    pub async fn tick_once(&self) {
        run_tick(&self.inner).await;
    }

    /// Latest analytics result, if any tick has completed.
    pub fn latest_analysis(&self) -> Option<AnalysisResult> {
        self.inner.analytics.read().latest().cloned()
    }

    /// Up to `limit` most recent analytics results, oldest first.
    pub fn analysis_history(&self, limit: usize) -> Vec<AnalysisResult> {
        self.inner.analytics.read().history(limit)
    }

    /// Latest validation verdict, if any tick has completed.
    pub fn latest_validation(&self) -> Option<ValidationResult> {
        self.inner.validation.read().latest().cloned()
    }

    /// Alerts matching the filter, newest first.
    pub fn alerts(&self, filter: &AlertFilter) -> Vec<Alert> {
        self.inner.alerts.read().alerts(filter)
    }

    /// Remove one alert by id.
    pub fn clear_alert(&self, id: u64) -> bool {
        self.inner.alerts.write().clear_alert(id)
    }

    pub fn clear_all_alerts(&self) {
        self.inner.alerts.write().clear_all_alerts()
    }

    /// Subscribe to the dissemination stream. An empty channel set
    /// subscribes to everything.
    pub fn subscribe(&self, channels: &[Channel]) -> Subscription {
        Subscription::new(self.inner.subscribers.subscribe(), channels)
    }

    /// Aggregate status view for the dashboard.
    pub fn status(&self) -> MonitorStatus {
        let cache = self.inner.cache.read();
        let last_tick = self.inner.last_tick_ms.load(Ordering::Relaxed);

        MonitorStatus {
            running: self.inner.running.load(Ordering::SeqCst),
            system: cache.scores.get(&Domain::System).copied(),
            market: cache.scores.get(&Domain::Market).copied(),
            trading: cache.scores.get(&Domain::Trading).copied(),
            alerts: self.inner.alerts.read().counts(),
            connection: *self.inner.connection.read(),
            data_valid: cache.validation.as_ref().map(|v| v.is_valid),
            ticks_completed: self.inner.ticks_completed.load(Ordering::Relaxed),
            last_tick_age_ms: if last_tick == 0 {
                None
            } else {
                Some(now_ms().saturating_sub(last_tick))
            },
            stage_errors: self.inner.stage_errors.snapshot(),
            uptime_secs: self.inner.started_at.elapsed().as_secs(),
            resident_memory_bytes: status::resident_memory_bytes(),
        }
    }

    /// Clear a failed transport and retry the connection.
    pub async fn reset_transport(&self) -> Result<()> {
        let mut disseminator = self.inner.disseminator.lock().await;
        disseminator.reset_transport().await?;
        *self.inner.connection.write() = disseminator.state();
        self.inner.transport_alerted.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// One full pipeline cycle against a single consistent store snapshot.
async fn run_tick<T: Transport>(inner: &Arc<Inner<T>>) {
    let cfg = inner.config.read().clone();
    let now = now_ms();

    let snapshots: HashMap<Domain, DomainSnapshot> = Domain::ALL
        .into_iter()
        .map(|d| (d, inner.store.snapshot(d)))
        .collect();

    // Stage 1: composite scores. A failed domain falls back to its
    // previous score so downstream stages always see a full set.
    let mut scores = Vec::with_capacity(Domain::ALL.len());
    for domain in Domain::ALL {
        match inner
            .processor
            .process(&cfg, domain, &snapshots[&domain], now)
        {
            Ok(score) => scores.push(score),
            Err(e) => {
                warn!("processor failed for {}: {}", domain, e);
                inner.stage_errors.processor.fetch_add(1, Ordering::Relaxed);
                if let Some(prev) = inner.cache.read().scores.get(&domain) {
                    scores.push(*prev);
                }
            }
        }
    }

    // Stage 2: analytics.
    let analysis = {
        let result = inner.analytics.write().analyze(
            &cfg,
            &snapshots[&Domain::Market],
            &snapshots[&Domain::Trading],
            &scores,
            now,
        );
        match result {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                warn!("analytics failed: {}", e);
                inner.stage_errors.analytics.fetch_add(1, Ordering::Relaxed);
                inner.cache.read().analysis.clone()
            }
        }
    };

    // Stage 3: validation (total; a failed verdict is a value, not an error).
    let validation = inner.validation.write().validate(
        &cfg,
        &snapshots[&Domain::Market],
        &snapshots[&Domain::System],
        now,
    );

    // Stage 4: alerts, fed exactly the results computed this tick.
    let raised = inner.alerts.write().evaluate(
        &cfg,
        &scores,
        analysis.as_ref(),
        Some(&validation),
        now,
    );
    if !raised.is_empty() {
        debug!("{} alert(s) raised this tick", raised.len());
    }

    // Cache successful outputs for the next tick's fallback.
    {
        let mut cache = inner.cache.write();
        for score in &scores {
            cache.scores.insert(score.domain, *score);
        }
        cache.analysis = analysis.clone();
        cache.validation = Some(validation.clone());
    }

    // Stage 5: dissemination.
    let batches = batches_for_tick(&scores, analysis.as_ref(), Some(&validation), now);
    let mut disseminator = inner.disseminator.lock().await;
    if let Err(e) = disseminator.publish(batches).await {
        warn!("dissemination failed: {}", e);
        inner
            .stage_errors
            .dissemination
            .fetch_add(1, Ordering::Relaxed);
    }
    let connection = disseminator.state();
    drop(disseminator);
    *inner.connection.write() = connection;

    match connection {
        ConnectionState::Failed => {
            // Raise the transport alert once per failure episode.
            if !inner.transport_alerted.swap(true, Ordering::SeqCst) {
                inner.alerts.write().raise(
                    &cfg,
                    AlertKind::TransportDown,
                    AlertSeverity::Critical,
                    "transport reconnect attempts exhausted",
                    HashMap::from([(
                        "max_attempts".to_string(),
                        cfg.dissemination.max_reconnect_attempts as f64,
                    )]),
                    now,
                );
            }
        }
        ConnectionState::Connected => {
            // Coming back from a failure episode leaves a recovery notice.
            if inner.transport_alerted.swap(false, Ordering::SeqCst) {
                inner.alerts.write().raise(
                    &cfg,
                    AlertKind::TransportDown,
                    AlertSeverity::Info,
                    "transport connection restored",
                    HashMap::new(),
                    now,
                );
            }
        }
        ConnectionState::Reconnecting => {}
    }

    inner.ticks_completed.fetch_add(1, Ordering::Relaxed);
    inner.last_tick_ms.store(now, Ordering::Relaxed);
}
