//! Windowed processor: raw series to normalized composite scores
//!
//! On each tick the processor reduces the most recent `window_size`
//! samples of each domain's metrics to three [0,1] scores: health
//! (weighted mix of two named indicators), performance, and resource.
//! It keeps no state of its own; the same snapshot and configuration
//! always produce the same score.

use crate::config::MonitorConfig;
use crate::core::{ComputeError, Domain};
use crate::store::DomainSnapshot;
use serde::{Deserialize, Serialize};

/// Per-domain composite score snapshot, immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub domain: Domain,
    pub health_score: f64,
    pub performance_score: f64,
    pub resource_score: f64,
    pub timestamp_ms: u64,
}

/// Stateless score computation over one domain snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowedProcessor;

impl WindowedProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Compute the composite score for one domain.
    ///
    /// Missing metrics contribute a zero indicator, never an error; the
    /// only failure mode is a non-finite result from corrupted input.
    pub fn process(
        &self,
        cfg: &MonitorConfig,
        domain: Domain,
        snapshot: &DomainSnapshot,
        timestamp_ms: u64,
    ) -> Result<CompositeScore, ComputeError> {
        let (health, performance, resource) = match domain {
            Domain::System => self.system_scores(cfg, snapshot),
            Domain::Market => self.market_scores(cfg, snapshot),
            Domain::Trading => self.trading_scores(cfg, snapshot),
        };

        for (field, value) in [
            ("health_score", health),
            ("performance_score", performance),
            ("resource_score", resource),
        ] {
            if !value.is_finite() {
                return Err(ComputeError::NonFiniteResult {
                    stage: "processor",
                    field,
                    value,
                });
            }
        }

        Ok(CompositeScore {
            domain,
            health_score: clamp01(health),
            performance_score: clamp01(performance),
            resource_score: clamp01(resource),
            timestamp_ms,
        })
    }

    fn system_scores(&self, cfg: &MonitorConfig, snap: &DomainSnapshot) -> (f64, f64, f64) {
        let w = cfg.pipeline.window_size;

        let uptime_ratio = indicator(snap.window_mean("uptime", w), |m| m);
        let error_margin = indicator(snap.window_mean("error_rate", w), |m| {
            1.0 - m / cfg.scoring.error_rate_ceiling
        });
        let health = cfg.weights.system_uptime_ratio * uptime_ratio
            + cfg.weights.system_error_margin * error_margin;

        let performance = indicator(snap.window_mean("api_latency", w), |m| {
            1.0 - m / cfg.scoring.latency_ceiling_ms
        });

        // Resource utilization averages whichever of cpu/memory is present.
        let mut utilization = Vec::with_capacity(2);
        if let Some(cpu) = snap.window_mean("cpu_usage", w) {
            utilization.push(cpu);
        }
        if let Some(mem) = snap.window_mean("memory_usage", w) {
            utilization.push(mem);
        }
        let resource = if utilization.is_empty() {
            0.0
        } else {
            clamp01(1.0 - utilization.iter().sum::<f64>() / utilization.len() as f64)
        };

        (health, performance, resource)
    }

    fn market_scores(&self, cfg: &MonitorConfig, snap: &DomainSnapshot) -> (f64, f64, f64) {
        let w = cfg.pipeline.window_size;

        let liquidity_ratio = indicator(snap.window_mean("liquidity", w), |m| {
            m / cfg.scoring.liquidity_target
        });
        let spread_margin = indicator(snap.window_mean("spread", w), |m| {
            1.0 - m / cfg.scoring.spread_ceiling
        });
        let health = cfg.weights.market_liquidity_ratio * liquidity_ratio
            + cfg.weights.market_spread_margin * spread_margin;

        let performance = indicator(snap.window_mean("price_updates", w), |m| {
            m / cfg.scoring.expected_price_updates
        });

        // Window fill ratio of the price series: how much of the
        // configured window is actually populated.
        let resource = if w == 0 {
            0.0
        } else {
            snap.samples("price").len().min(w) as f64 / w as f64
        };

        (health, performance, resource)
    }

    fn trading_scores(&self, cfg: &MonitorConfig, snap: &DomainSnapshot) -> (f64, f64, f64) {
        let w = cfg.pipeline.window_size;

        let fill_ratio = indicator(snap.window_mean("fill_rate", w), |m| m);
        let rejection_margin = indicator(snap.window_mean("rejection_rate", w), |m| {
            1.0 - m / cfg.scoring.rejection_ceiling
        });
        let health = cfg.weights.trading_fill_ratio * fill_ratio
            + cfg.weights.trading_rejection_margin * rejection_margin;

        let performance = indicator(snap.window_mean("order_latency", w), |m| {
            1.0 - m / cfg.scoring.order_latency_ceiling_ms
        });

        let resource = match snap.latest("exposure") {
            Some(s) if s.value.is_finite() => {
                clamp01(1.0 - s.value.abs() / cfg.scoring.exposure_limit)
            }
            _ => 0.0,
        };

        (health, performance, resource)
    }
}

/// Map an optional window mean through an indicator function.
///
/// An absent metric yields a zero indicator, never an error; present
/// values are clamped to [0,1] after mapping.
fn indicator<F: FnOnce(f64) -> f64>(mean: Option<f64>, f: F) -> f64 {
    mean.map(f).map(clamp01).unwrap_or(0.0)
}

fn clamp01(v: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}
