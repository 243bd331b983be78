//! Validation engine: gates the pipeline on data trustworthiness
//!
//! Three checks run against the same tick snapshot:
//! - data quality: missing-value ratio, staleness ratio, z-score price
//!   anomalies over the market domain
//! - performance: average API latency, error rate, timeout count over the
//!   system domain
//! - consistency: consecutive price/volume deviations and timestamp gaps
//!
//! Each breach produces an itemized issue. The overall verdict fails only
//! on error-severity issues; warnings alone keep `is_valid` true. A
//! breach twice the configured threshold escalates Warning to Error,
//! except the error-rate check which is always an error.

use crate::config::MonitorConfig;
use crate::core::Sample;
use crate::store::DomainSnapshot;
use muninn_stats::anomaly_count;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Results retained for inspection, matching the dashboard's history view.
const VALIDATION_HISTORY_CAP: usize = 100;

/// Breach magnitude (x threshold) that escalates Warning to Error.
const ERROR_ESCALATION: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingData,
    StaleData,
    PriceAnomaly,
    HighLatency,
    HighErrorRate,
    Timeouts,
    PriceDeviation,
    VolumeDeviation,
    TimestampGap,
}

/// One itemized validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub severity: IssueSeverity,
    pub message: String,
    pub details: HashMap<String, f64>,
}

impl ValidationIssue {
    fn new(kind: IssueKind, severity: IssueSeverity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    fn with_detail(mut self, key: impl Into<String>, value: f64) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}

/// Aggregate [0,1] quality metrics for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub data_quality: f64,
    pub performance: f64,
    pub consistency: f64,
}

/// Full validation output for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub timestamp_ms: u64,
    pub is_valid: bool,
    pub metrics: ValidationMetrics,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
            .count()
    }
}

/// Stateful validation stage with a bounded result history.
pub struct ValidationEngine {
    history: VecDeque<ValidationResult>,
}

impl ValidationEngine {
    pub fn new() -> Self {
        Self {
            history: VecDeque::new(),
        }
    }

    /// Run all three checks for one tick. Total: always yields a result.
    pub fn validate(
        &mut self,
        cfg: &MonitorConfig,
        market: &DomainSnapshot,
        system: &DomainSnapshot,
        now_ms: u64,
    ) -> ValidationResult {
        let mut issues = Vec::new();

        let data_quality = self.check_data_quality(cfg, market, now_ms, &mut issues);
        let performance = self.check_performance(cfg, system, &mut issues);
        let consistency = self.check_consistency(cfg, market, &mut issues);

        let is_valid = issues.iter().all(|i| i.severity != IssueSeverity::Error);

        let result = ValidationResult {
            timestamp_ms: now_ms,
            is_valid,
            metrics: ValidationMetrics {
                data_quality,
                performance,
                consistency,
            },
            issues,
        };

        self.history.push_back(result.clone());
        while self.history.len() > VALIDATION_HISTORY_CAP {
            self.history.pop_front();
        }

        result
    }

    fn check_data_quality(
        &self,
        cfg: &MonitorConfig,
        market: &DomainSnapshot,
        now_ms: u64,
        issues: &mut Vec<ValidationIssue>,
    ) -> f64 {
        let t = &cfg.validation;
        let w = cfg.pipeline.window_size;

        // Missing-value ratio across all market metrics in the window.
        let mut total = 0usize;
        let mut missing = 0usize;
        for name in market.metric_names() {
            for value in market.window_values(name, w) {
                total += 1;
                if !value.is_finite() {
                    missing += 1;
                }
            }
        }
        let missing_ratio = if total == 0 {
            0.0
        } else {
            missing as f64 / total as f64
        };

        if missing_ratio > t.max_missing_ratio {
            issues.push(
                ValidationIssue::new(
                    IssueKind::MissingData,
                    severity_for(missing_ratio, t.max_missing_ratio),
                    format!(
                        "missing-value ratio {:.3} exceeds {:.3}",
                        missing_ratio, t.max_missing_ratio
                    ),
                )
                .with_detail("missing_ratio", missing_ratio)
                .with_detail("threshold", t.max_missing_ratio),
            );
        }

        // Staleness ratio: metrics whose latest sample is older than max_age.
        let metric_count = market.metric_count();
        let stale = market
            .metric_names()
            .filter(|name| {
                market
                    .latest(name)
                    .map(|s| now_ms.saturating_sub(s.timestamp_ms) > t.max_age_ms)
                    .unwrap_or(false)
            })
            .count();
        let stale_ratio = if metric_count == 0 {
            0.0
        } else {
            stale as f64 / metric_count as f64
        };

        if stale_ratio > t.max_stale_ratio {
            issues.push(
                ValidationIssue::new(
                    IssueKind::StaleData,
                    severity_for(stale_ratio, t.max_stale_ratio),
                    format!(
                        "{} of {} market metrics older than {}ms",
                        stale, metric_count, t.max_age_ms
                    ),
                )
                .with_detail("stale_ratio", stale_ratio)
                .with_detail("max_age_ms", t.max_age_ms as f64),
            );
        }

        // Z-score anomalies on the price window.
        let prices = market.window_values("price", w);
        let anomalies = anomaly_count(&prices, t.zscore_threshold);
        if anomalies > t.max_anomaly_count {
            issues.push(
                ValidationIssue::new(
                    IssueKind::PriceAnomaly,
                    IssueSeverity::Warning,
                    format!(
                        "{} price anomalies beyond {:.1} sigma",
                        anomalies, t.zscore_threshold
                    ),
                )
                .with_detail("anomaly_count", anomalies as f64)
                .with_detail("zscore_threshold", t.zscore_threshold),
            );
        }

        clamp01(1.0 - missing_ratio.max(stale_ratio))
    }

    fn check_performance(
        &self,
        cfg: &MonitorConfig,
        system: &DomainSnapshot,
        issues: &mut Vec<ValidationIssue>,
    ) -> f64 {
        let t = &cfg.validation;
        let w = cfg.pipeline.window_size;

        let latencies = system.window_values("api_latency", w);
        let avg_latency = muninn_stats::mean(&latencies);

        if avg_latency > t.avg_latency_ms {
            issues.push(
                ValidationIssue::new(
                    IssueKind::HighLatency,
                    severity_for(avg_latency, t.avg_latency_ms),
                    format!(
                        "average latency {:.0}ms exceeds {:.0}ms",
                        avg_latency, t.avg_latency_ms
                    ),
                )
                .with_detail("avg_latency_ms", avg_latency)
                .with_detail("threshold_ms", t.avg_latency_ms),
            );
        }

        let error_rate = system
            .window_mean("error_rate", w)
            .unwrap_or(0.0)
            .max(0.0);
        if error_rate > t.error_rate {
            // A breached error rate always invalidates the tick.
            issues.push(
                ValidationIssue::new(
                    IssueKind::HighErrorRate,
                    IssueSeverity::Error,
                    format!(
                        "error rate {:.3} exceeds {:.3}",
                        error_rate, t.error_rate
                    ),
                )
                .with_detail("error_rate", error_rate)
                .with_detail("threshold", t.error_rate),
            );
        }

        let timeouts = latencies
            .iter()
            .filter(|v| v.is_finite() && **v > t.timeout_ms)
            .count();
        if timeouts > t.max_timeout_count {
            issues.push(
                ValidationIssue::new(
                    IssueKind::Timeouts,
                    IssueSeverity::Warning,
                    format!("{} samples above the {:.0}ms timeout", timeouts, t.timeout_ms),
                )
                .with_detail("timeout_count", timeouts as f64)
                .with_detail("timeout_ms", t.timeout_ms),
            );
        }

        let latency_ratio = if t.avg_latency_ms > 0.0 {
            avg_latency / (2.0 * t.avg_latency_ms)
        } else {
            0.0
        };
        let error_ratio = if t.error_rate > 0.0 {
            error_rate / (2.0 * t.error_rate)
        } else {
            0.0
        };
        clamp01(1.0 - latency_ratio.max(error_ratio))
    }

    fn check_consistency(
        &self,
        cfg: &MonitorConfig,
        market: &DomainSnapshot,
        issues: &mut Vec<ValidationIssue>,
    ) -> f64 {
        let t = &cfg.validation;
        let w = cfg.pipeline.window_size;

        let price_samples = window_samples(market, "price", w);
        let volume_samples = window_samples(market, "volume", w);

        let max_price_dev = max_relative_deviation(&price_samples);
        if max_price_dev > t.max_price_deviation {
            issues.push(
                ValidationIssue::new(
                    IssueKind::PriceDeviation,
                    severity_for(max_price_dev, t.max_price_deviation),
                    format!(
                        "price moved {:.1}% between consecutive samples",
                        max_price_dev * 100.0
                    ),
                )
                .with_detail("max_deviation", max_price_dev)
                .with_detail("threshold", t.max_price_deviation),
            );
        }

        let max_volume_dev = max_relative_deviation(&volume_samples);
        if max_volume_dev > t.max_volume_deviation {
            issues.push(
                ValidationIssue::new(
                    IssueKind::VolumeDeviation,
                    severity_for(max_volume_dev, t.max_volume_deviation),
                    format!(
                        "volume moved {:.1}% between consecutive samples",
                        max_volume_dev * 100.0
                    ),
                )
                .with_detail("max_deviation", max_volume_dev)
                .with_detail("threshold", t.max_volume_deviation),
            );
        }

        let max_gap = max_timestamp_gap(&price_samples);
        if max_gap > t.max_timestamp_gap_ms {
            issues.push(
                ValidationIssue::new(
                    IssueKind::TimestampGap,
                    severity_for(max_gap as f64, t.max_timestamp_gap_ms as f64),
                    format!(
                        "{}ms gap between consecutive price samples",
                        max_gap
                    ),
                )
                .with_detail("max_gap_ms", max_gap as f64)
                .with_detail("threshold_ms", t.max_timestamp_gap_ms as f64),
            );
        }

        let price_ratio = ratio_of(max_price_dev, t.max_price_deviation);
        let volume_ratio = ratio_of(max_volume_dev, t.max_volume_deviation);
        let gap_ratio = ratio_of(max_gap as f64, t.max_timestamp_gap_ms as f64);
        clamp01(1.0 - price_ratio.max(volume_ratio).max(gap_ratio))
    }

    pub fn latest(&self) -> Option<&ValidationResult> {
        self.history.back()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Warning below 2x the threshold, Error at or beyond it.
fn severity_for(observed: f64, threshold: f64) -> IssueSeverity {
    if threshold > 0.0 && observed >= threshold * ERROR_ESCALATION {
        IssueSeverity::Error
    } else {
        IssueSeverity::Warning
    }
}

fn window_samples(snapshot: &DomainSnapshot, metric: &str, window: usize) -> Vec<Sample> {
    let samples = snapshot.samples(metric);
    let start = samples.len().saturating_sub(window);
    samples[start..].to_vec()
}

/// Largest |delta| / previous across consecutive finite samples.
fn max_relative_deviation(samples: &[Sample]) -> f64 {
    samples
        .windows(2)
        .filter_map(|w| {
            let (prev, cur) = (w[0].value, w[1].value);
            if prev.is_finite() && cur.is_finite() && prev.abs() > 0.0 {
                Some((cur - prev).abs() / prev.abs())
            } else {
                None
            }
        })
        .fold(0.0, f64::max)
}

fn max_timestamp_gap(samples: &[Sample]) -> u64 {
    samples
        .windows(2)
        .map(|w| w[1].timestamp_ms.saturating_sub(w[0].timestamp_ms))
        .max()
        .unwrap_or(0)
}

fn ratio_of(observed: f64, threshold: f64) -> f64 {
    if threshold > 0.0 {
        observed / threshold
    } else {
        0.0
    }
}

fn clamp01(v: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}
