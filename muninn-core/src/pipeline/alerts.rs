//! Alert engine: threshold-crossing detection and alert lifecycle
//!
//! Every tick independently evaluates the configured thresholds against
//! the latest composite scores, analysis, and validation results, and may
//! raise any number of typed alerts. New alerts are prepended (index 0 is
//! always the newest) and the history is truncated to the configured cap.
//!
//! There is no automatic resolution and no deduplication: a breach that
//! keeps recurring keeps producing entries, and a breach that stops
//! simply stops producing new ones. Entries leave the history only via
//! cap eviction or an explicit `clear_alert` / `clear_all_alerts`.

use crate::config::MonitorConfig;
use crate::pipeline::analytics::{AnalysisResult, RiskLevel};
use crate::pipeline::processor::CompositeScore;
use crate::pipeline::validation::{IssueKind, ValidationResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowHealthScore,
    HighErrorRate,
    HighVolatility,
    HighRisk,
    DataQuality,
    TransportDown,
}

/// One raised alert. Immutable once in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub metrics: HashMap<String, f64>,
    pub timestamp_ms: u64,
}

/// Read-side filter for `alerts()`.
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub severity: Option<AlertSeverity>,
    pub kind: Option<AlertKind>,
    pub since_ms: Option<u64>,
    pub limit: Option<usize>,
}

/// Alert counts grouped by severity, for the status surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlertCounts {
    pub info: usize,
    pub warning: usize,
    pub critical: usize,
}

impl AlertCounts {
    pub fn total(&self) -> usize {
        self.info + self.warning + self.critical
    }
}

/// Stateful alert stage: capped newest-first history plus an id counter.
pub struct AlertEngine {
    history: VecDeque<Alert>,
    next_id: u64,
}

impl AlertEngine {
    pub fn new() -> Self {
        Self {
            history: VecDeque::new(),
            next_id: 1,
        }
    }

    /// Evaluate all thresholds for one tick and return the newly raised
    /// alerts (already recorded in the history).
    pub fn evaluate(
        &mut self,
        cfg: &MonitorConfig,
        scores: &[CompositeScore],
        analysis: Option<&AnalysisResult>,
        validation: Option<&ValidationResult>,
        timestamp_ms: u64,
    ) -> Vec<Alert> {
        let mut raised = Vec::new();

        for score in scores {
            if score.health_score < cfg.alerts.min_health_score {
                let severity =
                    severity_for_floor(score.health_score, cfg.alerts.min_health_score, cfg);
                raised.push(self.build(
                    AlertKind::LowHealthScore,
                    severity,
                    format!(
                        "{} health {:.2} below {:.2}",
                        score.domain, score.health_score, cfg.alerts.min_health_score
                    ),
                    HashMap::from([
                        ("health_score".to_string(), score.health_score),
                        ("threshold".to_string(), cfg.alerts.min_health_score),
                    ]),
                    timestamp_ms,
                ));
            }
        }

        if let Some(analysis) = analysis {
            let vol = analysis.metrics.volatility;
            if vol > cfg.alerts.volatility_threshold {
                let severity = severity_for_ceiling(vol, cfg.alerts.volatility_threshold, cfg);
                raised.push(self.build(
                    AlertKind::HighVolatility,
                    severity,
                    format!(
                        "annualized volatility {:.2} above {:.2}",
                        vol, cfg.alerts.volatility_threshold
                    ),
                    HashMap::from([
                        ("volatility".to_string(), vol),
                        ("threshold".to_string(), cfg.alerts.volatility_threshold),
                    ]),
                    timestamp_ms,
                ));
            }

            if analysis.risk.level == RiskLevel::High {
                raised.push(self.build(
                    AlertKind::HighRisk,
                    AlertSeverity::Critical,
                    format!("risk level high: {}", analysis.risk.factors.join(", ")),
                    HashMap::from([
                        ("exposure".to_string(), analysis.risk.exposure),
                        ("var_95".to_string(), analysis.risk.var_95),
                    ]),
                    timestamp_ms,
                ));
            }
        }

        if let Some(validation) = validation {
            // The error-rate issue carries its own observed/threshold pair
            // and escalates independently per the ceiling rule.
            for issue in &validation.issues {
                if issue.kind != IssueKind::HighErrorRate {
                    continue;
                }
                let observed = issue.details.get("error_rate").copied().unwrap_or(0.0);
                let threshold = issue.details.get("threshold").copied().unwrap_or(0.0);
                let severity = severity_for_ceiling(observed, threshold, cfg);
                raised.push(self.build(
                    AlertKind::HighErrorRate,
                    severity,
                    issue.message.clone(),
                    issue.details.clone(),
                    timestamp_ms,
                ));
            }

            if !validation.is_valid {
                raised.push(self.build(
                    AlertKind::DataQuality,
                    AlertSeverity::Warning,
                    format!(
                        "validation failed with {} error issue(s)",
                        validation.error_count()
                    ),
                    HashMap::from([
                        ("error_issues".to_string(), validation.error_count() as f64),
                        ("data_quality".to_string(), validation.metrics.data_quality),
                    ]),
                    timestamp_ms,
                ));
            }
        }

        for alert in &raised {
            debug!(
                "alert raised: [{}] {:?} - {}",
                alert.severity.as_str(),
                alert.kind,
                alert.message
            );
            self.history.push_front(alert.clone());
        }
        self.truncate(cfg.alerts.history_cap);

        raised
    }

    /// Raise an alert outside the per-tick threshold sweep (used by the
    /// orchestrator for transport failures).
    pub fn raise(
        &mut self,
        cfg: &MonitorConfig,
        kind: AlertKind,
        severity: AlertSeverity,
        message: impl Into<String>,
        metrics: HashMap<String, f64>,
        timestamp_ms: u64,
    ) -> Alert {
        let alert = self.build(kind, severity, message.into(), metrics, timestamp_ms);
        self.history.push_front(alert.clone());
        self.truncate(cfg.alerts.history_cap);
        alert
    }

    fn build(
        &mut self,
        kind: AlertKind,
        severity: AlertSeverity,
        message: String,
        metrics: HashMap<String, f64>,
        timestamp_ms: u64,
    ) -> Alert {
        let id = self.next_id;
        self.next_id += 1;
        Alert {
            id,
            kind,
            severity,
            message,
            metrics,
            timestamp_ms,
        }
    }

    fn truncate(&mut self, cap: usize) {
        while self.history.len() > cap.max(1) {
            self.history.pop_back();
        }
    }

    /// Alerts matching the filter, newest first.
    pub fn alerts(&self, filter: &AlertFilter) -> Vec<Alert> {
        let iter = self.history.iter().filter(|a| {
            filter.severity.map_or(true, |s| a.severity == s)
                && filter.kind.map_or(true, |k| a.kind == k)
                && filter.since_ms.map_or(true, |t| a.timestamp_ms >= t)
        });
        match filter.limit {
            Some(limit) => iter.take(limit).cloned().collect(),
            None => iter.cloned().collect(),
        }
    }

    /// Remove one alert by id. Returns whether it was present.
    pub fn clear_alert(&mut self, id: u64) -> bool {
        let before = self.history.len();
        self.history.retain(|a| a.id != id);
        self.history.len() != before
    }

    pub fn clear_all_alerts(&mut self) {
        self.history.clear();
    }

    pub fn counts(&self) -> AlertCounts {
        let mut counts = AlertCounts::default();
        for alert in &self.history {
            match alert.severity {
                AlertSeverity::Info => counts.info += 1,
                AlertSeverity::Warning => counts.warning += 1,
                AlertSeverity::Critical => counts.critical += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Severity for an upper-bound threshold: Critical at or beyond
/// `critical_multiplier` times the threshold.
fn severity_for_ceiling(observed: f64, threshold: f64, cfg: &MonitorConfig) -> AlertSeverity {
    if threshold > 0.0 && observed >= threshold * cfg.alerts.critical_multiplier {
        AlertSeverity::Critical
    } else {
        AlertSeverity::Warning
    }
}

/// Severity for a lower-bound threshold: Critical once the observed value
/// falls below threshold / `critical_multiplier`.
fn severity_for_floor(observed: f64, threshold: f64, cfg: &MonitorConfig) -> AlertSeverity {
    if observed <= threshold / cfg.alerts.critical_multiplier {
        AlertSeverity::Critical
    } else {
        AlertSeverity::Warning
    }
}
