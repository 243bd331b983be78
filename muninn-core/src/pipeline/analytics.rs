//! Analytics engine: statistical signals and risk classification
//!
//! Consumes the market/trading snapshots plus the latest composite
//! scores and produces one [`AnalysisResult`] per tick:
//! - volatility (annualized log-return stddev), price/volume correlation,
//!   volume-weighted trend strength, and volume impact
//! - a deterministic signal ladder: each satisfied threshold adds a fixed
//!   confidence increment (capped at 1); the trend-strength sign decides
//!   buy vs sell
//! - a risk ladder over the same thresholds scaled by `risk_scale`, with
//!   monotonic escalation (low -> medium -> high, never back down within
//!   one evaluation)

use crate::config::MonitorConfig;
use crate::core::ComputeError;
use crate::pipeline::processor::CompositeScore;
use crate::store::DomainSnapshot;
use muninn_stats::{
    log_return_volatility, pearson, volume_impact, volume_weighted_trend,
    TRADING_PERIODS_PER_YEAR,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Trend magnitude (as a multiple of the strong-trend threshold) at which
/// signal strength saturates at 1.0.
const STRENGTH_SATURATION: f64 = 4.0;

/// One-sided 95% quantile of the standard normal, for parametric VaR.
const VAR_95_Z: f64 = 1.645;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Trading signal derived from the threshold ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub strength: f64,
    pub confidence: f64,
    pub factors: Vec<String>,
}

impl Signal {
    fn hold() -> Self {
        Self {
            kind: SignalKind::Hold,
            strength: 0.0,
            confidence: 0.0,
            factors: Vec::new(),
        }
    }
}

/// Risk classification for the current window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub factors: Vec<String>,
    pub exposure: f64,
    pub var_95: f64,
}

/// The four statistical signals of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetrics {
    pub volatility: f64,
    pub correlation: f64,
    pub trend_strength: f64,
    pub volume_impact: f64,
}

/// Full analytics output for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub timestamp_ms: u64,
    pub metrics: AnalysisMetrics,
    pub signal: Signal,
    pub risk: RiskAssessment,
}

/// Stateful analytics stage: computes per-tick results and keeps a
/// bounded, chronologically ordered history (newest last).
pub struct AnalyticsEngine {
    history: VecDeque<AnalysisResult>,
}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self {
            history: VecDeque::new(),
        }
    }

    /// Run the analytics stage for one tick.
    pub fn analyze(
        &mut self,
        cfg: &MonitorConfig,
        market: &DomainSnapshot,
        trading: &DomainSnapshot,
        scores: &[CompositeScore],
        timestamp_ms: u64,
    ) -> Result<AnalysisResult, ComputeError> {
        let w = cfg.pipeline.window_size;
        let prices = market.window_values("price", w);
        let volumes = market.window_values("volume", w);

        let metrics = AnalysisMetrics {
            volatility: log_return_volatility(&prices, TRADING_PERIODS_PER_YEAR),
            correlation: pearson(&prices, &volumes),
            trend_strength: volume_weighted_trend(&prices, &volumes),
            volume_impact: volume_impact(&prices, &volumes),
        };

        for (field, value) in [
            ("volatility", metrics.volatility),
            ("correlation", metrics.correlation),
            ("trend_strength", metrics.trend_strength),
            ("volume_impact", metrics.volume_impact),
        ] {
            if !value.is_finite() {
                return Err(ComputeError::NonFiniteResult {
                    stage: "analytics",
                    field,
                    value,
                });
            }
        }

        let signal = self.build_signal(cfg, &metrics, prices.len());
        let risk = self.assess_risk(cfg, &metrics, trading, scores);

        let result = AnalysisResult {
            timestamp_ms,
            metrics,
            signal,
            risk,
        };

        self.history.push_back(result.clone());
        while self.history.len() > w.max(1) {
            self.history.pop_front();
        }

        Ok(result)
    }

    fn build_signal(
        &self,
        cfg: &MonitorConfig,
        metrics: &AnalysisMetrics,
        price_samples: usize,
    ) -> Signal {
        // No meaningful price window yet: hold with zero confidence
        // rather than letting volatility == 0 satisfy the calm rung.
        if price_samples < 2 {
            return Signal::hold();
        }

        let t = &cfg.analytics;
        let mut signal = Signal::hold();

        if metrics.volatility < t.low_volatility {
            signal.confidence += t.confidence_increment;
            signal.factors.push("low_volatility".to_string());
        }

        if metrics.correlation.abs() >= t.strong_correlation {
            signal.confidence += t.confidence_increment;
            signal.factors.push("strong_correlation".to_string());
        }

        if metrics.trend_strength.abs() >= t.strong_trend {
            signal.confidence += t.confidence_increment;
            signal.factors.push("strong_trend".to_string());
            // The trend sign decides direction, overriding anything else.
            signal.kind = if metrics.trend_strength > 0.0 {
                SignalKind::Buy
            } else {
                SignalKind::Sell
            };
            signal.strength = (metrics.trend_strength.abs()
                / (t.strong_trend * STRENGTH_SATURATION))
                .clamp(0.0, 1.0);
        }

        if metrics.volume_impact >= t.high_volume_impact {
            signal.confidence += t.confidence_increment;
            signal.factors.push("high_volume_impact".to_string());
        }

        signal.confidence = signal.confidence.min(1.0);
        signal
    }

    fn assess_risk(
        &self,
        cfg: &MonitorConfig,
        metrics: &AnalysisMetrics,
        trading: &DomainSnapshot,
        scores: &[CompositeScore],
    ) -> RiskAssessment {
        let t = &cfg.analytics;
        let scale = t.risk_scale;
        let mut level = RiskLevel::Low;
        let mut factors = Vec::new();

        fn escalate(level: &mut RiskLevel, to: RiskLevel) {
            if to > *level {
                *level = to;
            }
        }

        if metrics.volatility >= t.low_volatility * scale {
            factors.push("elevated_volatility".to_string());
            escalate(&mut level, RiskLevel::Medium);
        }
        if metrics.volatility >= t.low_volatility * scale * 2.0 {
            factors.push("extreme_volatility".to_string());
            escalate(&mut level, RiskLevel::High);
        }

        if metrics.trend_strength.abs() >= t.strong_trend * scale {
            factors.push("sharp_trend".to_string());
            escalate(&mut level, RiskLevel::Medium);
        }

        let exposure = trading
            .latest("exposure")
            .map(|s| s.value)
            .filter(|v| v.is_finite())
            .unwrap_or(0.0);
        let exposure_ratio = exposure.abs() / cfg.scoring.exposure_limit;

        if exposure_ratio >= 0.5 {
            factors.push("elevated_exposure".to_string());
            escalate(&mut level, RiskLevel::Medium);
        }
        if exposure_ratio >= 0.75 {
            factors.push("high_exposure".to_string());
            escalate(&mut level, RiskLevel::High);
        }

        // A domain scoring below the health floor is itself a risk input.
        if scores
            .iter()
            .any(|s| s.health_score < cfg.alerts.min_health_score)
        {
            factors.push("degraded_health".to_string());
            escalate(&mut level, RiskLevel::Medium);
        }

        let per_period_vol = metrics.volatility / TRADING_PERIODS_PER_YEAR.sqrt();
        let var_95 = VAR_95_Z * per_period_vol * exposure.abs();

        RiskAssessment {
            level,
            factors,
            exposure,
            var_95,
        }
    }

    /// Most recent result, if any tick has completed.
    pub fn latest(&self) -> Option<&AnalysisResult> {
        self.history.back()
    }

    /// Up to `limit` most recent results, oldest first.
    pub fn history(&self, limit: usize) -> Vec<AnalysisResult> {
        let start = self.history.len().saturating_sub(limit);
        self.history.iter().skip(start).cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Domain;
    use crate::store::MetricStore;
    use approx::assert_relative_eq;

    fn snapshots(prices: &[f64], volumes: &[f64]) -> (DomainSnapshot, DomainSnapshot) {
        let store = MetricStore::new(1_000);
        for (i, &p) in prices.iter().enumerate() {
            store.append(Domain::Market, "price", p, i as u64 + 1);
        }
        for (i, &v) in volumes.iter().enumerate() {
            store.append(Domain::Market, "volume", v, i as u64 + 1);
        }
        (store.snapshot(Domain::Market), store.snapshot(Domain::Trading))
    }

    #[test]
    fn test_reference_series_volatility_and_self_correlation() {
        let prices = [100.0, 101.0, 99.0, 100.0];
        let (market, trading) = snapshots(&prices, &prices);
        let cfg = MonitorConfig::default();
        let mut engine = AnalyticsEngine::new();

        let result = engine.analyze(&cfg, &market, &trading, &[], 1).unwrap();
        assert!(result.metrics.volatility > 0.0);
        // Volume series equals the price series here, so the correlation
        // is the price series against itself.
        assert_relative_eq!(result.metrics.correlation, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_market_holds_with_zero_confidence() {
        let (market, trading) = snapshots(&[], &[]);
        let cfg = MonitorConfig::default();
        let mut engine = AnalyticsEngine::new();

        let result = engine.analyze(&cfg, &market, &trading, &[], 1).unwrap();
        assert_eq!(result.signal.kind, SignalKind::Hold);
        assert_eq!(result.signal.confidence, 0.0);
        assert!(result.signal.factors.is_empty());
        assert_eq!(result.risk.level, RiskLevel::Low);
    }

    #[test]
    fn test_uptrend_produces_buy_signal() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 * 1.02_f64.powi(i)).collect();
        let volumes = vec![50.0; 30];
        let (market, trading) = snapshots(&prices, &volumes);
        let cfg = MonitorConfig::default();
        let mut engine = AnalyticsEngine::new();

        let result = engine.analyze(&cfg, &market, &trading, &[], 1).unwrap();
        assert_eq!(result.signal.kind, SignalKind::Buy);
        assert!(result.signal.confidence > 0.0);
        assert!(result.signal.strength > 0.0);
        assert!(result
            .signal
            .factors
            .contains(&"strong_trend".to_string()));
    }

    #[test]
    fn test_downtrend_produces_sell_signal() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 * 0.98_f64.powi(i)).collect();
        let volumes = vec![50.0; 30];
        let (market, trading) = snapshots(&prices, &volumes);
        let cfg = MonitorConfig::default();
        let mut engine = AnalyticsEngine::new();

        let result = engine.analyze(&cfg, &market, &trading, &[], 1).unwrap();
        assert_eq!(result.signal.kind, SignalKind::Sell);
    }

    #[test]
    fn test_confidence_capped_at_one() {
        let mut cfg = MonitorConfig::default();
        cfg.analytics.confidence_increment = 0.9;
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64 * 2.0).collect();
        let volumes: Vec<f64> = (0..30).map(|i| 50.0 + i as f64 * 5.0).collect();
        let (market, trading) = snapshots(&prices, &volumes);
        let mut engine = AnalyticsEngine::new();

        let result = engine.analyze(&cfg, &market, &trading, &[], 1).unwrap();
        assert!(result.signal.confidence <= 1.0);
        assert!(result.signal.factors.len() >= 2);
    }

    #[test]
    fn test_risk_escalates_on_high_exposure() {
        let store = MetricStore::new(100);
        for i in 0..10u64 {
            store.append(Domain::Market, "price", 100.0, i + 1);
            store.append(Domain::Market, "volume", 10.0, i + 1);
        }
        // 80% of the default exposure limit.
        store.append(Domain::Trading, "exposure", 800_000.0, 10);

        let cfg = MonitorConfig::default();
        let mut engine = AnalyticsEngine::new();
        let result = engine
            .analyze(
                &cfg,
                &store.snapshot(Domain::Market),
                &store.snapshot(Domain::Trading),
                &[],
                1,
            )
            .unwrap();

        assert_eq!(result.risk.level, RiskLevel::High);
        assert!(result
            .risk
            .factors
            .contains(&"high_exposure".to_string()));
        assert_relative_eq!(result.risk.exposure, 800_000.0);
    }

    #[test]
    fn test_risk_never_downgrades() {
        // Volatile prices push risk to at least Medium; low exposure must
        // not pull it back down.
        let prices = [100.0, 140.0, 90.0, 150.0, 80.0, 160.0];
        let volumes = [10.0; 6];
        let (market, _) = snapshots(&prices, &volumes);

        let store = MetricStore::new(10);
        store.append(Domain::Trading, "exposure", 1_000.0, 1);

        let cfg = MonitorConfig::default();
        let mut engine = AnalyticsEngine::new();
        let result = engine
            .analyze(&cfg, &market, &store.snapshot(Domain::Trading), &[], 1)
            .unwrap();

        assert!(result.risk.level >= RiskLevel::Medium);
    }

    #[test]
    fn test_low_composite_health_escalates_risk() {
        let prices = [100.0, 100.1, 100.0, 100.2];
        let volumes = [10.0; 4];
        let (market, trading) = snapshots(&prices, &volumes);
        let cfg = MonitorConfig::default();
        let mut engine = AnalyticsEngine::new();

        let weak = CompositeScore {
            domain: Domain::System,
            health_score: 0.2,
            performance_score: 0.5,
            resource_score: 0.5,
            timestamp_ms: 1,
        };

        let result = engine.analyze(&cfg, &market, &trading, &[weak], 1).unwrap();
        assert_eq!(result.risk.level, RiskLevel::Medium);
        assert!(result
            .risk
            .factors
            .contains(&"degraded_health".to_string()));
    }

    #[test]
    fn test_history_capped_at_window_size() {
        let mut cfg = MonitorConfig::default();
        cfg.pipeline.window_size = 5;
        let prices = [100.0, 101.0, 99.0, 100.0];
        let (market, trading) = snapshots(&prices, &prices);
        let mut engine = AnalyticsEngine::new();

        for tick in 0..20u64 {
            engine.analyze(&cfg, &market, &trading, &[], tick).unwrap();
        }

        assert_eq!(engine.history_len(), 5);
        // Newest entries survive: timestamps 15..=19.
        let history = engine.history(10);
        assert_eq!(history.first().unwrap().timestamp_ms, 15);
        assert_eq!(history.last().unwrap().timestamp_ms, 19);
    }

    #[test]
    fn test_history_limit_returns_newest() {
        let prices = [100.0, 101.0, 99.0, 100.0];
        let (market, trading) = snapshots(&prices, &prices);
        let cfg = MonitorConfig::default();
        let mut engine = AnalyticsEngine::new();

        for tick in 0..10u64 {
            engine.analyze(&cfg, &market, &trading, &[], tick).unwrap();
        }

        let last_three = engine.history(3);
        assert_eq!(last_three.len(), 3);
        assert_eq!(last_three.last().unwrap().timestamp_ms, 9);
    }

    #[test]
    fn test_var_scales_with_exposure() {
        let prices = [100.0, 102.0, 98.0, 101.0, 99.0];
        let volumes = [10.0; 5];

        let cfg = MonitorConfig::default();
        let mut engine = AnalyticsEngine::new();

        let store_small = MetricStore::new(10);
        store_small.append(Domain::Trading, "exposure", 10_000.0, 1);
        let store_large = MetricStore::new(10);
        store_large.append(Domain::Trading, "exposure", 100_000.0, 1);

        let (market, _) = snapshots(&prices, &volumes);
        let small = engine
            .analyze(&cfg, &market, &store_small.snapshot(Domain::Trading), &[], 1)
            .unwrap();
        let large = engine
            .analyze(&cfg, &market, &store_large.snapshot(Domain::Trading), &[], 2)
            .unwrap();

        assert!(small.risk.var_95 > 0.0);
        assert_relative_eq!(large.risk.var_95, small.risk.var_95 * 10.0, epsilon = 1e-9);
    }
}
