//! Configuration structures for the monitoring pipeline

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub weights: ScoreWeights,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub analytics: AnalyticsThresholds,

    #[serde(default)]
    pub validation: ValidationThresholds,

    #[serde(default)]
    pub alerts: AlertConfig,

    #[serde(default)]
    pub dissemination: DisseminationConfig,
}

/// Tick cadence and windowing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Milliseconds between pipeline ticks
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,

    /// Number of most recent samples each stage computes over
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Maximum samples retained per metric series (ring buffer capacity)
    #[serde(default = "default_retention")]
    pub retention: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: default_update_interval_ms(),
            window_size: default_window_size(),
            retention: default_retention(),
        }
    }
}

/// Per-domain weighted health components.
///
/// Each pair feeds the domain's health score; pairs are normalized before
/// use so they behave as fractions of 1 even if configured otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoreWeights {
    /// System health: uptime ratio vs error margin
    #[serde(default = "default_primary_weight")]
    pub system_uptime_ratio: f64,
    #[serde(default = "default_secondary_weight")]
    pub system_error_margin: f64,

    /// Market health: liquidity ratio vs spread margin
    #[serde(default = "default_primary_weight")]
    pub market_liquidity_ratio: f64,
    #[serde(default = "default_secondary_weight")]
    pub market_spread_margin: f64,

    /// Trading health: fill ratio vs rejection margin
    #[serde(default = "default_primary_weight")]
    pub trading_fill_ratio: f64,
    #[serde(default = "default_secondary_weight")]
    pub trading_rejection_margin: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            system_uptime_ratio: default_primary_weight(),
            system_error_margin: default_secondary_weight(),
            market_liquidity_ratio: default_primary_weight(),
            market_spread_margin: default_secondary_weight(),
            trading_fill_ratio: default_primary_weight(),
            trading_rejection_margin: default_secondary_weight(),
        }
    }
}

impl ScoreWeights {
    /// Scale each domain's pair so it sums to 1.
    ///
    /// Called at configuration time; `validate()` guarantees every pair
    /// has a positive sum before this runs.
    pub fn normalize(&mut self) {
        fn scale(a: &mut f64, b: &mut f64) {
            let sum = *a + *b;
            if sum > 0.0 {
                *a /= sum;
                *b /= sum;
            }
        }

        scale(&mut self.system_uptime_ratio, &mut self.system_error_margin);
        scale(
            &mut self.market_liquidity_ratio,
            &mut self.market_spread_margin,
        );
        scale(
            &mut self.trading_fill_ratio,
            &mut self.trading_rejection_margin,
        );
    }
}

/// Ceilings and targets used to map raw metric means into [0,1] indicators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// API latency at which system performance hits zero (milliseconds)
    #[serde(default = "default_latency_ceiling_ms")]
    pub latency_ceiling_ms: f64,

    /// Error rate at which the system error margin hits zero
    #[serde(default = "default_error_rate_ceiling")]
    pub error_rate_ceiling: f64,

    /// Liquidity level considered fully healthy
    #[serde(default = "default_liquidity_target")]
    pub liquidity_target: f64,

    /// Spread (as a fraction of price) at which the spread margin hits zero
    #[serde(default = "default_spread_ceiling")]
    pub spread_ceiling: f64,

    /// Expected `price_updates` counter value per sampling interval
    #[serde(default = "default_expected_price_updates")]
    pub expected_price_updates: f64,

    /// Rejection rate at which the trading rejection margin hits zero
    #[serde(default = "default_rejection_ceiling")]
    pub rejection_ceiling: f64,

    /// Order latency at which trading performance hits zero (milliseconds)
    #[serde(default = "default_order_latency_ceiling_ms")]
    pub order_latency_ceiling_ms: f64,

    /// Absolute exposure treated as fully utilizing the risk budget
    #[serde(default = "default_exposure_limit")]
    pub exposure_limit: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            latency_ceiling_ms: default_latency_ceiling_ms(),
            error_rate_ceiling: default_error_rate_ceiling(),
            liquidity_target: default_liquidity_target(),
            spread_ceiling: default_spread_ceiling(),
            expected_price_updates: default_expected_price_updates(),
            rejection_ceiling: default_rejection_ceiling(),
            order_latency_ceiling_ms: default_order_latency_ceiling_ms(),
            exposure_limit: default_exposure_limit(),
        }
    }
}

/// Signal/risk ladder thresholds for the analytics stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsThresholds {
    /// Annualized volatility below which the market counts as calm
    #[serde(default = "default_low_volatility")]
    pub low_volatility: f64,

    /// Absolute price/volume correlation counted as strong
    #[serde(default = "default_strong_correlation")]
    pub strong_correlation: f64,

    /// Absolute volume-weighted trend counted as strong
    #[serde(default = "default_strong_trend")]
    pub strong_trend: f64,

    /// Volume impact correlation counted as high
    #[serde(default = "default_high_volume_impact")]
    pub high_volume_impact: f64,

    /// Confidence added per satisfied ladder rung (sum capped at 1)
    #[serde(default = "default_confidence_increment")]
    pub confidence_increment: f64,

    /// Multiplier applied to the thresholds above for the risk ladder
    #[serde(default = "default_risk_scale")]
    pub risk_scale: f64,
}

impl Default for AnalyticsThresholds {
    fn default() -> Self {
        Self {
            low_volatility: default_low_volatility(),
            strong_correlation: default_strong_correlation(),
            strong_trend: default_strong_trend(),
            high_volume_impact: default_high_volume_impact(),
            confidence_increment: default_confidence_increment(),
            risk_scale: default_risk_scale(),
        }
    }
}

/// Data-quality, performance, and consistency check thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationThresholds {
    /// Maximum tolerated ratio of non-finite values in the market window
    #[serde(default = "default_max_missing_ratio")]
    pub max_missing_ratio: f64,

    /// Sample age beyond which a metric counts as stale (milliseconds)
    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: u64,

    /// Maximum tolerated ratio of stale metrics
    #[serde(default = "default_max_stale_ratio")]
    pub max_stale_ratio: f64,

    /// Z-score above which a price sample counts as an anomaly
    #[serde(default = "default_zscore_threshold")]
    pub zscore_threshold: f64,

    /// Anomalies tolerated per window before an issue is raised
    #[serde(default = "default_max_anomaly_count")]
    pub max_anomaly_count: usize,

    /// Average API latency threshold (milliseconds)
    #[serde(default = "default_avg_latency_ms")]
    pub avg_latency_ms: f64,

    /// Error rate threshold
    #[serde(default = "default_error_rate")]
    pub error_rate: f64,

    /// Latency above which a sample counts as a timeout (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: f64,

    /// Timeouts tolerated per window before an issue is raised
    #[serde(default = "default_max_timeout_count")]
    pub max_timeout_count: usize,

    /// Maximum relative price change between consecutive samples
    #[serde(default = "default_max_price_deviation")]
    pub max_price_deviation: f64,

    /// Maximum relative volume change between consecutive samples
    #[serde(default = "default_max_volume_deviation")]
    pub max_volume_deviation: f64,

    /// Maximum gap between consecutive sample timestamps (milliseconds)
    #[serde(default = "default_max_timestamp_gap_ms")]
    pub max_timestamp_gap_ms: u64,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            max_missing_ratio: default_max_missing_ratio(),
            max_age_ms: default_max_age_ms(),
            max_stale_ratio: default_max_stale_ratio(),
            zscore_threshold: default_zscore_threshold(),
            max_anomaly_count: default_max_anomaly_count(),
            avg_latency_ms: default_avg_latency_ms(),
            error_rate: default_error_rate(),
            timeout_ms: default_timeout_ms(),
            max_timeout_count: default_max_timeout_count(),
            max_price_deviation: default_max_price_deviation(),
            max_volume_deviation: default_max_volume_deviation(),
            max_timestamp_gap_ms: default_max_timestamp_gap_ms(),
        }
    }
}

/// Alerting thresholds and history sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertConfig {
    /// Maximum alerts retained, newest first
    #[serde(default = "default_alert_history_cap")]
    pub history_cap: usize,

    /// Health score below which a domain raises an alert
    #[serde(default = "default_min_health_score")]
    pub min_health_score: f64,

    /// Annualized volatility above which an alert is raised
    #[serde(default = "default_volatility_alert")]
    pub volatility_threshold: f64,

    /// Breach magnitude (x threshold) that escalates Warning to Critical
    #[serde(default = "default_critical_multiplier")]
    pub critical_multiplier: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            history_cap: default_alert_history_cap(),
            min_health_score: default_min_health_score(),
            volatility_threshold: default_volatility_alert(),
            critical_multiplier: default_critical_multiplier(),
        }
    }
}

/// Batching and transport reconnection policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisseminationConfig {
    /// Maximum outgoing batches retained in the dissemination buffer
    #[serde(default = "default_batch_history_cap")]
    pub batch_history_cap: usize,

    /// Fixed delay between reconnection attempts (milliseconds)
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Reconnection attempts before giving up
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Randomization applied to the reconnect delay (0.0 to 1.0)
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,

    /// Capacity of the subscriber broadcast channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for DisseminationConfig {
    fn default() -> Self {
        Self {
            batch_history_cap: default_batch_history_cap(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            jitter_factor: default_jitter_factor(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_update_interval_ms() -> u64 {
    1_000
}
fn default_window_size() -> usize {
    60
}
fn default_retention() -> usize {
    1_000
}
fn default_primary_weight() -> f64 {
    0.6
}
fn default_secondary_weight() -> f64 {
    0.4
}
fn default_latency_ceiling_ms() -> f64 {
    1_000.0
}
fn default_error_rate_ceiling() -> f64 {
    0.2
}
fn default_liquidity_target() -> f64 {
    100_000.0
}
fn default_spread_ceiling() -> f64 {
    0.05
}
fn default_expected_price_updates() -> f64 {
    10.0
}
fn default_rejection_ceiling() -> f64 {
    0.2
}
fn default_order_latency_ceiling_ms() -> f64 {
    500.0
}
fn default_exposure_limit() -> f64 {
    1_000_000.0
}
fn default_low_volatility() -> f64 {
    0.2
}
fn default_strong_correlation() -> f64 {
    0.7
}
fn default_strong_trend() -> f64 {
    0.01
}
fn default_high_volume_impact() -> f64 {
    0.6
}
fn default_confidence_increment() -> f64 {
    0.25
}
fn default_risk_scale() -> f64 {
    1.5
}
fn default_max_missing_ratio() -> f64 {
    0.1
}
fn default_max_age_ms() -> u64 {
    60_000
}
fn default_max_stale_ratio() -> f64 {
    0.5
}
fn default_zscore_threshold() -> f64 {
    3.0
}
fn default_max_anomaly_count() -> usize {
    2
}
fn default_avg_latency_ms() -> f64 {
    500.0
}
fn default_error_rate() -> f64 {
    0.05
}
fn default_timeout_ms() -> f64 {
    2_000.0
}
fn default_max_timeout_count() -> usize {
    0
}
fn default_max_price_deviation() -> f64 {
    0.1
}
fn default_max_volume_deviation() -> f64 {
    2.0
}
fn default_max_timestamp_gap_ms() -> u64 {
    30_000
}
fn default_alert_history_cap() -> usize {
    50
}
fn default_min_health_score() -> f64 {
    0.5
}
fn default_volatility_alert() -> f64 {
    0.5
}
fn default_critical_multiplier() -> f64 {
    1.5
}
fn default_batch_history_cap() -> usize {
    100
}
fn default_reconnect_delay_ms() -> u64 {
    1_000
}
fn default_max_reconnect_attempts() -> u32 {
    5
}
fn default_jitter_factor() -> f64 {
    0.1
}
fn default_channel_capacity() -> usize {
    64
}
