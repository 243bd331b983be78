pub mod types;

pub use types::*;

use anyhow::Result;

impl MonitorConfig {
    /// Parse a configuration from JSON, validate it, and normalize the
    /// health-score weights.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut cfg: MonitorConfig =
            serde_json::from_str(json).map_err(|e| anyhow::anyhow!("invalid config: {}", e))?;
        cfg.validate()?;
        cfg.weights.normalize();
        Ok(cfg)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.update_interval_ms == 0 {
            anyhow::bail!("update_interval_ms must be positive");
        }

        if self.pipeline.window_size == 0 {
            anyhow::bail!("window_size must be at least 1");
        }

        if self.pipeline.retention < self.pipeline.window_size {
            anyhow::bail!(
                "retention ({}) must be at least window_size ({})",
                self.pipeline.retention,
                self.pipeline.window_size
            );
        }

        // Weight pairs must be non-negative with a positive sum; they are
        // normalized afterwards, so any positive scale is accepted.
        let pairs = [
            (
                "system",
                self.weights.system_uptime_ratio,
                self.weights.system_error_margin,
            ),
            (
                "market",
                self.weights.market_liquidity_ratio,
                self.weights.market_spread_margin,
            ),
            (
                "trading",
                self.weights.trading_fill_ratio,
                self.weights.trading_rejection_margin,
            ),
        ];
        for (domain, a, b) in pairs {
            if a < 0.0 || b < 0.0 {
                anyhow::bail!("{} weights must be non-negative", domain);
            }
            if a + b <= 0.0 {
                anyhow::bail!("{} weights must sum to a positive value", domain);
            }
        }

        let positive_scoring = [
            ("latency_ceiling_ms", self.scoring.latency_ceiling_ms),
            ("error_rate_ceiling", self.scoring.error_rate_ceiling),
            ("liquidity_target", self.scoring.liquidity_target),
            ("spread_ceiling", self.scoring.spread_ceiling),
            ("expected_price_updates", self.scoring.expected_price_updates),
            ("rejection_ceiling", self.scoring.rejection_ceiling),
            (
                "order_latency_ceiling_ms",
                self.scoring.order_latency_ceiling_ms,
            ),
            ("exposure_limit", self.scoring.exposure_limit),
        ];
        for (name, value) in positive_scoring {
            if !(value > 0.0) || !value.is_finite() {
                anyhow::bail!("scoring.{} must be a positive finite number", name);
            }
        }

        if !(self.analytics.confidence_increment > 0.0)
            || self.analytics.confidence_increment > 1.0
        {
            anyhow::bail!("analytics.confidence_increment must be in (0, 1]");
        }

        if self.analytics.risk_scale <= 1.0 {
            anyhow::bail!("analytics.risk_scale must exceed 1.0");
        }

        if !(0.0..=1.0).contains(&self.validation.max_missing_ratio) {
            anyhow::bail!("validation.max_missing_ratio must be in [0, 1]");
        }

        if !(0.0..=1.0).contains(&self.validation.max_stale_ratio) {
            anyhow::bail!("validation.max_stale_ratio must be in [0, 1]");
        }

        if self.validation.zscore_threshold <= 0.0 {
            anyhow::bail!("validation.zscore_threshold must be positive");
        }

        if self.alerts.history_cap == 0 || self.alerts.history_cap > 10_000 {
            anyhow::bail!("alerts.history_cap must be in 1..=10000");
        }

        if !(0.0..=1.0).contains(&self.alerts.min_health_score) {
            anyhow::bail!("alerts.min_health_score must be in [0, 1]");
        }

        if self.alerts.critical_multiplier <= 1.0 {
            anyhow::bail!("alerts.critical_multiplier must exceed 1.0");
        }

        if self.dissemination.batch_history_cap == 0 {
            anyhow::bail!("dissemination.batch_history_cap must be positive");
        }

        if self.dissemination.reconnect_delay_ms == 0 {
            anyhow::bail!("dissemination.reconnect_delay_ms must be positive");
        }

        if !(0.0..=1.0).contains(&self.dissemination.jitter_factor) {
            anyhow::bail!("dissemination.jitter_factor must be in [0, 1]");
        }

        if self.dissemination.channel_capacity == 0 {
            anyhow::bail!("dissemination.channel_capacity must be positive");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = MonitorConfig::default();
        config.pipeline.update_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retention_below_window_rejected() {
        let mut config = MonitorConfig::default();
        config.pipeline.window_size = 100;
        config.pipeline.retention = 50;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = MonitorConfig::default();
        config.weights.system_uptime_ratio = -0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_sum_weights_rejected() {
        let mut config = MonitorConfig::default();
        config.weights.market_liquidity_ratio = 0.0;
        config.weights.market_spread_margin = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_weights_normalize_to_unit_sum() {
        let mut weights = ScoreWeights {
            system_uptime_ratio: 3.0,
            system_error_margin: 1.0,
            ..Default::default()
        };
        weights.normalize();
        assert_relative_eq!(weights.system_uptime_ratio, 0.75);
        assert_relative_eq!(weights.system_error_margin, 0.25);
        assert_relative_eq!(
            weights.market_liquidity_ratio + weights.market_spread_margin,
            1.0
        );
    }

    #[test]
    fn test_from_json_empty_object_uses_defaults() {
        let config = MonitorConfig::from_json("{}").unwrap();
        assert_eq!(config.pipeline.update_interval_ms, 1_000);
        assert_eq!(config.pipeline.window_size, 60);
        assert_eq!(config.alerts.history_cap, 50);
    }

    #[test]
    fn test_from_json_rejects_out_of_range() {
        let json = r#"{"alerts": {"history_cap": 0}}"#;
        assert!(MonitorConfig::from_json(json).is_err());
    }

    #[test]
    fn test_from_json_overrides() {
        let json = r#"{"pipeline": {"update_interval_ms": 250, "window_size": 20, "retention": 200}}"#;
        let config = MonitorConfig::from_json(json).unwrap();
        assert_eq!(config.pipeline.update_interval_ms, 250);
        assert_eq!(config.pipeline.window_size, 20);
    }
}
