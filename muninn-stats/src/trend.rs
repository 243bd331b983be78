//! Trend strength and volume impact
//!
//! Two market signals derived from aligned price/volume windows:
//! - `volume_weighted_trend`: average period return weighted by traded
//!   volume, so moves on real flow dominate moves on thin prints.
//! - `volume_impact`: correlation between absolute price deltas and
//!   period-over-period volume ratios.

use crate::correlation::pearson;

/// Volume-weighted average of period returns.
///
/// The i-th return ((p[i] - p[i-1]) / p[i-1]) is weighted by volumes[i].
/// Series are truncated to their common length; returns 0.0 when fewer
/// than 2 aligned samples exist or the usable volume sums to zero.
pub fn volume_weighted_trend(prices: &[f64], volumes: &[f64]) -> f64 {
    let len = prices.len().min(volumes.len());
    if len < 2 {
        return 0.0;
    }

    let mut weighted = 0.0;
    let mut total_volume = 0.0;
    for i in 1..len {
        let prev = prices[i - 1];
        let cur = prices[i];
        let vol = volumes[i];
        if !prev.is_finite() || !cur.is_finite() || prev <= 0.0 {
            continue;
        }
        if !vol.is_finite() || vol <= 0.0 {
            continue;
        }

        weighted += ((cur - prev) / prev) * vol;
        total_volume += vol;
    }

    if total_volume == 0.0 {
        return 0.0;
    }
    weighted / total_volume
}

/// Correlation between absolute price deltas and volume ratios.
///
/// High positive impact means price moves coincide with volume surges;
/// values near zero mean price drifts independently of flow. Returns 0.0
/// on short or misaligned input.
pub fn volume_impact(prices: &[f64], volumes: &[f64]) -> f64 {
    let len = prices.len().min(volumes.len());
    if len < 3 {
        return 0.0;
    }

    let mut deltas = Vec::with_capacity(len - 1);
    let mut ratios = Vec::with_capacity(len - 1);
    for i in 1..len {
        let dp = (prices[i] - prices[i - 1]).abs();
        let prev_vol = volumes[i - 1];
        if !dp.is_finite() || !prev_vol.is_finite() || prev_vol <= 0.0 || !volumes[i].is_finite() {
            continue;
        }
        deltas.push(dp);
        ratios.push(volumes[i] / prev_vol);
    }

    pearson(&deltas, &ratios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uptrend_positive() {
        let prices = [100.0, 101.0, 102.0, 103.0];
        let volumes = [10.0, 10.0, 10.0, 10.0];
        assert!(volume_weighted_trend(&prices, &volumes) > 0.0);
    }

    #[test]
    fn test_downtrend_negative() {
        let prices = [103.0, 102.0, 101.0, 100.0];
        let volumes = [10.0, 10.0, 10.0, 10.0];
        assert!(volume_weighted_trend(&prices, &volumes) < 0.0);
    }

    #[test]
    fn test_volume_weighting_dominates() {
        // One large up-move on heavy volume outweighs several small
        // down-moves on thin volume.
        let prices = [100.0, 110.0, 109.9, 109.8, 109.7];
        let volumes = [1.0, 1000.0, 1.0, 1.0, 1.0];
        assert!(volume_weighted_trend(&prices, &volumes) > 0.0);
    }

    #[test]
    fn test_equal_weights_match_mean_return() {
        let prices = [100.0, 102.0, 104.04];
        let volumes = [5.0, 5.0, 5.0];
        // With uniform volume the weighted trend is the plain mean return.
        assert_relative_eq!(
            volume_weighted_trend(&prices, &volumes),
            0.02,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_trend_short_input() {
        assert_eq!(volume_weighted_trend(&[100.0], &[10.0]), 0.0);
        assert_eq!(volume_weighted_trend(&[], &[]), 0.0);
    }

    #[test]
    fn test_trend_zero_volume() {
        let prices = [100.0, 101.0, 102.0];
        let volumes = [0.0, 0.0, 0.0];
        assert_eq!(volume_weighted_trend(&prices, &volumes), 0.0);
    }

    #[test]
    fn test_impact_tracks_flow() {
        // Deltas and volume ratios rise together: strong positive impact.
        let prices = [100.0, 100.5, 102.0, 105.0, 110.0];
        let volumes = [10.0, 11.0, 20.0, 45.0, 120.0];
        assert!(volume_impact(&prices, &volumes) > 0.5);
    }

    #[test]
    fn test_impact_short_input() {
        assert_eq!(volume_impact(&[100.0, 101.0], &[10.0, 11.0]), 0.0);
    }
}
