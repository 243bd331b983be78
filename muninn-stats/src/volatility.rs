//! Log-return volatility estimation
//!
//! Computes the standard deviation of logarithmic returns over a price
//! series, annualized by the square root of the sampling frequency. This
//! is the volatility figure surfaced on the dashboard and fed into the
//! analytics signal ladder.

use crate::zscore::{mean, std_dev};

/// Daily sampling convention used by the market analytics stage.
pub const TRADING_PERIODS_PER_YEAR: f64 = 252.0;

/// Log-returns of a price series, skipping unusable points.
///
/// A return is only produced for consecutive prices that are both finite
/// and strictly positive; everything else is dropped rather than
/// propagated as NaN.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .filter(|w| w[0].is_finite() && w[1].is_finite() && w[0] > 0.0 && w[1] > 0.0)
        .map(|w| (w[1] / w[0]).ln())
        .collect()
}

/// Annualized volatility: stddev of log-returns scaled by
/// `sqrt(periods_per_year)`.
///
/// Returns 0.0 when fewer than 2 usable prices are present.
pub fn log_return_volatility(prices: &[f64], periods_per_year: f64) -> f64 {
    let returns = log_returns(prices);
    if returns.is_empty() {
        return 0.0;
    }

    let sigma = std_dev(&returns);
    if !sigma.is_finite() {
        return 0.0;
    }

    sigma * periods_per_year.max(0.0).sqrt()
}

/// Mean period return of the series (simple returns, not log).
///
/// Unusable consecutive pairs are skipped the same way `log_returns` does.
pub fn mean_return(prices: &[f64]) -> f64 {
    let returns: Vec<f64> = prices
        .windows(2)
        .filter(|w| w[0].is_finite() && w[1].is_finite() && w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();

    if returns.is_empty() {
        return 0.0;
    }
    mean(&returns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_prices_zero_volatility() {
        let prices = [100.0; 10];
        assert_eq!(log_return_volatility(&prices, TRADING_PERIODS_PER_YEAR), 0.0);
    }

    #[test]
    fn test_varying_prices_positive_volatility() {
        let prices = [100.0, 101.0, 99.0, 100.0];
        let vol = log_return_volatility(&prices, TRADING_PERIODS_PER_YEAR);
        assert!(vol > 0.0, "expected positive volatility, got {}", vol);
    }

    #[test]
    fn test_short_series_zero_volatility() {
        assert_eq!(log_return_volatility(&[], TRADING_PERIODS_PER_YEAR), 0.0);
        assert_eq!(log_return_volatility(&[100.0], TRADING_PERIODS_PER_YEAR), 0.0);
    }

    #[test]
    fn test_annualization_scaling() {
        let prices = [100.0, 102.0, 98.0, 101.0, 99.0];
        let daily = log_return_volatility(&prices, 1.0);
        let annual = log_return_volatility(&prices, 252.0);
        assert_relative_eq!(annual, daily * 252.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_garbage_prices_skipped() {
        // NaN and non-positive points drop out; the remaining pairs still
        // produce a finite estimate.
        let prices = [100.0, f64::NAN, 101.0, 0.0, -5.0, 99.0, 100.0];
        let vol = log_return_volatility(&prices, TRADING_PERIODS_PER_YEAR);
        assert!(vol.is_finite());
        assert!(vol >= 0.0);
    }

    #[test]
    fn test_all_garbage_is_zero() {
        let prices = [f64::NAN, f64::INFINITY, -1.0, 0.0];
        assert_eq!(log_return_volatility(&prices, TRADING_PERIODS_PER_YEAR), 0.0);
    }

    #[test]
    fn test_log_returns_count() {
        let prices = [100.0, 101.0, 99.0, 100.0];
        assert_eq!(log_returns(&prices).len(), 3);
    }

    #[test]
    fn test_mean_return_sign() {
        let up = [100.0, 101.0, 102.0, 103.0];
        let down = [103.0, 102.0, 101.0, 100.0];
        assert!(mean_return(&up) > 0.0);
        assert!(mean_return(&down) < 0.0);
    }
}
