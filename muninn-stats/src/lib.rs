//! Muninn Stats - Statistical kernels for the telemetry pipeline
//!
//! Pure, allocation-light statistics over raw `f64` sample slices. These
//! functions are the computational backbone of the analytics and validation
//! stages in `muninn-core`:
//!
//! - Log-return volatility with configurable annualization
//! - Pearson correlation with degenerate-input guards
//! - Volume-weighted trend strength and volume impact
//! - Z-score anomaly counting
//!
//! ## Design Rules
//!
//! 1. **Never panic, never error.** Garbage input (NaN, infinities,
//!    non-positive prices, mismatched lengths) degrades to a neutral
//!    result (`0.0` / `0`), keeping the tick pipeline non-blocking.
//! 2. **Bounded output.** Correlations are clamped to [-1, 1] so float
//!    rounding can never leak an out-of-range coefficient downstream.
//! 3. **No state.** Every kernel is a pure function over slices; windowing
//!    is the caller's job.

pub mod correlation;
pub mod trend;
pub mod volatility;
pub mod zscore;

mod stats_proptest;

pub use correlation::pearson;
pub use trend::{volume_impact, volume_weighted_trend};
pub use volatility::{log_return_volatility, log_returns, TRADING_PERIODS_PER_YEAR};
pub use zscore::{anomaly_count, mean, std_dev};
