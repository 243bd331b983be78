//! Benchmark: Statistical Kernel Performance
//!
//! Purpose: Measure per-tick cost of the analytics/validation kernels
//! Target: full kernel sweep well under the pipeline tick budget
//!
//! What's Measured:
//! - Log-return volatility over a 100-sample window
//! - Pearson correlation over paired 100-sample windows
//! - Volume-weighted trend + volume impact
//! - Z-score anomaly counting
//!
//! Why This Matters:
//! Every kernel runs once per domain per tick; the tick is synchronous,
//! so kernel cost directly bounds the minimum update interval.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use muninn_stats::{
    anomaly_count, log_return_volatility, pearson, volume_impact, volume_weighted_trend,
    TRADING_PERIODS_PER_YEAR,
};

/// Helper: deterministic wavy price series
fn price_fixture(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 50_000.0 + 250.0 * ((i as f64) * 0.37).sin())
        .collect()
}

/// Helper: volume series loosely tracking price movement
fn volume_fixture(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + 40.0 * ((i as f64) * 0.61).cos().abs())
        .collect()
}

fn bench_volatility(c: &mut Criterion) {
    let prices = price_fixture(100);
    c.bench_function("volatility_100", |b| {
        b.iter(|| log_return_volatility(black_box(&prices), TRADING_PERIODS_PER_YEAR))
    });
}

fn bench_correlation(c: &mut Criterion) {
    let a = price_fixture(100);
    let b_series = volume_fixture(100);
    c.bench_function("pearson_100", |b| {
        b.iter(|| pearson(black_box(&a), black_box(&b_series)))
    });
}

fn bench_trend(c: &mut Criterion) {
    let prices = price_fixture(100);
    let volumes = volume_fixture(100);
    c.bench_function("trend_and_impact_100", |b| {
        b.iter(|| {
            let t = volume_weighted_trend(black_box(&prices), black_box(&volumes));
            let i = volume_impact(black_box(&prices), black_box(&volumes));
            (t, i)
        })
    });
}

fn bench_anomaly_count(c: &mut Criterion) {
    let prices = price_fixture(100);
    c.bench_function("anomaly_count_100", |b| {
        b.iter(|| anomaly_count(black_box(&prices), 3.0))
    });
}

criterion_group!(
    benches,
    bench_volatility,
    bench_correlation,
    bench_trend,
    bench_anomaly_count
);
criterion_main!(benches);
