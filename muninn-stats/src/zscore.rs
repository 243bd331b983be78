//! Basic sample moments and z-score anomaly counting
//!
//! The validation stage uses `anomaly_count` to flag price points that sit
//! more than a configured number of standard deviations away from the
//! window mean.

/// Arithmetic mean over finite samples. 0.0 for an empty (or all-garbage)
/// slice.
pub fn mean(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for &v in values {
        if v.is_finite() {
            sum += v;
            n += 1;
        }
    }
    if n == 0 {
        return 0.0;
    }
    sum / n as f64
}

/// Population standard deviation over finite samples.
pub fn std_dev(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 2 {
        return 0.0;
    }

    let m = mean(&finite);
    let variance = finite.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / finite.len() as f64;
    variance.sqrt()
}

/// Count of samples with |x - mean| / stddev above `threshold`.
///
/// A window with zero variance has no anomalies by definition, so a flat
/// series (or one too short to have a spread) always returns 0.
pub fn anomaly_count(values: &[f64], threshold: f64) -> usize {
    let m = mean(values);
    let sigma = std_dev(values);
    if sigma == 0.0 || !sigma.is_finite() {
        return 0;
    }

    values
        .iter()
        .filter(|v| v.is_finite() && ((*v - m).abs() / sigma) > threshold)
        .count()
}
