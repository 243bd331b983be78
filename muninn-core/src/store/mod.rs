//! Metric store: the single source of truth for raw samples
//!
//! The store is the only shared mutable resource in the pipeline. It is
//! written by ingestion and read once per tick; every downstream stage
//! works from the immutable [`DomainSnapshot`] taken at tick start, so a
//! tick always sees one consistent view.

pub mod series;

pub use series::MetricSeries;

use crate::core::{Domain, Sample};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Key for one metric series: domain plus metric name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricKey {
    pub domain: Domain,
    pub metric: String,
}

/// Immutable per-domain view of the store, taken once per tick.
#[derive(Debug, Clone, Default)]
pub struct DomainSnapshot {
    metrics: HashMap<String, Vec<Sample>>,
}

impl DomainSnapshot {
    /// Samples for one metric, oldest first. Empty slice when absent.
    pub fn samples(&self, metric: &str) -> &[Sample] {
        self.metrics.get(metric).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Raw values of the most recent `window` samples, oldest first.
    pub fn window_values(&self, metric: &str, window: usize) -> Vec<f64> {
        let samples = self.samples(metric);
        let start = samples.len().saturating_sub(window);
        samples[start..].iter().map(|s| s.value).collect()
    }

    /// Mean of the finite values in the window. `None` when the metric is
    /// absent or the window holds no usable value.
    pub fn window_mean(&self, metric: &str, window: usize) -> Option<f64> {
        let values = self.window_values(metric, window);
        let finite: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }
        Some(finite.iter().sum::<f64>() / finite.len() as f64)
    }

    /// Most recent sample of a metric.
    pub fn latest(&self, metric: &str) -> Option<Sample> {
        self.samples(metric).last().copied()
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Concurrent store of bounded metric series keyed by (domain, metric).
///
/// Contract: a single ingestion writer and a single per-tick reader. The
/// map itself is concurrent, so ingestion may keep appending while a tick
/// snapshots; each series is only ever observed through cloned snapshots.
pub struct MetricStore {
    series: DashMap<MetricKey, MetricSeries>,
    retention: AtomicUsize,
}

impl MetricStore {
    pub fn new(retention: usize) -> Self {
        Self {
            series: DashMap::new(),
            retention: AtomicUsize::new(retention.max(1)),
        }
    }

    /// Append a sample. O(1); evicts the oldest sample at capacity.
    pub fn append(&self, domain: Domain, metric: &str, value: f64, timestamp_ms: u64) {
        let key = MetricKey {
            domain,
            metric: metric.to_string(),
        };
        let retention = self.retention.load(Ordering::Relaxed);
        self.series
            .entry(key)
            .or_insert_with(|| MetricSeries::new(retention))
            .push(Sample::new(value, timestamp_ms));
    }

    /// Clone the current state of every series in a domain.
    pub fn snapshot(&self, domain: Domain) -> DomainSnapshot {
        let mut metrics = HashMap::new();
        for entry in self.series.iter() {
            if entry.key().domain == domain {
                metrics.insert(entry.key().metric.clone(), entry.value().snapshot());
            }
        }
        DomainSnapshot { metrics }
    }

    /// Update the retention cap, trimming existing series as needed.
    /// Takes effect immediately for existing series and on creation for
    /// new ones.
    pub fn set_retention(&self, retention: usize) {
        let retention = retention.max(1);
        self.retention.store(retention, Ordering::Relaxed);
        for mut entry in self.series.iter_mut() {
            entry.value_mut().set_capacity(retention);
        }
    }

    pub fn series_len(&self, domain: Domain, metric: &str) -> usize {
        let key = MetricKey {
            domain,
            metric: metric.to_string(),
        };
        self.series.get(&key).map(|s| s.len()).unwrap_or(0)
    }

    pub fn metric_names(&self, domain: Domain) -> Vec<String> {
        let mut names: Vec<String> = self
            .series
            .iter()
            .filter(|e| e.key().domain == domain)
            .map(|e| e.key().metric.clone())
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_snapshot() {
        let store = MetricStore::new(100);
        store.append(Domain::Market, "price", 100.0, 1);
        store.append(Domain::Market, "price", 101.0, 2);
        store.append(Domain::System, "uptime", 1.0, 1);

        let market = store.snapshot(Domain::Market);
        assert_eq!(market.samples("price").len(), 2);
        assert_eq!(market.latest("price").unwrap().value, 101.0);
        // Domain isolation: system metrics do not leak into market.
        assert!(market.samples("uptime").is_empty());
    }

    #[test]
    fn test_retention_eviction() {
        let store = MetricStore::new(100);
        for i in 0..150u64 {
            store.append(Domain::Market, "price", i as f64, i);
        }

        assert_eq!(store.series_len(Domain::Market, "price"), 100);
        let snap = store.snapshot(Domain::Market);
        assert_eq!(snap.samples("price").first().unwrap().timestamp_ms, 50);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let store = MetricStore::new(10);
        store.append(Domain::Market, "price", 100.0, 1);

        let snap = store.snapshot(Domain::Market);
        store.append(Domain::Market, "price", 200.0, 2);

        // The earlier snapshot is unaffected by later writes.
        assert_eq!(snap.samples("price").len(), 1);
    }

    #[test]
    fn test_window_values_takes_most_recent() {
        let store = MetricStore::new(100);
        for i in 0..10u64 {
            store.append(Domain::Market, "price", i as f64, i);
        }

        let snap = store.snapshot(Domain::Market);
        let window = snap.window_values("price", 3);
        assert_eq!(window, vec![7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_window_mean_skips_garbage() {
        let store = MetricStore::new(100);
        store.append(Domain::System, "api_latency", 100.0, 1);
        store.append(Domain::System, "api_latency", f64::NAN, 2);
        store.append(Domain::System, "api_latency", 300.0, 3);

        let snap = store.snapshot(Domain::System);
        assert_eq!(snap.window_mean("api_latency", 10), Some(200.0));
        assert_eq!(snap.window_mean("missing", 10), None);
    }

    #[test]
    fn test_set_retention_trims() {
        let store = MetricStore::new(100);
        for i in 0..50u64 {
            store.append(Domain::Trading, "fill_rate", 0.9, i);
        }

        store.set_retention(10);
        assert_eq!(store.series_len(Domain::Trading, "fill_rate"), 10);
    }

    #[test]
    fn test_metric_names_sorted() {
        let store = MetricStore::new(10);
        store.append(Domain::Market, "volume", 1.0, 1);
        store.append(Domain::Market, "price", 1.0, 1);

        assert_eq!(store.metric_names(Domain::Market), vec!["price", "volume"]);
    }
}
