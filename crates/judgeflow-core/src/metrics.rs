//! Counter/histogram surface for job throughput, retry counts, and
//! rate-limit decisions (ambient concern carried despite the HTTP/admin
//! Non-goals — see SPEC_FULL.md §1). Grounded on the accumulation idiom in
//! `dashflow-observability::cost::CostTracker`, but exposed behind a trait
//! rather than a concrete registry so a caller can wire it to whatever
//! exporter it likes; no `/metrics` HTTP endpoint is implemented here.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Ambient telemetry sink. Labels are a fixed small set per call site
/// (queue name, task name, outcome) so a `&str` key is enough; no label
/// cardinality explosion is expected at this scale.
pub trait Metrics: Send + Sync {
    fn incr_counter(&self, name: &str, labels: &[(&str, &str)]);
    fn observe_histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]);
}

/// Discards everything. Default when no telemetry backend is wired.
#[derive(Debug, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn incr_counter(&self, _name: &str, _labels: &[(&str, &str)]) {}
    fn observe_histogram(&self, _name: &str, _value: f64, _labels: &[(&str, &str)]) {}
}

/// In-process accumulation, useful for tests and for a caller that wants to
/// poll current values rather than push to an exporter.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counters: DashMap<String, AtomicU64>,
    histograms: DashMap<String, Vec<f64>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str, labels: &[(&str, &str)]) -> String {
        let mut key = name.to_string();
        for (k, v) in labels {
            key.push(',');
            key.push_str(k);
            key.push('=');
            key.push_str(v);
        }
        key
    }

    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        self.counters.get(&Self::key(name, labels)).map(|c| c.load(Ordering::Relaxed)).unwrap_or(0)
    }

    pub fn histogram_count(&self, name: &str, labels: &[(&str, &str)]) -> usize {
        self.histograms.get(&Self::key(name, labels)).map(|v| v.len()).unwrap_or(0)
    }
}

impl Metrics for InMemoryMetrics {
    fn incr_counter(&self, name: &str, labels: &[(&str, &str)]) {
        self.counters.entry(Self::key(name, labels)).or_insert_with(|| AtomicU64::new(0)).fetch_add(1, Ordering::Relaxed);
    }

    fn observe_histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        self.histograms.entry(Self::key(name, labels)).or_default().push(value);
    }
}
