//! Metrics owned by the registry and updated in place.

use std::{
    collections::HashMap,
    sync::{
        Arc, RwLock,
        atomic::{AtomicI64, AtomicU64, Ordering},
    },
};

use crate::types::{MetricDescriptor, MetricSample, MetricType, MetricValue};

/// A family whose current samples can be read at any time.
pub(crate) trait OwnedFamily: Send + Sync {
    fn descriptor(&self) -> &MetricDescriptor;
    fn samples(&self) -> Vec<MetricSample>;
}

/// Series keyed by label values. Missing label values read as empty strings.
struct SeriesMap<S> {
    label_count: usize,
    series: RwLock<HashMap<Vec<String>, Arc<S>>>,
}

impl<S> SeriesMap<S> {
    fn new(label_count: usize) -> Self {
        Self {
            label_count,
            series: RwLock::new(HashMap::new()),
        }
    }

    fn key(&self, labels: &[&str]) -> Vec<String> {
        (0..self.label_count)
            .map(|index| labels.get(index).copied().unwrap_or_default().to_string())
            .collect()
    }

    fn get(&self, labels: &[&str]) -> Option<Arc<S>> {
        let key = self.key(labels);
        self.series.read().ok()?.get(&key).cloned()
    }

    fn get_or_insert_with(&self, labels: &[&str], init: impl FnOnce() -> S) -> Arc<S> {
        if let Some(existing) = self.get(labels) {
            return existing;
        }

        match self.series.write() {
            Ok(mut guard) => Arc::clone(
                guard
                    .entry(self.key(labels))
                    .or_insert_with(|| Arc::new(init())),
            ),
            // Poisoned: the update lands on a detached series and is lost.
            Err(_) => Arc::new(init()),
        }
    }

    fn entries(&self) -> Vec<(Vec<String>, Arc<S>)> {
        match self.series.read() {
            Ok(guard) => guard
                .iter()
                .map(|(labels, series)| (labels.clone(), Arc::clone(series)))
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

pub struct GaugeMetric {
    descriptor: MetricDescriptor,
    series: SeriesMap<AtomicI64>,
}

impl GaugeMetric {
    pub(crate) fn new(name: &str, help: &str, variable_labels: &[&str]) -> Self {
        Self {
            descriptor: MetricDescriptor::new(name, help, MetricType::Gauge, variable_labels),
            series: SeriesMap::new(variable_labels.len()),
        }
    }

    pub fn set(&self, labels: &[&str], value: i64) {
        self.series
            .get_or_insert_with(labels, || AtomicI64::new(0))
            .store(value, Ordering::Relaxed);
    }
}

impl OwnedFamily for GaugeMetric {
    fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    fn samples(&self) -> Vec<MetricSample> {
        self.series
            .entries()
            .into_iter()
            .map(|(labels, value)| MetricSample {
                labels: self.descriptor.label_pairs(&labels),
                value: MetricValue::Gauge(value.load(Ordering::Relaxed) as f64),
            })
            .collect()
    }
}

/// Bucketed distribution with fixed upper bounds plus an implicit `+Inf`.
pub struct HistogramMetric {
    descriptor: MetricDescriptor,
    bounds: Vec<f64>,
    series: SeriesMap<HistogramSeries>,
}

struct HistogramSeries {
    /// Per-bucket (non-cumulative) counts; the last slot is `+Inf`.
    buckets: Vec<AtomicU64>,
    count: AtomicU64,
    sum_bits: AtomicU64,
}

impl HistogramSeries {
    fn new(bounds: usize) -> Self {
        Self {
            buckets: (0..=bounds).map(|_| AtomicU64::new(0)).collect(),
            count: AtomicU64::new(0),
            sum_bits: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    fn add_to_sum(&self, value: f64) {
        let _ = self
            .sum_bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + value).to_bits())
            });
    }

    fn sum(&self) -> f64 {
        f64::from_bits(self.sum_bits.load(Ordering::Relaxed))
    }
}

impl HistogramMetric {
    pub(crate) fn new(name: &str, help: &str, variable_labels: &[&str], bounds: &[f64]) -> Self {
        let mut bounds = bounds.to_vec();
        bounds.sort_by(f64::total_cmp);
        bounds.dedup();

        Self {
            descriptor: MetricDescriptor::new(name, help, MetricType::Histogram, variable_labels),
            bounds,
            series: SeriesMap::new(variable_labels.len()),
        }
    }

    pub fn observe(&self, labels: &[&str], value: f64) {
        let bounds = self.bounds.len();
        let series = self
            .series
            .get_or_insert_with(labels, || HistogramSeries::new(bounds));

        let bucket = self.bounds.partition_point(|bound| *bound < value);
        if let Some(slot) = series.buckets.get(bucket) {
            slot.fetch_add(1, Ordering::Relaxed);
        }
        series.count.fetch_add(1, Ordering::Relaxed);
        series.add_to_sum(value);
    }

    /// Number of observations recorded for one label set.
    pub fn sample_count(&self, labels: &[&str]) -> u64 {
        self.series
            .get(labels)
            .map_or(0, |series| series.count.load(Ordering::Relaxed))
    }
}

impl OwnedFamily for HistogramMetric {
    fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    fn samples(&self) -> Vec<MetricSample> {
        self.series
            .entries()
            .into_iter()
            .map(|(labels, series)| {
                let buckets = self
                    .bounds
                    .iter()
                    .copied()
                    .chain(std::iter::once(f64::INFINITY))
                    .zip(series.buckets.iter())
                    .map(|(bound, slot)| (bound, slot.load(Ordering::Relaxed)))
                    .collect();

                MetricSample {
                    labels: self.descriptor.label_pairs(&labels),
                    value: MetricValue::Histogram {
                        buckets,
                        count: series.count.load(Ordering::Relaxed),
                        sum: series.sum(),
                    },
                }
            })
            .collect()
    }
}

/// `count` buckets of `width`, starting at `start`.
pub fn linear_buckets(start: f64, width: f64, count: usize) -> Vec<f64> {
    (0..count).map(|index| start + width * index as f64).collect()
}
