use std::sync::Arc;

use hstream_exporter_common::error::{ExporterError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Summary,
}

impl MetricType {
    pub fn as_prometheus_type(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
            Self::Summary => "summary",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub metric_type: MetricType,
    pub variable_labels: Vec<String>,
}

impl MetricDescriptor {
    pub fn new(name: &str, help: &str, metric_type: MetricType, variable_labels: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            metric_type,
            variable_labels: variable_labels.iter().map(|label| (*label).to_string()).collect(),
        }
    }

    /// Pairs each variable label with the value at the same position.
    pub fn label_pairs(&self, values: &[String]) -> Vec<(String, String)> {
        self.variable_labels
            .iter()
            .cloned()
            .zip(values.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Counter(f64),
    Gauge(f64),
    Histogram {
        buckets: Vec<(f64, u64)>,
        count: u64,
        sum: f64,
    },
    /// Pre-computed quantiles as `(quantile, value)` pairs.
    Summary {
        quantiles: Vec<(f64, f64)>,
        count: u64,
        sum: f64,
    },
}

impl MetricValue {
    pub fn metric_type(&self) -> MetricType {
        match self {
            Self::Counter(_) => MetricType::Counter,
            Self::Gauge(_) => MetricType::Gauge,
            Self::Histogram { .. } => MetricType::Histogram,
            Self::Summary { .. } => MetricType::Summary,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricSample {
    pub labels: Vec<(String, String)>,
    pub value: MetricValue,
}

#[derive(Debug, Clone)]
pub struct CollectedMetric {
    pub descriptor: MetricDescriptor,
    pub samples: Vec<MetricSample>,
}

/// A single typed value produced by a [`Collector`](crate::Collector).
///
/// Label values line up positionally with the descriptor's variable labels.
#[derive(Debug, Clone)]
pub struct Observation {
    descriptor: Arc<MetricDescriptor>,
    label_values: Vec<String>,
    value: MetricValue,
}

impl Observation {
    pub fn new(
        descriptor: Arc<MetricDescriptor>,
        label_values: Vec<String>,
        value: MetricValue,
    ) -> Result<Self> {
        if label_values.len() != descriptor.variable_labels.len() {
            return Err(ExporterError::InvalidArgument(format!(
                "metric {} expects {} label values, got {}",
                descriptor.name,
                descriptor.variable_labels.len(),
                label_values.len()
            )));
        }

        if value.metric_type() != descriptor.metric_type {
            return Err(ExporterError::InvalidArgument(format!(
                "metric {} is a {}, got a {} value",
                descriptor.name,
                descriptor.metric_type.as_prometheus_type(),
                value.metric_type().as_prometheus_type()
            )));
        }

        Ok(Self {
            descriptor,
            label_values,
            value,
        })
    }

    pub fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    pub fn value(&self) -> &MetricValue {
        &self.value
    }

    /// Returns the value of the named label, if the descriptor declares it.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.descriptor
            .variable_labels
            .iter()
            .position(|label| label == name)
            .and_then(|index| self.label_values.get(index))
            .map(String::as_str)
    }

    pub fn into_sample(self) -> MetricSample {
        MetricSample {
            labels: self.descriptor.label_pairs(&self.label_values),
            value: self.value,
        }
    }
}
