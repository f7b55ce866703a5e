//! Pull-based metrics exposition in the Prometheus text format.
//!
//! Owned metrics (gauges, histograms) live in the [`MetricsRegistry`] and are
//! updated in place. Metrics mirrored from elsewhere are produced on demand by
//! registered [`Collector`]s, which stream [`Observation`]s into a sink while
//! the registry renders.

pub mod collector;
pub mod family;
pub mod registry;
pub mod system;
pub mod text;
pub mod types;

pub use collector::{Collector, ObservationSink};
pub use family::{GaugeMetric, HistogramMetric, linear_buckets};
pub use registry::MetricsRegistry;
pub use system::SystemMetrics;
pub use text::CONTENT_TYPE;
pub use types::{
    CollectedMetric, MetricDescriptor, MetricSample, MetricType, MetricValue, Observation,
};
