use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use hstream_exporter_common::error::Result;
use hstream_exporter_metrics::{HistogramMetric, MetricsRegistry, linear_buckets};

use crate::{
    catalog::{NAMESPACE, SERVER_HOST_LABEL},
    scraper::ScrapeOutcome,
};

/// Cumulative scrape bookkeeping shared by every scrape cycle.
pub struct ScrapeStats {
    succeeded: AtomicU64,
    failed: AtomicU64,
    latency_ms: Arc<HistogramMetric>,
}

impl ScrapeStats {
    pub fn register(registry: &MetricsRegistry) -> Result<Self> {
        let latency_ms = registry.register_histogram(
            &format!("{NAMESPACE}_scrape_latency"),
            "Histogram for per scrape latency.",
            &[SERVER_HOST_LABEL],
            &linear_buckets(0.0, 10.0, 10),
        )?;

        Ok(Self {
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            latency_ms,
        })
    }

    /// Folds one target's outcome into the totals. Latency is only kept for
    /// targets that scraped without any failure, keyed by the full
    /// `host:port` so servers sharing a host stay apart.
    pub fn record(&self, target: &str, outcome: ScrapeOutcome, latency: Duration) {
        self.succeeded
            .fetch_add(u64::from(outcome.succeeded), Ordering::Relaxed);
        self.failed
            .fetch_add(u64::from(outcome.failed), Ordering::Relaxed);

        if outcome.is_clean() {
            self.latency_ms
                .observe(&[target], latency.as_millis() as f64);
        }
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn latency_samples(&self, target: &str) -> u64 {
        self.latency_ms.sample_count(&[target])
    }
}
