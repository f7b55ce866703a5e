use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use hstream_exporter_metrics::{
    Collector, MetricDescriptor, MetricType, MetricValue, Observation, ObservationSink,
};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::{
    catalog::{MetricDefinition, NAMESPACE},
    scraper::{ScrapeCycle, Scraper},
    stats::ScrapeStats,
    targets::TargetSet,
};

/// Scrapes every known server on each exposition pull.
pub struct ClusterCollector {
    scraper: Arc<Scraper>,
    targets: Arc<TargetSet>,
    metrics: Arc<[MetricDefinition]>,
    stats: Arc<ScrapeStats>,
    success_total: Arc<MetricDescriptor>,
    failed_total: Arc<MetricDescriptor>,
}

impl ClusterCollector {
    pub fn new(
        scraper: Arc<Scraper>,
        targets: Arc<TargetSet>,
        metrics: Vec<MetricDefinition>,
        stats: Arc<ScrapeStats>,
    ) -> Self {
        Self {
            scraper,
            targets,
            metrics: metrics.into(),
            stats,
            success_total: Arc::new(MetricDescriptor::new(
                &format!("{NAMESPACE}_scrape_success_scrape_count"),
                "Total number of successful scrape requests.",
                MetricType::Counter,
                &[],
            )),
            failed_total: Arc::new(MetricDescriptor::new(
                &format!("{NAMESPACE}_scrape_failed_scrape_count"),
                "Total number of failed scrape requests.",
                MetricType::Counter,
                &[],
            )),
        }
    }

    /// Runs one scrape cycle over a snapshot of the target set.
    ///
    /// Targets that report any failure are dropped from the set; the next
    /// membership refresh brings them back if they are still in the cluster.
    pub async fn scrape_cycle(&self, sink: &ObservationSink) {
        let targets = self.targets.snapshot();
        let cycle = Arc::new(ScrapeCycle::new());
        let mut tasks = JoinSet::new();

        for target in targets.iter().cloned() {
            let scraper = Arc::clone(&self.scraper);
            let metrics = Arc::clone(&self.metrics);
            let cycle = Arc::clone(&cycle);
            let sink = sink.clone();

            tasks.spawn(async move {
                let started = Instant::now();
                let outcome = scraper.scrape(&target, &metrics, &cycle, &sink).await;
                (target, outcome, started.elapsed())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (target, outcome, latency) = match joined {
                Ok(done) => done,
                Err(err) => {
                    error!(error = %err, "scrape task did not complete");
                    continue;
                }
            };

            debug!(
                target = %target,
                succeeded = outcome.succeeded,
                failed = outcome.failed,
                latency_ms = latency.as_millis() as u64,
                "scraped server"
            );
            self.stats.record(&target, outcome, latency);

            if !outcome.is_clean() {
                match self.targets.remove(&target) {
                    Ok(true) => warn!(
                        target = %target,
                        failed = outcome.failed,
                        "removing server from scrape targets"
                    ),
                    Ok(false) => {}
                    Err(err) => error!(target = %target, error = %err, "failed to remove server"),
                }
            }
        }

        self.emit_total(&self.success_total, self.stats.succeeded(), sink);
        self.emit_total(&self.failed_total, self.stats.failed(), sink);
    }

    fn emit_total(&self, descriptor: &Arc<MetricDescriptor>, total: u64, sink: &ObservationSink) {
        match Observation::new(
            Arc::clone(descriptor),
            Vec::new(),
            MetricValue::Counter(total as f64),
        ) {
            Ok(observation) => {
                sink.emit(observation);
            }
            Err(err) => error!(metric = %descriptor.name, error = %err, "dropping scrape total"),
        }
    }
}

#[async_trait]
impl Collector for ClusterCollector {
    fn describe(&self) -> Vec<MetricDescriptor> {
        self.metrics
            .iter()
            .map(|definition| definition.descriptor().as_ref().clone())
            .chain([
                self.success_total.as_ref().clone(),
                self.failed_total.as_ref().clone(),
            ])
            .collect()
    }

    async fn collect(&self, sink: ObservationSink) {
        self.scrape_cycle(&sink).await;
    }
}
