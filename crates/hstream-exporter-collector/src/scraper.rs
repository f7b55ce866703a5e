//! Per-server scrape of every catalog metric.
//!
//! Counter and gauge metrics share one batched stats request per server.
//! Summary metrics each need their own admin command, issued concurrently.
//! Observations go to the sink as soon as they are built.

use std::{
    collections::BTreeMap,
    iter::Sum,
    ops::Add,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::future::join_all;
use hstream_exporter_client::{AdminClient, StatEntry, StatKind};
use hstream_exporter_common::addr::host_of;
use hstream_exporter_metrics::{MetricValue, Observation, ObservationSink};
use tracing::{debug, error, warn};

use crate::{
    catalog::{MetricDefinition, MetricShape, StatSource},
    error::ScrapeError,
    parser::{StatsRecord, parse_response},
};

pub const DEFAULT_SUMMARY_INTERVAL: &str = "1min";

/// Shape of the admin command used for summary metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOptions {
    interval: String,
}

impl SummaryOptions {
    pub fn new(interval: impl Into<String>) -> Self {
        Self {
            interval: interval.into(),
        }
    }

    pub fn interval(&self) -> &str {
        &self.interval
    }

    /// The short `5s` window reports p95; longer windows report p90.
    pub fn middle_quantile(&self) -> f64 {
        if self.interval == "5s" { 0.95 } else { 0.90 }
    }

    pub fn quantiles(&self) -> [f64; 3] {
        [0.5, self.middle_quantile(), 0.99]
    }

    pub fn command(&self, histogram: &str) -> String {
        format!(
            "server stats server_histogram {histogram} -i {} -p 0.5 -p 0.75 -p {} -p 0.99",
            self.interval,
            self.middle_quantile()
        )
    }
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self::new(DEFAULT_SUMMARY_INTERVAL)
    }
}

/// State shared by every target of one scrape cycle.
#[derive(Debug, Default)]
pub struct ScrapeCycle {
    liveness_claimed: AtomicBool,
}

impl ScrapeCycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` for exactly one caller per cycle. Liveness is a
    /// cluster-wide fact, so only that caller requests it.
    pub fn claim_liveness(&self) -> bool {
        self.liveness_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Request-level success and failure counts for one target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeOutcome {
    pub succeeded: u32,
    pub failed: u32,
}

impl ScrapeOutcome {
    fn success() -> Self {
        Self {
            succeeded: 1,
            failed: 0,
        }
    }

    fn failure() -> Self {
        Self {
            succeeded: 0,
            failed: 1,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

impl Add for ScrapeOutcome {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            succeeded: self.succeeded.saturating_add(other.succeeded),
            failed: self.failed.saturating_add(other.failed),
        }
    }
}

impl Sum for ScrapeOutcome {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

pub struct Scraper {
    client: Arc<dyn AdminClient>,
    summary: SummaryOptions,
}

impl Scraper {
    pub fn new(client: Arc<dyn AdminClient>, summary: SummaryOptions) -> Self {
        Self { client, summary }
    }

    /// Scrapes `metrics` from one server.
    ///
    /// Every failure is logged and counted here; nothing is propagated.
    pub async fn scrape(
        &self,
        target: &str,
        metrics: &[MetricDefinition],
        cycle: &ScrapeCycle,
        sink: &ObservationSink,
    ) -> ScrapeOutcome {
        let host = host_of(target);
        let mut batched = BTreeMap::new();
        let mut summaries = Vec::new();
        for definition in metrics {
            match definition.source() {
                StatSource::Batched(kind) => {
                    batched.insert(kind, definition);
                }
                StatSource::Histogram(histogram) => summaries.push((histogram, definition)),
            }
        }

        let (batched_outcome, summary_outcome) = tokio::join!(
            self.scrape_batched(target, &host, batched, cycle, sink),
            self.scrape_summaries(target, &host, &summaries, sink),
        );

        batched_outcome + summary_outcome
    }

    async fn scrape_batched(
        &self,
        target: &str,
        host: &str,
        mut batched: BTreeMap<StatKind, &MetricDefinition>,
        cycle: &ScrapeCycle,
        sink: &ObservationSink,
    ) -> ScrapeOutcome {
        batched.retain(|kind, _| !kind.is_liveness() || cycle.claim_liveness());
        if batched.is_empty() {
            return ScrapeOutcome::default();
        }

        let kinds = batched.keys().copied().collect::<Vec<_>>();
        let entries = match self.client.get_stats(target, &kinds).await {
            Ok(entries) => entries,
            Err(err) => {
                error!(target = %target, error = %err, "batched stats request failed");
                return ScrapeOutcome::failure();
            }
        };

        for entry in entries {
            match entry {
                StatEntry::Value { kind, values } => {
                    let Some(definition) = batched.get(&kind) else {
                        warn!(target = %target, stat = %kind, "server returned a stat that was not requested");
                        continue;
                    };

                    for (key, value) in values {
                        debug!(stat = %kind, host = %host, key = %key, value, "scraped stat");
                        emit_batched(definition, key, host, value, sink);
                    }
                }
                StatEntry::Error { kind, message } => {
                    error!(target = %target, stat = %kind, message = %message, "server failed to report stat");
                }
            }
        }

        ScrapeOutcome::success()
    }

    async fn scrape_summaries(
        &self,
        target: &str,
        host: &str,
        summaries: &[(&'static str, &MetricDefinition)],
        sink: &ObservationSink,
    ) -> ScrapeOutcome {
        let pending = summaries.iter().map(|(histogram, definition)| async move {
            match self.scrape_summary(target, host, histogram, definition).await {
                Ok(observation) => {
                    sink.emit(observation);
                    ScrapeOutcome::success()
                }
                Err(err) => {
                    error!(
                        target = %target,
                        metric = %definition.exposed_name(),
                        error = %err,
                        "summary scrape failed"
                    );
                    ScrapeOutcome::failure()
                }
            }
        });

        join_all(pending).await.into_iter().sum()
    }

    async fn scrape_summary(
        &self,
        target: &str,
        host: &str,
        histogram: &str,
        definition: &MetricDefinition,
    ) -> Result<Observation, ScrapeError> {
        let command = self.summary.command(histogram);
        let response = self.client.admin_request(target, &command).await?;
        let record = parse_response(&response)?.into_record(host);
        debug!(metric = %definition.exposed_name(), host = %host, record = ?record, "scraped summary");

        summary_observation(definition, &record, &self.summary.quantiles())
    }
}

fn emit_batched(
    definition: &MetricDefinition,
    key: String,
    host: &str,
    value: i64,
    sink: &ObservationSink,
) {
    let value = match definition.shape() {
        MetricShape::Gauge => MetricValue::Gauge(value as f64),
        _ => MetricValue::Counter(value as f64),
    };

    match Observation::new(
        Arc::clone(definition.descriptor()),
        vec![key, host.to_string()],
        value,
    ) {
        Ok(observation) => {
            sink.emit(observation);
        }
        Err(err) => error!(metric = %definition.exposed_name(), error = %err, "dropping stat"),
    }
}

/// Builds the quantile-only summary for one flattened record.
///
/// Any quantile that is missing or not a number fails the whole metric.
pub(crate) fn summary_observation(
    definition: &MetricDefinition,
    record: &StatsRecord,
    quantiles: &[f64],
) -> Result<Observation, ScrapeError> {
    let quantiles = quantiles
        .iter()
        .map(|quantile| {
            let field = quantile_field(*quantile);
            let raw = record
                .get(&field)
                .ok_or_else(|| ScrapeError::MissingField(field.clone()))?;
            let value = raw
                .trim()
                .parse::<f64>()
                .map_err(|_| ScrapeError::InvalidQuantile {
                    field,
                    value: raw.clone(),
                })?;
            Ok((*quantile, value))
        })
        .collect::<Result<Vec<_>, ScrapeError>>()?;

    let label_values = definition
        .label_names()
        .iter()
        .map(|label| {
            record
                .get(label)
                .cloned()
                .ok_or_else(|| ScrapeError::MissingField(label.clone()))
        })
        .collect::<Result<Vec<_>, ScrapeError>>()?;

    let observation = Observation::new(
        Arc::clone(definition.descriptor()),
        label_values,
        MetricValue::Summary {
            quantiles,
            count: 0,
            sum: 0.0,
        },
    )?;
    Ok(observation)
}

/// `0.5 -> "p50"`, `0.99 -> "p99"`.
fn quantile_field(quantile: f64) -> String {
    format!("p{}", (quantile * 100.0).round() as u32)
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use hstream_exporter_client::{StatEntry, StatKind};
    use hstream_exporter_metrics::{MetricValue, Observation, ObservationSink};

    use super::{ScrapeCycle, ScrapeOutcome, Scraper, SummaryOptions, summary_observation};
    use crate::{
        catalog::{MetricDefinition, default_catalog},
        error::ScrapeError,
        testing::{ScriptedAdmin, summary_response},
    };

    fn append_total() -> MetricDefinition {
        MetricDefinition::counter(
            StatKind::StreamAppendTotal,
            "stream",
            "append_total",
            "Total number of append requests of a stream.",
            "stream",
        )
    }

    fn is_alive() -> MetricDefinition {
        MetricDefinition::gauge(
            StatKind::ConnectorIsAlive,
            "connector",
            "is_alive",
            "Connector alive state.",
            "connector",
        )
    }

    fn append_latency() -> MetricDefinition {
        MetricDefinition::summary("append_latency", "stream", "append_latency", "Stream append latency.")
    }

    fn values(kind: StatKind, pairs: &[(&str, i64)]) -> StatEntry {
        StatEntry::Value {
            kind,
            values: pairs
                .iter()
                .map(|(key, value)| (key.to_string(), *value))
                .collect::<HashMap<_, _>>(),
        }
    }

    async fn run(
        admin: Arc<ScriptedAdmin>,
        summary: SummaryOptions,
        target: &str,
        metrics: &[MetricDefinition],
    ) -> (ScrapeOutcome, Vec<Observation>) {
        let scraper = Scraper::new(admin, summary);
        let (sink, mut rx) = ObservationSink::channel();
        let outcome = scraper
            .scrape(target, metrics, &ScrapeCycle::new(), &sink)
            .await;
        drop(sink);

        let mut observations = Vec::new();
        while let Some(observation) = rx.recv().await {
            observations.push(observation);
        }
        (outcome, observations)
    }

    #[test]
    fn summary_command_tracks_interval() {
        let default = SummaryOptions::default();
        assert_eq!(
            default.command("append_latency"),
            "server stats server_histogram append_latency -i 1min -p 0.5 -p 0.75 -p 0.9 -p 0.99"
        );
        assert_eq!(default.quantiles(), [0.5, 0.9, 0.99]);

        let short = SummaryOptions::new("5s");
        assert_eq!(
            short.command("read_latency"),
            "server stats server_histogram read_latency -i 5s -p 0.5 -p 0.75 -p 0.95 -p 0.99"
        );
        assert_eq!(short.middle_quantile(), 0.95);
    }

    #[test]
    fn liveness_is_claimed_once_per_cycle() {
        let cycle = ScrapeCycle::new();
        assert!(cycle.claim_liveness());
        assert!(!cycle.claim_liveness());
        assert!(ScrapeCycle::new().claim_liveness());
    }

    #[test]
    fn outcomes_add_up() {
        let total: ScrapeOutcome = [
            ScrapeOutcome { succeeded: 1, failed: 0 },
            ScrapeOutcome { succeeded: 0, failed: 1 },
            ScrapeOutcome { succeeded: 2, failed: 0 },
        ]
        .into_iter()
        .sum();
        assert_eq!(total, ScrapeOutcome { succeeded: 3, failed: 1 });
        assert!(!total.is_clean());
    }

    #[tokio::test]
    async fn batched_values_are_labelled_with_key_and_host() {
        let admin = Arc::new(
            ScriptedAdmin::new()
                .with_stats("a:1", vec![values(StatKind::StreamAppendTotal, &[("s1", 5), ("s2", 7)])]),
        );

        let (outcome, observations) =
            run(admin.clone(), SummaryOptions::default(), "a:1", &[append_total()]).await;

        assert_eq!(outcome, ScrapeOutcome { succeeded: 1, failed: 0 });
        assert_eq!(observations.len(), 2);
        let s1 = observations
            .iter()
            .find(|observation| observation.label("stream") == Some("s1"))
            .unwrap();
        assert_eq!(s1.label_values(), ["s1", "a"]);
        assert!(matches!(s1.value(), MetricValue::Counter(value) if *value == 5.0));
        assert_eq!(admin.stats_requests().len(), 1);
    }

    #[tokio::test]
    async fn stats_that_were_not_requested_are_skipped() {
        let admin = Arc::new(ScriptedAdmin::new().with_stats(
            "a:1",
            vec![
                values(StatKind::StreamAppendTotal, &[("s1", 5)]),
                values(StatKind::ConnectorIsAlive, &[("c1", 1)]),
            ],
        ));

        let (outcome, observations) =
            run(admin.clone(), SummaryOptions::default(), "a:1", &[append_total()]).await;

        assert_eq!(outcome, ScrapeOutcome { succeeded: 1, failed: 0 });
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].label("stream"), Some("s1"));
        assert_eq!(admin.stats_requests()[0].1, [StatKind::StreamAppendTotal]);
    }

    #[tokio::test]
    async fn transport_error_counts_one_failure_for_the_whole_batch() {
        let admin = Arc::new(ScriptedAdmin::new().with_stats_error("b:1"));
        let (outcome, observations) = run(
            admin,
            SummaryOptions::default(),
            "b:1",
            &[append_total(), is_alive()],
        )
        .await;

        assert_eq!(outcome, ScrapeOutcome { succeeded: 0, failed: 1 });
        assert!(observations.is_empty());
    }

    #[tokio::test]
    async fn per_entry_errors_are_skipped_without_failing_the_request() {
        let admin = Arc::new(ScriptedAdmin::new().with_stats(
            "a:1",
            vec![
                StatEntry::Error {
                    kind: StatKind::ConnectorIsAlive,
                    message: "not supported".to_string(),
                },
                values(StatKind::StreamAppendTotal, &[("s1", 1)]),
            ],
        ));

        let (outcome, observations) = run(
            admin,
            SummaryOptions::default(),
            "a:1",
            &[append_total(), is_alive()],
        )
        .await;

        assert_eq!(outcome, ScrapeOutcome { succeeded: 1, failed: 0 });
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].descriptor().name, "hstream_exporter_stream_append_total");
    }

    #[tokio::test]
    async fn gauges_report_gauge_values() {
        let admin = Arc::new(
            ScriptedAdmin::new()
                .with_stats("a:1", vec![values(StatKind::ConnectorIsAlive, &[("sink-1", 1)])]),
        );

        let (_, observations) =
            run(admin, SummaryOptions::default(), "a:1", &[is_alive()]).await;

        assert_eq!(observations.len(), 1);
        assert!(matches!(observations[0].value(), MetricValue::Gauge(value) if *value == 1.0));
    }

    #[tokio::test]
    async fn liveness_is_only_requested_by_the_first_target() {
        let admin = Arc::new(
            ScriptedAdmin::new()
                .with_stats("a:1", vec![values(StatKind::ConnectorIsAlive, &[("c", 1)])])
                .with_stats("b:1", vec![values(StatKind::ConnectorIsAlive, &[("c", 1)])]),
        );
        let scraper = Scraper::new(admin.clone(), SummaryOptions::default());
        let cycle = ScrapeCycle::new();
        let (sink, _rx) = ObservationSink::channel();
        let metrics = [append_total(), is_alive()];

        scraper.scrape("a:1", &metrics, &cycle, &sink).await;
        scraper.scrape("b:1", &metrics, &cycle, &sink).await;

        let requests = admin.stats_requests();
        assert_eq!(requests.len(), 2);
        let with_liveness = requests
            .iter()
            .filter(|(_, kinds)| kinds.contains(&StatKind::ConnectorIsAlive))
            .count();
        assert_eq!(with_liveness, 1);
    }

    #[tokio::test]
    async fn nothing_is_requested_when_only_liveness_was_already_claimed() {
        let admin = Arc::new(ScriptedAdmin::new());
        let scraper = Scraper::new(admin.clone(), SummaryOptions::default());
        let cycle = ScrapeCycle::new();
        assert!(cycle.claim_liveness());
        let (sink, _rx) = ObservationSink::channel();

        let outcome = scraper.scrape("a:1", &[is_alive()], &cycle, &sink).await;

        assert_eq!(outcome, ScrapeOutcome::default());
        assert!(admin.stats_requests().is_empty());
    }

    #[tokio::test]
    async fn summary_is_built_from_the_command_response() {
        let admin = Arc::new(ScriptedAdmin::new().with_command(
            "10.0.0.5:6570",
            "append_latency",
            &summary_response(&[("p50", "1.0"), ("p75", "1.5"), ("p90", "2.0"), ("p99", "3.0")]),
        ));

        let (outcome, observations) = run(
            admin.clone(),
            SummaryOptions::default(),
            "10.0.0.5:6570",
            &[append_latency()],
        )
        .await;

        assert_eq!(outcome, ScrapeOutcome { succeeded: 1, failed: 0 });
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].label_values(), ["10.0.0.5"]);
        match observations[0].value() {
            MetricValue::Summary { quantiles, count, sum } => {
                assert_eq!(quantiles, &vec![(0.5, 1.0), (0.9, 2.0), (0.99, 3.0)]);
                assert_eq!(*count, 0);
                assert_eq!(*sum, 0.0);
            }
            other => panic!("unexpected value {other:?}"),
        }
        assert_eq!(
            admin.commands_sent(),
            [(
                "10.0.0.5:6570".to_string(),
                "server stats server_histogram append_latency -i 1min -p 0.5 -p 0.75 -p 0.9 -p 0.99"
                    .to_string()
            )]
        );
    }

    #[tokio::test]
    async fn short_interval_reads_p95() {
        let admin = Arc::new(ScriptedAdmin::new().with_command(
            "a:1",
            "append_latency",
            &summary_response(&[("p50", "1"), ("p95", "4"), ("p99", "9")]),
        ));

        let (_, observations) =
            run(admin, SummaryOptions::new("5s"), "a:1", &[append_latency()]).await;

        match observations[0].value() {
            MetricValue::Summary { quantiles, .. } => {
                assert_eq!(quantiles, &vec![(0.5, 1.0), (0.95, 4.0), (0.99, 9.0)]);
            }
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[tokio::test]
    async fn each_summary_failure_is_counted_separately() {
        let admin = Arc::new(
            ScriptedAdmin::new()
                .with_stats("a:1", vec![values(StatKind::StreamAppendTotal, &[("s1", 1)])])
                .with_command("a:1", "append_latency", "not json")
                .with_command_error("a:1", "read_latency"),
        );
        let read_latency =
            MetricDefinition::summary("read_latency", "stream", "read_latency", "Stream read latency.");

        let (outcome, observations) = run(
            admin,
            SummaryOptions::default(),
            "a:1",
            &[append_total(), append_latency(), read_latency],
        )
        .await;

        assert_eq!(outcome, ScrapeOutcome { succeeded: 1, failed: 2 });
        assert_eq!(observations.len(), 1);
    }

    #[tokio::test]
    async fn full_catalog_issues_one_batch_and_one_command_per_summary() {
        let admin = Arc::new(ScriptedAdmin::new());
        let catalog = default_catalog();
        let summaries = catalog
            .iter()
            .filter(|definition| matches!(definition.source(), crate::StatSource::Histogram(_)))
            .count();

        let (outcome, _) = run(admin.clone(), SummaryOptions::default(), "a:1", &catalog).await;

        assert_eq!(admin.stats_requests().len(), 1);
        assert_eq!(admin.commands_sent().len(), summaries);
        assert_eq!(outcome.failed as usize, summaries + 1);
    }

    #[test]
    fn missing_or_malformed_quantiles_fail_the_summary() {
        let definition = append_latency();
        let mut record = HashMap::from([
            ("p50".to_string(), "1.0".to_string()),
            ("p90".to_string(), "2.0".to_string()),
            ("server_host".to_string(), "h1".to_string()),
        ]);

        let missing = summary_observation(&definition, &record, &[0.5, 0.9, 0.99]).unwrap_err();
        assert!(matches!(missing, ScrapeError::MissingField(field) if field == "p99"));

        record.insert("p99".to_string(), "fast".to_string());
        let invalid = summary_observation(&definition, &record, &[0.5, 0.9, 0.99]).unwrap_err();
        assert!(matches!(invalid, ScrapeError::InvalidQuantile { field, .. } if field == "p99"));

        record.insert("p99".to_string(), "3.0".to_string());
        let observation = summary_observation(&definition, &record, &[0.5, 0.9, 0.99]).unwrap();
        assert_eq!(observation.label("server_host"), Some("h1"));
    }
}
