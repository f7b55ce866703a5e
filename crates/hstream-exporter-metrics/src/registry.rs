use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, RwLock},
};

use futures::future::join_all;
use hstream_exporter_common::error::{ExporterError, Result};
use tracing::error;

use crate::{
    collector::{Collector, ObservationSink},
    family::{GaugeMetric, HistogramMetric, OwnedFamily},
    text::encode_family,
    types::{CollectedMetric, MetricDescriptor},
};

/// Every metric family exposed on one endpoint.
///
/// Family names are unique across owned metrics and collectors.
pub struct MetricsRegistry {
    owned: RwLock<BTreeMap<String, Arc<dyn OwnedFamily>>>,
    collectors: RwLock<Vec<Arc<dyn Collector>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            owned: RwLock::new(BTreeMap::new()),
            collectors: RwLock::new(Vec::new()),
        }
    }

    pub fn register_gauge(
        &self,
        name: &str,
        help: &str,
        variable_labels: &[&str],
    ) -> Result<Arc<GaugeMetric>> {
        let gauge = Arc::new(GaugeMetric::new(name, help, variable_labels));
        self.register_owned(Arc::clone(&gauge) as Arc<dyn OwnedFamily>)?;
        Ok(gauge)
    }

    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        variable_labels: &[&str],
        buckets: &[f64],
    ) -> Result<Arc<HistogramMetric>> {
        let histogram = Arc::new(HistogramMetric::new(name, help, variable_labels, buckets));
        self.register_owned(Arc::clone(&histogram) as Arc<dyn OwnedFamily>)?;
        Ok(histogram)
    }

    pub fn register_collector(&self, collector: Arc<dyn Collector>) -> Result<()> {
        let names = collector
            .describe()
            .into_iter()
            .map(|descriptor| descriptor.name)
            .collect::<Vec<_>>();
        self.ensure_unused(&names)?;

        self.collectors
            .write()
            .map_err(|_| lock_poisoned("collector"))?
            .push(collector);
        Ok(())
    }

    /// Descriptors of every owned metric and every registered collector,
    /// sorted by name.
    pub fn describe_all(&self) -> Vec<MetricDescriptor> {
        let mut descriptors = match self.owned.read() {
            Ok(owned) => owned
                .values()
                .map(|family| family.descriptor().clone())
                .collect(),
            Err(_) => Vec::new(),
        };
        for collector in self.collectors_snapshot() {
            descriptors.extend(collector.describe());
        }

        descriptors.sort_by(|left, right| left.name.cmp(&right.name));
        descriptors
    }

    /// Runs every collector and renders all families in the text format.
    ///
    /// Collectors write into one shared sink that is drained while they run,
    /// so a slow collector never holds back what the others produced.
    pub async fn render_prometheus(&self) -> String {
        let mut families = self.owned_samples();

        let collectors = self.collectors_snapshot();
        let (sink, mut observations) = ObservationSink::channel();
        let produce = async move {
            join_all(
                collectors
                    .iter()
                    .map(|collector| collector.collect(sink.clone())),
            )
            .await;
        };
        let consume = async {
            while let Some(observation) = observations.recv().await {
                families
                    .entry(observation.descriptor().name.clone())
                    .or_insert_with(|| CollectedMetric {
                        descriptor: observation.descriptor().clone(),
                        samples: Vec::new(),
                    })
                    .samples
                    .push(observation.into_sample());
            }
        };
        tokio::join!(produce, consume);

        let mut output = String::new();
        for family in families.values() {
            if let Err(err) = encode_family(&mut output, family) {
                error!(metric = %family.descriptor.name, error = %err, "failed to encode metric family");
            }
        }
        output
    }

    fn register_owned(&self, family: Arc<dyn OwnedFamily>) -> Result<()> {
        let name = family.descriptor().name.clone();
        self.ensure_unused(std::slice::from_ref(&name))?;

        self.owned
            .write()
            .map_err(|_| lock_poisoned("metrics"))?
            .insert(name, family);
        Ok(())
    }

    fn ensure_unused(&self, names: &[String]) -> Result<()> {
        let mut known = self
            .describe_all()
            .into_iter()
            .map(|descriptor| descriptor.name)
            .collect::<HashSet<_>>();

        match names.iter().find(|name| !known.insert((*name).clone())) {
            Some(name) => Err(ExporterError::InvalidArgument(format!(
                "metric already registered: {name}"
            ))),
            None => Ok(()),
        }
    }

    fn owned_samples(&self) -> BTreeMap<String, CollectedMetric> {
        let owned = match self.owned.read() {
            Ok(owned) => owned,
            Err(_) => return BTreeMap::new(),
        };

        owned
            .iter()
            .map(|(name, family)| {
                let collected = CollectedMetric {
                    descriptor: family.descriptor().clone(),
                    samples: family.samples(),
                };
                (name.clone(), collected)
            })
            .collect()
    }

    fn collectors_snapshot(&self) -> Vec<Arc<dyn Collector>> {
        match self.collectors.read() {
            Ok(collectors) => collectors.clone(),
            Err(_) => Vec::new(),
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_poisoned(which: &str) -> ExporterError {
    ExporterError::InternalError(format!("{which} registry lock poisoned"))
}
