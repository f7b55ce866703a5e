//! The fixed set of metrics mirrored from the cluster.

use std::sync::Arc;

use hstream_exporter_client::StatKind;
use hstream_exporter_metrics::{MetricDescriptor, MetricType};

pub const NAMESPACE: &str = "hstream_exporter";
pub const SERVER_HOST_LABEL: &str = "server_host";

/// How a definition's values are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricShape {
    Counter,
    Gauge,
    /// Latency percentiles computed by the server.
    PercentileSummary,
}

/// Where a definition's values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatSource {
    /// One stat of the batched stats request, keyed by resource name.
    Batched(StatKind),
    /// A server histogram queried through its own admin command.
    Histogram(&'static str),
}

#[derive(Debug, Clone)]
pub struct MetricDefinition {
    source: StatSource,
    shape: MetricShape,
    descriptor: Arc<MetricDescriptor>,
}

impl MetricDefinition {
    /// A batched counter labelled by `key_label` and the server host.
    pub fn counter(kind: StatKind, subsystem: &str, name: &str, help: &str, key_label: &str) -> Self {
        Self::batched(kind, MetricShape::Counter, subsystem, name, help, key_label)
    }

    /// A batched gauge labelled by `key_label` and the server host.
    pub fn gauge(kind: StatKind, subsystem: &str, name: &str, help: &str, key_label: &str) -> Self {
        Self::batched(kind, MetricShape::Gauge, subsystem, name, help, key_label)
    }

    /// A per-server latency summary read from the server histogram `histogram`.
    pub fn summary(histogram: &'static str, subsystem: &str, name: &str, help: &str) -> Self {
        Self {
            source: StatSource::Histogram(histogram),
            shape: MetricShape::PercentileSummary,
            descriptor: Arc::new(MetricDescriptor::new(
                &fq_name(subsystem, name),
                help,
                MetricType::Summary,
                &[SERVER_HOST_LABEL],
            )),
        }
    }

    fn batched(
        kind: StatKind,
        shape: MetricShape,
        subsystem: &str,
        name: &str,
        help: &str,
        key_label: &str,
    ) -> Self {
        let metric_type = match shape {
            MetricShape::Gauge => MetricType::Gauge,
            _ => MetricType::Counter,
        };

        Self {
            source: StatSource::Batched(kind),
            shape,
            descriptor: Arc::new(MetricDescriptor::new(
                &fq_name(subsystem, name),
                help,
                metric_type,
                &[key_label, SERVER_HOST_LABEL],
            )),
        }
    }

    pub fn source(&self) -> StatSource {
        self.source
    }

    pub fn shape(&self) -> MetricShape {
        self.shape
    }

    pub fn exposed_name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn label_names(&self) -> &[String] {
        &self.descriptor.variable_labels
    }

    pub fn descriptor(&self) -> &Arc<MetricDescriptor> {
        &self.descriptor
    }
}

fn fq_name(subsystem: &str, name: &str) -> String {
    format!("{NAMESPACE}_{subsystem}_{name}")
}

/// Every metric the exporter mirrors from the cluster.
pub fn default_catalog() -> Vec<MetricDefinition> {
    use MetricDefinition as M;
    use StatKind::*;

    vec![
        // streams
        M::counter(StreamAppendInBytes, "stream", "append_in_bytes", "Successfully written bytes to the stream.", "stream"),
        M::counter(StreamAppendInRecords, "stream", "append_in_records", "Successfully written records to the stream.", "stream"),
        M::counter(StreamAppendTotal, "stream", "append_total", "Total number of append requests of a stream.", "stream"),
        M::counter(StreamAppendFailed, "stream", "append_failed", "Total number of failed append requests of a stream.", "stream"),
        M::counter(StreamReadInBytes, "stream", "read_in_bytes", "Successfully read bytes from the stream.", "stream"),
        M::counter(StreamReadInBatches, "stream", "read_in_batches", "Successfully read batches from the stream.", "stream"),
        M::summary("append_latency", "stream", "append_latency", "Stream append latency."),
        M::summary("read_latency", "stream", "read_latency", "Stream read latency."),
        // subscriptions
        M::counter(SubSendOutBytes, "subscription", "send_out_bytes", "Bytes sent by each subscription.", "subId"),
        M::counter(SubSendOutRecords, "subscription", "send_out_records", "Records sent by each subscription.", "subId"),
        M::counter(SubSendOutRecordsFailed, "subscription", "send_out_records_failed", "Records each subscription failed to send.", "subId"),
        M::counter(SubResendRecords, "subscription", "resend_records", "Records resent by each subscription.", "subId"),
        M::counter(SubResendRecordsFailed, "subscription", "resend_records_failed", "Records each subscription failed to resend.", "subId"),
        M::counter(SubReceivedAcks, "subscription", "received_acks", "Acks received by each subscription.", "subId"),
        M::counter(SubRequestMessages, "subscription", "request_messages", "Requests received from clients per subscription.", "subId"),
        M::counter(SubResponseMessages, "subscription", "response_messages", "Responses sent to clients per subscription.", "subId"),
        M::gauge(SubCheckListSize, "subscription", "checklist_size", "Number of unacknowledged records tracked per subscription.", "subId"),
        // connectors
        M::counter(ConnectorDeliveredInRecords, "connector", "delivered_in_records", "Connector successfully delivered in records.", "connector"),
        M::counter(ConnectorDeliveredInBytes, "connector", "delivered_in_bytes", "Connector successfully delivered in bytes.", "connector"),
        M::gauge(ConnectorIsAlive, "connector", "is_alive", "Connector alive state.", "connector"),
        // queries and views
        M::counter(QueryTotalInputRecords, "query", "total_input_records", "Total number of records read from source.", "query_id"),
        M::counter(QueryTotalOutputRecords, "query", "total_output_records", "Total number of records written to sink.", "query_id"),
        M::counter(QueryTotalExecuteErrors, "query", "total_execute_errors", "Total number of query execute errors.", "query_id"),
        M::counter(ViewTotalExecuteQueries, "view", "total_execute_queries", "Total queries executed against the view.", "view_id"),
        // cache store
        M::counter(CacheStoreAppendInBytes, "cache_store", "append_in_bytes", "Successfully written bytes to the cache store.", "column_family"),
        M::counter(CacheStoreAppendInRecords, "cache_store", "append_in_records", "Successfully written records to the cache store.", "column_family"),
        M::gauge(CacheStoreAppendTotal, "cache_store", "append_total", "Number of successful append requests of a cache store.", "column_family"),
        M::gauge(CacheStoreAppendFailed, "cache_store", "append_failed", "Number of failed append requests of a cache store.", "column_family"),
        M::counter(CacheStoreReadInBytes, "cache_store", "read_in_bytes", "Successfully read bytes from the cache store.", "column_family"),
        M::counter(CacheStoreReadInRecords, "cache_store", "read_in_records", "Successfully read records from the cache store.", "column_family"),
        M::counter(CacheStoreDeliveredInRecords, "cache_store", "delivered_in_records", "Successfully delivered records from the cache store.", "column_family"),
        M::gauge(CacheStoreDeliveredTotal, "cache_store", "delivered_total", "Total delivered records from the cache store.", "column_family"),
        M::gauge(CacheStoreDeliveredFailed, "cache_store", "delivered_failed", "Failed delivered records from the cache store.", "column_family"),
        M::summary("append_cache_store_latency", "cache_store", "append_latency", "Append cache store latency."),
        M::summary("read_cache_store_latency", "cache_store", "read_latency", "Read cache store latency."),
        // cluster health checks
        M::summary("check_store_cluster_healthy_latency", "healthy_checker", "check_store_cluster_latency", "Check store cluster healthy latency."),
        M::summary("check_meta_cluster_healthy_latency", "healthy_checker", "check_meta_cluster_latency", "Check meta cluster healthy latency."),
    ]
}
