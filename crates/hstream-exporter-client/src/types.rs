use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

/// Statistics a server can answer in one batched stats request.
///
/// The serialized name is the identifier the admin interface understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    StreamAppendInBytes,
    StreamAppendInRecords,
    StreamAppendTotal,
    StreamAppendFailed,
    StreamReadInBytes,
    StreamReadInBatches,

    SubSendOutBytes,
    SubSendOutRecords,
    SubSendOutRecordsFailed,
    SubResendRecords,
    SubResendRecordsFailed,
    SubReceivedAcks,
    SubRequestMessages,
    SubResponseMessages,
    SubCheckListSize,

    ConnectorDeliveredInRecords,
    ConnectorDeliveredInBytes,
    ConnectorIsAlive,

    QueryTotalInputRecords,
    QueryTotalOutputRecords,
    QueryTotalExecuteErrors,

    ViewTotalExecuteQueries,

    CacheStoreAppendInBytes,
    CacheStoreAppendInRecords,
    CacheStoreAppendTotal,
    CacheStoreAppendFailed,
    CacheStoreReadInBytes,
    CacheStoreReadInRecords,
    CacheStoreDeliveredInRecords,
    CacheStoreDeliveredTotal,
    CacheStoreDeliveredFailed,
}

impl StatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StreamAppendInBytes => "stream_append_in_bytes",
            Self::StreamAppendInRecords => "stream_append_in_records",
            Self::StreamAppendTotal => "stream_append_total",
            Self::StreamAppendFailed => "stream_append_failed",
            Self::StreamReadInBytes => "stream_read_in_bytes",
            Self::StreamReadInBatches => "stream_read_in_batches",
            Self::SubSendOutBytes => "sub_send_out_bytes",
            Self::SubSendOutRecords => "sub_send_out_records",
            Self::SubSendOutRecordsFailed => "sub_send_out_records_failed",
            Self::SubResendRecords => "sub_resend_records",
            Self::SubResendRecordsFailed => "sub_resend_records_failed",
            Self::SubReceivedAcks => "sub_received_acks",
            Self::SubRequestMessages => "sub_request_messages",
            Self::SubResponseMessages => "sub_response_messages",
            Self::SubCheckListSize => "sub_check_list_size",
            Self::ConnectorDeliveredInRecords => "connector_delivered_in_records",
            Self::ConnectorDeliveredInBytes => "connector_delivered_in_bytes",
            Self::ConnectorIsAlive => "connector_is_alive",
            Self::QueryTotalInputRecords => "query_total_input_records",
            Self::QueryTotalOutputRecords => "query_total_output_records",
            Self::QueryTotalExecuteErrors => "query_total_execute_errors",
            Self::ViewTotalExecuteQueries => "view_total_execute_queries",
            Self::CacheStoreAppendInBytes => "cache_store_append_in_bytes",
            Self::CacheStoreAppendInRecords => "cache_store_append_in_records",
            Self::CacheStoreAppendTotal => "cache_store_append_total",
            Self::CacheStoreAppendFailed => "cache_store_append_failed",
            Self::CacheStoreReadInBytes => "cache_store_read_in_bytes",
            Self::CacheStoreReadInRecords => "cache_store_read_in_records",
            Self::CacheStoreDeliveredInRecords => "cache_store_delivered_in_records",
            Self::CacheStoreDeliveredTotal => "cache_store_delivered_total",
            Self::CacheStoreDeliveredFailed => "cache_store_delivered_failed",
        }
    }

    /// Whether this stat describes cluster-wide liveness rather than a
    /// per-server quantity.
    pub fn is_liveness(&self) -> bool {
        matches!(self, Self::ConnectorIsAlive)
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a batched stats response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatEntry {
    Value {
        kind: StatKind,
        values: HashMap<String, i64>,
    },
    Error {
        kind: StatKind,
        message: String,
    },
}

impl StatEntry {
    pub fn kind(&self) -> StatKind {
        match self {
            Self::Value { kind, .. } | Self::Error { kind, .. } => *kind,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ServerList {
    pub servers: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StatsRequest {
    pub stats: Vec<StatKind>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StatsResponse {
    pub results: Vec<StatEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CommandRequest {
    pub command: String,
}
