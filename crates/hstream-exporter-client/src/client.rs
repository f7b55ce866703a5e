use async_trait::async_trait;
use hstream_exporter_common::error::Result;

use crate::types::{StatEntry, StatKind};

/// Boundary to the cluster's administrative interface.
///
/// Every failure is reported through the returned `Result`; implementations
/// must not panic on a misbehaving server.
#[async_trait]
pub trait AdminClient: Send + Sync {
    /// Lists the `host:port` addresses of every server in the cluster.
    async fn get_server_info(&self) -> Result<Vec<String>>;

    /// Fetches several stats from one server in a single round trip.
    async fn get_stats(&self, target: &str, kinds: &[StatKind]) -> Result<Vec<StatEntry>>;

    /// Sends a free-form admin command to one server and returns the raw
    /// JSON-enveloped response text.
    async fn admin_request(&self, target: &str, command: &str) -> Result<String>;
}
