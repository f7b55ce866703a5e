use std::time::Duration;

use async_trait::async_trait;
use hstream_exporter_common::{
    addr::{ensure_http_scheme, normalize_endpoint},
    error::{ExporterError, Result},
};
use tracing::debug;

use crate::{
    client::AdminClient,
    types::{CommandRequest, ServerList, StatEntry, StatKind, StatsRequest, StatsResponse},
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const SERVERS_PATH: &str = "/v1/cluster/servers";
const STATS_PATH: &str = "/v1/admin/stats";
const COMMAND_PATH: &str = "/v1/admin/command";

/// [`AdminClient`] speaking JSON over HTTP to each server's admin endpoint.
#[derive(Clone)]
pub struct HttpAdminClient {
    bootstrap: String,
    client: reqwest::Client,
}

impl HttpAdminClient {
    pub fn new(bootstrap: &str, request_timeout: Duration) -> Result<Self> {
        let bootstrap = ensure_http_scheme(&normalize_endpoint(bootstrap));
        let parsed = url::Url::parse(&bootstrap).map_err(|err| {
            ExporterError::InvalidArgument(format!("invalid cluster address {bootstrap:?}: {err}"))
        })?;
        if parsed.host_str().is_none() {
            return Err(ExporterError::InvalidArgument(format!(
                "cluster address {bootstrap:?} has no host"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| {
                ExporterError::InternalError(format!("failed to build http client: {err}"))
            })?;

        Ok(Self { bootstrap, client })
    }

    pub fn bootstrap(&self) -> &str {
        &self.bootstrap
    }

    fn server_url(target: &str, path: &str) -> String {
        format!("{}{path}", ensure_http_scheme(&normalize_endpoint(target)))
    }

    fn checked(
        target: &str,
        response: std::result::Result<reqwest::Response, reqwest::Error>,
    ) -> Result<reqwest::Response> {
        let response = response.map_err(|err| ExporterError::transport(target, err))?;
        if !response.status().is_success() {
            return Err(ExporterError::transport(
                target,
                format!("admin endpoint returned status {}", response.status()),
            ));
        }
        Ok(response)
    }
}

#[async_trait]
impl AdminClient for HttpAdminClient {
    async fn get_server_info(&self) -> Result<Vec<String>> {
        let url = format!("{}{SERVERS_PATH}", self.bootstrap);
        let response = Self::checked(&self.bootstrap, self.client.get(&url).send().await)
            .map_err(|err| ExporterError::Discovery(err.to_string()))?;

        let list = response
            .json::<ServerList>()
            .await
            .map_err(|err| ExporterError::Discovery(format!("invalid server list: {err}")))?;

        debug!(bootstrap = %self.bootstrap, servers = ?list.servers, "fetched server list");
        Ok(list.servers)
    }

    async fn get_stats(&self, target: &str, kinds: &[StatKind]) -> Result<Vec<StatEntry>> {
        let request = StatsRequest {
            stats: kinds.to_vec(),
        };
        let response = Self::checked(
            target,
            self.client
                .post(Self::server_url(target, STATS_PATH))
                .json(&request)
                .send()
                .await,
        )?;

        let decoded = response
            .json::<StatsResponse>()
            .await
            .map_err(|err| ExporterError::transport(target, format!("invalid stats body: {err}")))?;

        Ok(decoded.results)
    }

    async fn admin_request(&self, target: &str, command: &str) -> Result<String> {
        let request = CommandRequest {
            command: command.to_string(),
        };
        let response = Self::checked(
            target,
            self.client
                .post(Self::server_url(target, COMMAND_PATH))
                .json(&request)
                .send()
                .await,
        )?;

        response
            .text()
            .await
            .map_err(|err| ExporterError::transport(target, err))
    }
}
