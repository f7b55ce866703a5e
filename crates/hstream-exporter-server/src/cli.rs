use clap::Parser;
use hstream_exporter_client::DEFAULT_REQUEST_TIMEOUT;

use crate::logging::LogFormat;

#[derive(Parser, Debug)]
#[command(name = "hstream-exporter", about = "Prometheus exporter for HStream clusters")]
pub struct Cli {
    /// Server used to discover the rest of the cluster.
    #[arg(long, env = "HSTREAM_EXPORTER_ADDR", default_value = "hstream://127.0.0.1:6570")]
    pub addr: String,

    /// Address the metrics endpoint listens on. A bare `:port` binds every interface.
    #[arg(long, env = "HSTREAM_EXPORTER_LISTEN_ADDR", default_value = "0.0.0.0:9200")]
    pub listen_addr: String,

    /// Leave out metrics about the exporter process itself.
    #[arg(long, env = "HSTREAM_EXPORTER_DISABLE_EXPORTER_METRICS", default_value_t = false)]
    pub disable_exporter_metrics: bool,

    /// Maximum number of concurrent scrape requests. 0 disables the limit.
    #[arg(long, env = "HSTREAM_EXPORTER_MAX_REQUEST", default_value_t = 0)]
    pub max_request: usize,

    /// Seconds allowed for each scrape request.
    #[arg(
        long,
        env = "HSTREAM_EXPORTER_TIMEOUT",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    #[arg(long, env = "HSTREAM_EXPORTER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "HSTREAM_EXPORTER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Seconds between cluster membership refreshes.
    #[arg(
        long,
        env = "HSTREAM_EXPORTER_GET_SERVER_INFO_DURATION",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub get_server_info_duration: u64,

    /// Seconds allowed for each request to a cluster server.
    #[arg(
        long,
        env = "HSTREAM_EXPORTER_REQUEST_TIMEOUT",
        default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub request_timeout: u64,

    /// Sampling window of the latency summaries, e.g. `5s`, `1min`, `10min`.
    #[arg(long, env = "HSTREAM_EXPORTER_SUMMARY_INTERVAL", default_value = "1min")]
    pub summary_interval: String,
}

impl Cli {
    pub fn listen_addr(&self) -> String {
        match self.listen_addr.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{port}"),
            None => self.listen_addr.clone(),
        }
    }
}
