mod cli;
mod handlers;
mod logging;
mod router;

use std::{sync::Arc, time::Duration};

use clap::Parser;
use hstream_exporter_client::{AdminClient, HttpAdminClient};
use hstream_exporter_collector::{
    ClusterCollector, NAMESPACE, ScrapeStats, Scraper, SummaryOptions, TargetSet,
    default_catalog,
};
use hstream_exporter_metrics::{MetricsRegistry, SystemMetrics};
use tracing::{info, warn};

use crate::{
    cli::Cli,
    router::{ExporterState, exporter_router},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let log_level = logging::init(&cli.log_level, cli.log_format)?;

    if cli.timeout <= cli.request_timeout {
        warn!(
            timeout = cli.timeout,
            request_timeout = cli.request_timeout,
            "scrape timeout should be longer than the per-request timeout"
        );
    }

    let http_client = HttpAdminClient::new(&cli.addr, Duration::from_secs(cli.request_timeout))?;
    let bootstrap = http_client.bootstrap().to_string();
    let client: Arc<dyn AdminClient> = Arc::new(http_client);

    let targets = Arc::new(TargetSet::discover(client.as_ref()).await?);
    info!(url = %bootstrap, "connected to hstream cluster");
    let _refresh = targets.spawn_refresh(
        Arc::clone(&client),
        Duration::from_secs(cli.get_server_info_duration),
    );

    let registry = Arc::new(MetricsRegistry::new());
    let system_metrics = if cli.disable_exporter_metrics {
        None
    } else {
        Some(Arc::new(SystemMetrics::register(&registry, NAMESPACE)?))
    };
    let stats = Arc::new(ScrapeStats::register(&registry)?);
    let scraper = Arc::new(Scraper::new(
        client,
        SummaryOptions::new(cli.summary_interval.clone()),
    ));
    registry.register_collector(Arc::new(ClusterCollector::new(
        scraper,
        targets,
        default_catalog(),
        stats,
    )))?;

    let state = Arc::new(ExporterState::new(
        registry,
        system_metrics,
        log_level,
        cli.max_request,
        Duration::from_secs(cli.timeout),
    ));
    let app = exporter_router(state);

    let addr = cli.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("hstream exporter listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
