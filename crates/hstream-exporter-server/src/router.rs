use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use hstream_exporter_metrics::{MetricsRegistry, SystemMetrics};
use tokio::sync::Semaphore;

use crate::{handlers, logging::LogLevelControl};

pub struct ExporterState {
    pub registry: Arc<MetricsRegistry>,
    pub system_metrics: Option<Arc<SystemMetrics>>,
    pub log_level: LogLevelControl,
    /// `None` when concurrent scrapes are unlimited.
    pub scrape_permits: Option<Arc<Semaphore>>,
    pub scrape_timeout: Duration,
}

impl ExporterState {
    pub fn new(
        registry: Arc<MetricsRegistry>,
        system_metrics: Option<Arc<SystemMetrics>>,
        log_level: LogLevelControl,
        max_requests: usize,
        scrape_timeout: Duration,
    ) -> Self {
        let scrape_permits = (max_requests > 0).then(|| Arc::new(Semaphore::new(max_requests)));

        Self {
            registry,
            system_metrics,
            log_level,
            scrape_permits,
            scrape_timeout,
        }
    }
}

pub fn exporter_router(state: Arc<ExporterState>) -> Router {
    Router::new()
        .route("/", get(handlers::index::landing_page))
        .route("/metrics", get(handlers::metrics::prometheus_metrics))
        .route("/log_level", post(handlers::log_level::update_log_level))
        .with_state(state)
}
