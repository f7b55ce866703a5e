use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use hstream_exporter_metrics::CONTENT_TYPE;
use tracing::{error, warn};

use crate::router::ExporterState;

/// Renders every registered metric family.
///
/// The render runs on its own task and holds the concurrency permit until it
/// finishes, so a request that times out still counts against the limit.
pub async fn prometheus_metrics(State(state): State<Arc<ExporterState>>) -> Response {
    let permit = match &state.scrape_permits {
        Some(permits) => match Arc::clone(permits).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                warn!("concurrent scrape limit reached");
                return unavailable("limit of concurrent scrape requests reached, try again later\n");
            }
        },
        None => None,
    };

    if let Some(system_metrics) = &state.system_metrics {
        system_metrics.refresh();
    }

    let registry = Arc::clone(&state.registry);
    let render = tokio::spawn(async move {
        let payload = registry.render_prometheus().await;
        drop(permit);
        payload
    });

    match tokio::time::timeout(state.scrape_timeout, render).await {
        Ok(Ok(payload)) => {
            let mut response = Response::new(Body::from(payload));
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE));
            response
        }
        Ok(Err(err)) => {
            error!(error = %err, "metrics render task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render metrics\n").into_response()
        }
        Err(_) => {
            warn!(timeout = ?state.scrape_timeout, "scrape exceeded its timeout");
            unavailable("exceeded configured timeout\n")
        }
    }
}

fn unavailable(message: &'static str) -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, message).into_response()
}
