use std::sync::Arc;

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hstream_exporter_common::ExporterError;
use tracing::{error, info};

use crate::router::ExporterState;

/// `POST /log_level?debug`: the whole query string is the level name.
pub async fn update_log_level(
    State(state): State<Arc<ExporterState>>,
    RawQuery(query): RawQuery,
) -> Response {
    let level = query.unwrap_or_default();
    info!(level = %level, "received log level update");

    match state.log_level.set_level(&level) {
        Ok(applied) => {
            info!(level = %applied, filter = ?state.log_level.current(), "log level updated");
            (StatusCode::OK, format!("log level set to {applied}\n")).into_response()
        }
        Err(err @ ExporterError::InvalidArgument(_)) => {
            error!(error = %err, "rejected log level update");
            (StatusCode::BAD_REQUEST, format!("{err}\n")).into_response()
        }
        Err(err) => {
            error!(error = %err, "failed to update log level");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{err}\n")).into_response()
        }
    }
}
