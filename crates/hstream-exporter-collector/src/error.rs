use hstream_exporter_common::ExporterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed admin response: {0}")]
    Json(#[source] serde_json::Error),
    #[error("no content field in admin response")]
    MissingContentField,
    #[error("row {row} has {actual} columns, headers declare {expected}")]
    RowLengthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Admin(#[from] ExporterError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("missing field {0} in stats record")]
    MissingField(String),
    #[error("invalid value {value:?} for {field}")]
    InvalidQuantile { field: String, value: String },
}
