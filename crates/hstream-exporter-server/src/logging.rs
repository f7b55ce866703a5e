//! Process-wide log subscriber with a level that can change at runtime.

use hstream_exporter_common::error::{ExporterError, Result};
use tracing_subscriber::{
    EnvFilter, Registry, filter::LevelFilter, fmt, layer::SubscriberExt, reload,
    util::SubscriberInitExt,
};

/// Line format of the log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Handle to the installed filter, shared with the `/log_level` route.
#[derive(Clone)]
pub struct LogLevelControl {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl LogLevelControl {
    pub fn new(handle: reload::Handle<EnvFilter, Registry>) -> Self {
        Self { handle }
    }

    /// Swaps in a new filter for `level`. Directives from `RUST_LOG` are kept.
    pub fn set_level(&self, level: &str) -> Result<LevelFilter> {
        let level = parse_level(level)?;
        self.handle
            .reload(build_filter(level))
            .map_err(|err| ExporterError::InternalError(format!("failed to reload log filter: {err}")))?;
        Ok(level)
    }

    pub fn current(&self) -> Option<String> {
        self.handle.with_current(|filter| filter.to_string()).ok()
    }
}

/// Installs the global subscriber.
pub fn init(level: &str, format: LogFormat) -> Result<LogLevelControl> {
    let level = parse_level(level)?;
    let (filter, handle) = reload::Layer::new(build_filter(level));
    let json = format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .try_init()
        .map_err(|err| ExporterError::InternalError(format!("failed to install logger: {err}")))?;

    Ok(LogLevelControl::new(handle))
}

/// Accepts the usual level names. `panic` and `fatal` have no tracing
/// counterpart and map to `error`.
pub fn parse_level(level: &str) -> Result<LevelFilter> {
    match level.trim().to_ascii_lowercase().as_str() {
        "panic" | "fatal" | "error" => Ok(LevelFilter::ERROR),
        "warn" | "warning" => Ok(LevelFilter::WARN),
        "info" => Ok(LevelFilter::INFO),
        "debug" => Ok(LevelFilter::DEBUG),
        "trace" => Ok(LevelFilter::TRACE),
        other => Err(ExporterError::InvalidArgument(format!(
            "unrecognized log level: {other:?}"
        ))),
    }
}

fn build_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::from_default_env().add_directive(level.into())
}

#[cfg(test)]
pub(crate) fn test_control() -> (LogLevelControl, impl tracing::Subscriber) {
    let (filter, handle) = reload::Layer::new(build_filter(LevelFilter::INFO));
    let subscriber = tracing_subscriber::registry().with(filter);
    (LogLevelControl::new(handle), subscriber)
}
