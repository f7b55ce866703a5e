use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("request to {target} failed: {message}")]
    Transport { target: String, message: String },
    #[error("cluster discovery failed: {0}")]
    Discovery(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl ExporterError {
    pub fn transport(target: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Transport {
            target: target.into(),
            message: message.to_string(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;
