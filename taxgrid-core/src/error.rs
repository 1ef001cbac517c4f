use thiserror::Error;

/// Errors raised by the core data model.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid record field '{field}': {reason}")]
    InvalidRecord { field: &'static str, reason: String },
    #[error("invalid percent value '{0}'")]
    InvalidPercent(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
