//! Report delivery errors.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ReportError {
    #[error("Subscriber is disposed: {0}")]
    Disposed(String),

    #[error("Delivery to {uri} failed: {message}")]
    Delivery { uri: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        ReportError::Serialization(err.to_string())
    }
}
