//! Trigger errors.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum TriggerError {
    #[error("Invalid trigger URI: {0}")]
    InvalidUri(String),

    #[error("Trigger is disposed: {0}")]
    Disposed(String),
}
