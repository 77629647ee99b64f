//! Error types for the cycle engine.

use thiserror::Error;

use ale_protocols::{ReaderError, TriggerError};

/// Errors raised while building or driving a cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    /// Malformed boundary specification.
    #[error("Invalid boundary field {field}: {message}")]
    InvalidBoundary { field: String, message: String },

    /// Malformed report or command specification.
    #[error("Invalid specification: {0}")]
    InvalidSpec(String),

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error(transparent)]
    Trigger(#[from] TriggerError),

    /// Cycle has been disposed.
    #[error("Cycle is undefined: {0}")]
    Disposed(String),

    #[error("Subscriber already registered: {0}")]
    DuplicateSubscriber(String),

    /// Worker thread could not be spawned.
    #[error("Failed to start cycle worker: {0}")]
    Worker(String),
}

impl CycleError {
    pub fn invalid_boundary(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidBoundary {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type for cycle operations.
pub type CycleResult<T> = Result<T, CycleError>;
