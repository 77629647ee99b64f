//! Logical reader errors.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ReaderError {
    #[error("Logical reader not found: {0}")]
    NotFound(String),

    #[error("Logical reader is in use: {0}")]
    InUse(String),

    #[error("Failed to define operation on reader {reader}: {message}")]
    Define { reader: String, message: String },

    #[error("Operation not defined on reader {reader} for owner {owner}")]
    NotDefined { reader: String, owner: String },

    #[error("Failed to execute operation on reader {reader}: {message}")]
    Execute { reader: String, message: String },

    #[error("Operation not supported by reader {0}")]
    Unsupported(String),
}
