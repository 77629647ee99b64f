//! # ALE Config
//!
//! TOML configuration for the `ale` binary: engine tuning, logging,
//! simulated readers, manual triggers and the cycle definitions.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
