//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use ale_cycle::CycleConfig;

mod schema_cycles;
mod schema_sim;

pub use schema_cycles::*;
pub use schema_sim::*;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Cycle engine tuning.
    #[serde(default)]
    pub engine: CycleConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub readers: Vec<ReaderConfig>,

    #[serde(default)]
    pub triggers: Vec<TriggerConfig>,

    #[serde(default)]
    pub event_cycles: Vec<EventCycleConfig>,

    #[serde(default)]
    pub command_cycles: Vec<CommandCycleConfig>,

    #[serde(default)]
    pub port_cycles: Vec<PortCycleConfig>,
}

impl Config {
    pub fn reader(&self, name: &str) -> Option<&ReaderConfig> {
        self.readers.iter().find(|r| r.name == name)
    }

    /// Names of every configured cycle, all kinds together.
    pub fn cycle_names(&self) -> Vec<&str> {
        self.event_cycles
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.command_cycles.iter().map(|c| c.name.as_str()))
            .chain(self.port_cycles.iter().map(|c| c.name.as_str()))
            .collect()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for daily rolling log files; console only when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    #[serde(default = "default_max_log_files")]
    pub max_log_files: usize,

    /// Emit JSON lines instead of text.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "ale".to_string()
}

fn default_max_log_files() -> usize {
    14
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directory: None,
            file_prefix: default_file_prefix(),
            max_log_files: default_max_log_files(),
            json: false,
        }
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
