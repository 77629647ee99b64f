//! Engine tuning.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Cycle engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleConfig {
    /// How long `dispose` waits for the worker to exit.
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,

    /// Single attempt bound when a reader callback contends for cycle locks.
    #[serde(default = "default_data_lock_step_ms")]
    pub data_lock_step_ms: u64,

    /// Overall bound after which a reader callback drops its sighting.
    #[serde(default = "default_data_lock_timeout_ms")]
    pub data_lock_timeout_ms: u64,

    /// Debounce before a when-data-available report fires.
    #[serde(default = "default_reader_cycle_duration_ms")]
    pub reader_cycle_duration_ms: u64,

    /// Worker threads are named `<prefix>-<cycle name>`.
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,
}

fn default_join_timeout_ms() -> u64 {
    5000
}

fn default_data_lock_step_ms() -> u64 {
    50
}

fn default_data_lock_timeout_ms() -> u64 {
    500
}

fn default_reader_cycle_duration_ms() -> u64 {
    100
}

fn default_thread_name_prefix() -> String {
    "ale-cycle".to_string()
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            join_timeout_ms: default_join_timeout_ms(),
            data_lock_step_ms: default_data_lock_step_ms(),
            data_lock_timeout_ms: default_data_lock_timeout_ms(),
            reader_cycle_duration_ms: default_reader_cycle_duration_ms(),
            thread_name_prefix: default_thread_name_prefix(),
        }
    }
}

impl CycleConfig {
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn data_lock_step(&self) -> Duration {
        Duration::from_millis(self.data_lock_step_ms.max(1))
    }

    pub fn data_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.data_lock_timeout_ms)
    }

    pub fn reader_cycle_duration(&self) -> Duration {
        Duration::from_millis(self.reader_cycle_duration_ms)
    }
}
