//! Simulated readers and manual triggers.

use serde::{Deserialize, Serialize};

/// A simulated logical reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    pub name: String,

    /// Tag population reported on every generator tick (EPC hex).
    #[serde(default)]
    pub epcs: Vec<String>,

    /// Generator period.
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    /// Input ports toggled every `gpio_period_ms`.
    #[serde(default)]
    pub input_ports: Vec<u16>,

    #[serde(default)]
    pub gpio_period_ms: Option<u64>,

    /// Command and port operation names that always fail on this reader.
    #[serde(default)]
    pub failing_operations: Vec<String>,

    /// Latency of asynchronous executions.
    #[serde(default)]
    pub execute_delay_ms: Option<u64>,
}

fn default_period_ms() -> u64 {
    500
}

impl ReaderConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            epcs: Vec::new(),
            period_ms: default_period_ms(),
            input_ports: Vec::new(),
            gpio_period_ms: None,
            failing_operations: Vec::new(),
            execute_delay_ms: None,
        }
    }
}

/// A manual trigger, `urn:ale:trigger:manual:<name>`.
///
/// RTC triggers need no declaration; cycles reference their URI directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    pub name: String,

    /// Fire automatically at this period; never fired when unset.
    #[serde(default)]
    pub every_ms: Option<u64>,
}
