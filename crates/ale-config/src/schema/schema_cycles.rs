//! Cycle definitions.

use serde::{Deserialize, Serialize};

use ale_protocols::{CCSpec, ECSpec, PCSpec};

/// An event cycle and the subscribers attached at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCycleConfig {
    pub name: String,

    /// Logging subscriber URIs; one named after the cycle when empty.
    #[serde(default)]
    pub subscribers: Vec<String>,

    #[serde(default)]
    pub spec: ECSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandCycleConfig {
    pub name: String,

    #[serde(default)]
    pub subscribers: Vec<String>,

    #[serde(default)]
    pub spec: CCSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortCycleConfig {
    pub name: String,

    #[serde(default)]
    pub subscribers: Vec<String>,

    #[serde(default)]
    pub spec: PCSpec,
}

/// Subscriber URIs for a cycle, defaulting to `log:<name>`.
pub fn subscriber_uris(name: &str, configured: &[String]) -> Vec<String> {
    if configured.is_empty() {
        vec![format!("log:{}", name)]
    } else {
        configured.to_vec()
    }
}
