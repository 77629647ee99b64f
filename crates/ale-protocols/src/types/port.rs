//! GPIO port events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    Input,
    Output,
}

impl std::fmt::Display for PortKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortKind::Input => write!(f, "in"),
            PortKind::Output => write!(f, "out"),
        }
    }
}

/// A port state change observed on a reader, or a synthetic event raised by
/// a trigger for schedule-only port cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortEvent {
    pub reader: String,
    pub kind: PortKind,
    pub id: u16,
    pub state: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
}

impl PortEvent {
    pub fn input(reader: impl Into<String>, id: u16, state: bool) -> Self {
        Self {
            reader: reader.into(),
            kind: PortKind::Input,
            id,
            state,
            timestamp: Utc::now(),
            trigger: None,
        }
    }

    /// Synthetic event standing for a trigger firing.
    pub fn triggered(uri: impl Into<String>) -> Self {
        Self {
            reader: String::new(),
            kind: PortKind::Input,
            id: 0,
            state: true,
            timestamp: Utc::now(),
            trigger: Some(uri.into()),
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.trigger.is_some()
    }

    /// Identity used to drop repeated deliveries of the same event.
    pub fn identity(&self) -> String {
        match &self.trigger {
            Some(uri) => format!("trigger|{}|{}", uri, self.timestamp.timestamp_micros()),
            None => format!(
                "{}|{}{}|{}|{}",
                self.reader,
                self.kind,
                self.id,
                u8::from(self.state),
                self.timestamp.timestamp_micros()
            ),
        }
    }
}
