//! Cycle lifecycle vocabulary and the report hand-off structures.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::subscriber::SubscriberController;

/// Lifecycle state of a cycle.
///
/// Ordered so that `state >= Requested` means "somebody is subscribed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleState {
    Unrequested,
    Requested,
    Active,
    /// Terminal.
    Undefined,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleState::Unrequested => write!(f, "UNREQUESTED"),
            CycleState::Requested => write!(f, "REQUESTED"),
            CycleState::Active => write!(f, "ACTIVE"),
            CycleState::Undefined => write!(f, "UNDEFINED"),
        }
    }
}

/// Why a collection window opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Initiation {
    Requested,
    Trigger,
    RepeatPeriod,
    Undefine,
}

impl fmt::Display for Initiation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Initiation::Requested => write!(f, "REQUESTED"),
            Initiation::Trigger => write!(f, "TRIGGER"),
            Initiation::RepeatPeriod => write!(f, "REPEAT_PERIOD"),
            Initiation::Undefine => write!(f, "UNDEFINE"),
        }
    }
}

/// Why a collection window closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Termination {
    Trigger,
    Duration,
    /// Event cycles: no new tags for the stable-set interval.
    StableSet,
    /// Command cycles: no new tags for the interval.
    NoNewTags,
    /// Port cycles: no new events for the interval.
    NoNewEvents,
    DataAvailable,
    Count,
    Error,
    Unrequested,
    Undefine,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Termination::Trigger => "TRIGGER",
            Termination::Duration => "DURATION",
            Termination::StableSet => "STABLE_SET",
            Termination::NoNewTags => "NO_NEW_TAGS",
            Termination::NoNewEvents => "NO_NEW_EVENTS",
            Termination::DataAvailable => "DATA_AVAILABLE",
            Termination::Count => "COUNT",
            Termination::Error => "ERROR",
            Termination::Unrequested => "UNREQUESTED",
            Termination::Undefine => "UNDEFINE",
        };
        write!(f, "{}", name)
    }
}

/// Immutable snapshot handed to the reporting side when a window closes.
#[derive(Clone)]
pub struct ReportsInfo<D> {
    pub cycle: String,
    /// Subscribers active at report time.
    pub subscribers: Vec<Arc<dyn SubscriberController>>,
    pub datas: D,
    pub created: DateTime<Utc>,
    pub total_milliseconds: i64,
    pub initiation: Initiation,
    pub initiation_trigger: Option<String>,
    pub termination: Termination,
    pub termination_trigger: Option<String>,
}

impl<D: fmt::Debug> fmt::Debug for ReportsInfo<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uris: Vec<&str> = self.subscribers.iter().map(|s| s.uri()).collect();
        f.debug_struct("ReportsInfo")
            .field("cycle", &self.cycle)
            .field("subscribers", &uris)
            .field("datas", &self.datas)
            .field("created", &self.created)
            .field("total_milliseconds", &self.total_milliseconds)
            .field("initiation", &self.initiation)
            .field("initiation_trigger", &self.initiation_trigger)
            .field("termination", &self.termination)
            .field("termination_trigger", &self.termination_trigger)
            .finish()
    }
}

/// A finished report as delivered to subscribers.
///
/// The envelope is common to all cycle kinds; the kind-specific content
/// lives in `body`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub cycle: String,
    pub kind: String,
    pub date: DateTime<Utc>,
    pub total_milliseconds: i64,
    pub initiation: Initiation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiation_trigger: Option<String>,
    pub termination: Termination,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_trigger: Option<String>,
    pub body: serde_json::Value,
}

impl CycleReport {
    /// Build the envelope from a window snapshot.
    pub fn from_info<D>(kind: impl Into<String>, info: &ReportsInfo<D>, body: serde_json::Value) -> Self {
        Self {
            cycle: info.cycle.clone(),
            kind: kind.into(),
            date: info.created,
            total_milliseconds: info.total_milliseconds,
            initiation: info.initiation,
            initiation_trigger: info.initiation_trigger.clone(),
            termination: info.termination,
            termination_trigger: info.termination_trigger.clone(),
            body,
        }
    }
}
