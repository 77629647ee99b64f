//! Already-parsed ALE specification structures.
//!
//! These mirror the declarative ECSpec, CCSpec and PCSpec documents. Every
//! field is optional on the wire; validation happens when a cycle is built
//! from them, not here.

use serde::{Deserialize, Serialize};

use crate::types::{CommandOp, KeyField, PortOperation};

/// A time value with a unit. Only `MS` is understood by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AleTime {
    pub value: i64,
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_unit() -> String {
    "MS".to_string()
}

impl AleTime {
    pub fn ms(value: i64) -> Self {
        Self {
            value,
            unit: default_unit(),
        }
    }
}

/// Boundary of an event cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ECBoundarySpec {
    /// Legacy single start trigger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_trigger: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub start_trigger_list: Vec<String>,
    /// Legacy single stop trigger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_trigger: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop_trigger_list: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_period: Option<AleTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<AleTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stable_set_interval: Option<AleTime>,
    pub when_data_available: bool,
}

/// One report of an event cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ECReportSpec {
    pub name: String,
    /// EPC prefixes a tag must match one of; empty matches everything.
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub report_if_empty: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ECSpec {
    pub logical_readers: Vec<String>,
    pub boundary_spec: ECBoundarySpec,
    /// Fields the primary key is built from; empty keys by EPC.
    pub primary_keys: Vec<KeyField>,
    pub report_specs: Vec<ECReportSpec>,
}

/// Boundary of a command cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CCBoundarySpec {
    pub start_triggers: Vec<String>,
    pub stop_triggers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_period: Option<AleTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<AleTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_new_tags_interval: Option<AleTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags_processed_count: Option<i64>,
    pub after_error: bool,
}

/// Commands to run on tags matching `filter` (an EPC prefix, empty for all).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CCCmdSpec {
    pub name: String,
    pub filter: Vec<String>,
    pub operations: Vec<CommandOp>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CCSpec {
    pub logical_readers: Vec<String>,
    pub boundary_spec: CCBoundarySpec,
    pub cmd_specs: Vec<CCCmdSpec>,
}

/// Boundary of a port cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PCBoundarySpec {
    pub start_triggers: Vec<String>,
    pub stop_triggers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_period: Option<AleTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<AleTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_new_events_interval: Option<AleTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PCReportSpec {
    pub name: String,
    /// Input ports observed, empty for all.
    pub ports: Vec<u16>,
    pub operations: Vec<PortOperation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PCSpec {
    /// May be empty for trigger-only cycles.
    pub logical_readers: Vec<String>,
    pub boundary_spec: PCBoundarySpec,
    pub report_specs: Vec<PCReportSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ale_time_default_unit() {
        let time: AleTime = serde_json::from_str(r#"{"value": 500}"#).unwrap();
        assert_eq!(time, AleTime::ms(500));
    }

    #[test]
    fn test_ec_spec_camel_case() {
        let json = r#"{
            "logicalReaders": ["dock"],
            "boundarySpec": {
                "startTrigger": "urn:ale:trigger:manual:go",
                "duration": {"value": 1000, "unit": "MS"},
                "whenDataAvailable": true
            },
            "primaryKeys": ["epc", "antenna"],
            "reportSpecs": [{"name": "all"}]
        }"#;
        let spec: ECSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.logical_readers, vec!["dock"]);
        assert_eq!(spec.boundary_spec.start_trigger.as_deref(), Some("urn:ale:trigger:manual:go"));
        assert_eq!(spec.boundary_spec.duration, Some(AleTime::ms(1000)));
        assert!(spec.boundary_spec.when_data_available);
        assert_eq!(spec.primary_keys, vec![KeyField::Epc, KeyField::Antenna]);
        assert!(spec.boundary_spec.stable_set_interval.is_none());
    }

    #[test]
    fn test_cc_spec_defaults() {
        let spec: CCSpec = serde_json::from_str(r#"{"boundarySpec": {"tagsProcessedCount": 3}}"#).unwrap();
        assert_eq!(spec.boundary_spec.tags_processed_count, Some(3));
        assert!(!spec.boundary_spec.after_error);
        assert!(spec.cmd_specs.is_empty());
    }
}
