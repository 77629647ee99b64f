//! Boundary specification parsing and validation.
//!
//! Turns the declarative boundary of each spec kind into [`CycleParams`]
//! plus the trigger lists, rejecting malformed times and boundaries that
//! could never stop.

use ale_protocols::{AleTime, CCBoundarySpec, ECBoundarySpec, PCBoundarySpec};

use crate::error::{CycleError, CycleResult};
use crate::schedule::CycleParams;

/// Parts common to every cycle kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    pub params: CycleParams,
    pub start_triggers: Vec<String>,
    pub stop_triggers: Vec<String>,
}

impl Boundary {
    fn new(
        start_triggers: Vec<String>,
        stop_triggers: Vec<String>,
        duration: Option<&AleTime>,
        repeat_period: Option<&AleTime>,
        interval: (&str, Option<&AleTime>),
    ) -> CycleResult<Self> {
        let params = CycleParams {
            immediate: start_triggers.is_empty(),
            duration: parse_time("duration", duration)?.unwrap_or(0),
            repeat_period: parse_time("repeatPeriod", repeat_period)?.unwrap_or(-1),
            interval: parse_time(interval.0, interval.1)?.unwrap_or(0),
        };
        Ok(Self {
            params,
            start_triggers,
            stop_triggers,
        })
    }

    /// A duration, an inactivity interval or a stop trigger is configured.
    fn has_common_stop(&self) -> bool {
        self.params.duration > 0 || self.params.interval > 0 || !self.stop_triggers.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBoundary {
    pub base: Boundary,
    pub when_data_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBoundary {
    pub base: Boundary,
    /// Stop after this many distinct tags were processed.
    pub count: Option<u64>,
    pub after_error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBoundary {
    pub base: Boundary,
    /// Started by triggers only, with no stop condition: each window runs
    /// the port operations once and closes when they are done.
    pub trigger_only: bool,
}

/// Parse an optional time value in milliseconds.
fn parse_time(field: &str, time: Option<&AleTime>) -> CycleResult<Option<i64>> {
    let Some(time) = time else {
        return Ok(None);
    };
    if !time.unit.eq_ignore_ascii_case("MS") {
        return Err(CycleError::invalid_boundary(
            field,
            format!("unsupported time unit '{}'", time.unit),
        ));
    }
    if time.value < 0 {
        return Err(CycleError::invalid_boundary(
            field,
            format!("negative value {}", time.value),
        ));
    }
    Ok(Some(time.value))
}

/// Legacy single trigger first, then the list, without duplicates.
fn merge_triggers(single: Option<&String>, list: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for uri in single.into_iter().chain(list.iter()) {
        let uri = uri.trim();
        if !uri.is_empty() && !merged.iter().any(|m| m == uri) {
            merged.push(uri.to_string());
        }
    }
    merged
}

pub fn event_boundary(spec: &ECBoundarySpec) -> CycleResult<EventBoundary> {
    let base = Boundary::new(
        merge_triggers(spec.start_trigger.as_ref(), &spec.start_trigger_list),
        merge_triggers(spec.stop_trigger.as_ref(), &spec.stop_trigger_list),
        spec.duration.as_ref(),
        spec.repeat_period.as_ref(),
        ("stableSetInterval", spec.stable_set_interval.as_ref()),
    )?;
    if !base.has_common_stop() && !spec.when_data_available {
        return Err(CycleError::invalid_boundary(
            "boundarySpec",
            "no stop condition: expected duration, stableSetInterval, stopTrigger or whenDataAvailable",
        ));
    }
    Ok(EventBoundary {
        base,
        when_data_available: spec.when_data_available,
    })
}

pub fn command_boundary(spec: &CCBoundarySpec) -> CycleResult<CommandBoundary> {
    let base = Boundary::new(
        merge_triggers(None, &spec.start_triggers),
        merge_triggers(None, &spec.stop_triggers),
        spec.duration.as_ref(),
        spec.repeat_period.as_ref(),
        ("noNewTagsInterval", spec.no_new_tags_interval.as_ref()),
    )?;
    let count = match spec.tags_processed_count {
        Some(c) if c < 0 => {
            return Err(CycleError::invalid_boundary(
                "tagsProcessedCount",
                format!("negative count {}", c),
            ))
        }
        Some(0) | None => None,
        Some(c) => u64::try_from(c).ok(),
    };
    if !base.has_common_stop() && count.is_none() && !spec.after_error {
        return Err(CycleError::invalid_boundary(
            "boundarySpec",
            "no stop condition: expected duration, noNewTagsInterval, stopTrigger, tagsProcessedCount or afterError",
        ));
    }
    Ok(CommandBoundary {
        base,
        count,
        after_error: spec.after_error,
    })
}

pub fn port_boundary(spec: &PCBoundarySpec) -> CycleResult<PortBoundary> {
    let base = Boundary::new(
        merge_triggers(None, &spec.start_triggers),
        merge_triggers(None, &spec.stop_triggers),
        spec.duration.as_ref(),
        spec.repeat_period.as_ref(),
        ("noNewEventsInterval", spec.no_new_events_interval.as_ref()),
    )?;
    let trigger_only = !base.has_common_stop();
    if trigger_only && base.start_triggers.is_empty() {
        return Err(CycleError::invalid_boundary(
            "boundarySpec",
            "no stop condition: expected duration, noNewEventsInterval, stopTrigger or a start trigger",
        ));
    }
    Ok(PortBoundary { base, trigger_only })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: i64) -> Option<AleTime> {
        Some(AleTime::ms(v))
    }

    #[test]
    fn test_event_defaults() {
        let spec = ECBoundarySpec {
            duration: ms(1000),
            ..Default::default()
        };
        let boundary = event_boundary(&spec).unwrap();
        assert_eq!(
            boundary.base.params,
            CycleParams {
                immediate: true,
                duration: 1000,
                repeat_period: -1,
                interval: 0,
            }
        );
        assert!(!boundary.when_data_available);
    }

    #[test]
    fn test_legacy_and_list_triggers_merge() {
        let spec = ECBoundarySpec {
            start_trigger: Some("urn:a".to_string()),
            start_trigger_list: vec!["urn:b".to_string(), "urn:a".to_string()],
            stop_trigger: Some("urn:stop".to_string()),
            ..Default::default()
        };
        let boundary = event_boundary(&spec).unwrap();
        assert_eq!(boundary.base.start_triggers, vec!["urn:a", "urn:b"]);
        assert_eq!(boundary.base.stop_triggers, vec!["urn:stop"]);
        assert!(!boundary.base.params.immediate);
    }

    #[test]
    fn test_event_without_stop_condition_rejected() {
        let spec = ECBoundarySpec {
            repeat_period: ms(1000),
            ..Default::default()
        };
        assert!(matches!(
            event_boundary(&spec),
            Err(CycleError::InvalidBoundary { field, .. }) if field == "boundarySpec"
        ));

        let spec = ECBoundarySpec {
            when_data_available: true,
            ..Default::default()
        };
        assert!(event_boundary(&spec).is_ok());
    }

    #[test]
    fn test_negative_and_unknown_unit_rejected() {
        let spec = ECBoundarySpec {
            duration: ms(-1),
            ..Default::default()
        };
        assert!(matches!(
            event_boundary(&spec),
            Err(CycleError::InvalidBoundary { field, .. }) if field == "duration"
        ));

        let spec = ECBoundarySpec {
            duration: ms(100),
            stable_set_interval: Some(AleTime {
                value: 5,
                unit: "S".to_string(),
            }),
            ..Default::default()
        };
        assert!(matches!(
            event_boundary(&spec),
            Err(CycleError::InvalidBoundary { field, .. }) if field == "stableSetInterval"
        ));

        let spec = ECBoundarySpec {
            duration: Some(AleTime {
                value: 100,
                unit: "ms".to_string(),
            }),
            ..Default::default()
        };
        assert_eq!(event_boundary(&spec).unwrap().base.params.duration, 100);
    }

    #[test]
    fn test_command_count_and_after_error() {
        let spec = CCBoundarySpec {
            tags_processed_count: Some(3),
            ..Default::default()
        };
        let boundary = command_boundary(&spec).unwrap();
        assert_eq!(boundary.count, Some(3));

        let spec = CCBoundarySpec {
            tags_processed_count: Some(-2),
            ..Default::default()
        };
        assert!(matches!(
            command_boundary(&spec),
            Err(CycleError::InvalidBoundary { field, .. }) if field == "tagsProcessedCount"
        ));

        let spec = CCBoundarySpec {
            after_error: true,
            ..Default::default()
        };
        assert!(command_boundary(&spec).unwrap().after_error);

        assert!(command_boundary(&CCBoundarySpec::default()).is_err());
    }

    #[test]
    fn test_command_interval_field() {
        let spec = CCBoundarySpec {
            no_new_tags_interval: ms(250),
            ..Default::default()
        };
        assert_eq!(command_boundary(&spec).unwrap().base.params.interval, 250);
    }

    #[test]
    fn test_port_trigger_only_mode() {
        let spec = PCBoundarySpec {
            start_triggers: vec!["urn:ale:trigger:manual:go".to_string()],
            ..Default::default()
        };
        let boundary = port_boundary(&spec).unwrap();
        assert!(boundary.trigger_only);
        assert!(!boundary.base.params.immediate);

        let spec = PCBoundarySpec {
            start_triggers: vec!["urn:ale:trigger:manual:go".to_string()],
            duration: ms(100),
            ..Default::default()
        };
        assert!(!port_boundary(&spec).unwrap().trigger_only);

        assert!(port_boundary(&PCBoundarySpec::default()).is_err());
    }
}
