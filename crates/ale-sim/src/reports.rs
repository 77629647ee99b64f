//! Reference report builders for each cycle kind.
//!
//! Filtering is by prefix: a pattern matches a tag when the EPC or the
//! decoded identity starts with it. Reports are built and delivered on the
//! calling thread, which is the cycle worker.

use serde_json::{json, Value};
use tracing::{debug, warn};

use ale_protocols::{
    CCCmdSpec, CCSpec, CommandOp, CycleData, CycleReport, DecodedTag, ECReportSpec, ECSpec,
    EventRecord, Events, KeyField, PCReportSpec, PCSpec, PortEvent, PortObservation,
    PortOperation, PortReports, Reports, ReportsInfo, TagOperation, TagRecord, TagReports, Tags,
};

fn prefix_match(patterns: &[String], tag: &DecodedTag) -> bool {
    patterns
        .iter()
        .any(|p| tag.tag().epc.starts_with(p.as_str()) || tag.identity().starts_with(p.as_str()))
}

fn record_match(patterns: &[String], record: &TagRecord) -> bool {
    patterns
        .iter()
        .any(|p| record.tag.epc.starts_with(p.as_str()) || record.identity.starts_with(p.as_str()))
}

/// Hand a finished report to every active subscriber of the snapshot.
fn deliver<D>(kind: &str, info: &ReportsInfo<D>, body: Value) {
    let report = CycleReport::from_info(kind, info, body);
    let mut delivered = 0usize;
    for subscriber in info.subscribers.iter().filter(|s| s.is_active()) {
        match subscriber.deliver(&report) {
            Ok(()) => delivered += 1,
            Err(err) => warn!(
                cycle = %info.cycle,
                subscriber = %subscriber.uri(),
                error = %err,
                "Report delivery failed"
            ),
        }
    }
    debug!(
        cycle = %info.cycle,
        kind,
        termination = %info.termination,
        delivered,
        "Report delivered"
    );
}

fn tag_entry(record: &TagRecord) -> Value {
    json!({
        "epc": record.tag.epc,
        "tid": record.tag.tid,
        "identity": record.identity,
        "reader": record.tag.reader,
        "count": record.sighting_count(),
        "stats": record.stats,
        "results": record.results,
    })
}

// ============================================================================
// Event cycle
// ============================================================================

/// Reports of an event cycle.
pub struct EventReporter {
    name: String,
    reports: Vec<ECReportSpec>,
    key_fields: Vec<KeyField>,
}

impl EventReporter {
    pub fn new(name: impl Into<String>, spec: &ECSpec) -> Self {
        Self {
            name: name.into(),
            reports: spec.report_specs.clone(),
            key_fields: spec.primary_keys.clone(),
        }
    }

    fn needs_tid(&self) -> bool {
        self.key_fields.contains(&KeyField::Tid)
    }

    fn accepts(report: &ECReportSpec, tag: &DecodedTag) -> bool {
        (report.include_patterns.is_empty() || prefix_match(&report.include_patterns, tag))
            && !prefix_match(&report.exclude_patterns, tag)
    }

    fn build(&self, datas: &Tags) -> Value {
        let groups: Vec<Value> = self
            .reports
            .iter()
            .filter_map(|report| {
                let tags: Vec<Value> = datas
                    .completed()
                    .filter(|r| {
                        (report.include_patterns.is_empty() || record_match(&report.include_patterns, r))
                            && !record_match(&report.exclude_patterns, r)
                    })
                    .map(tag_entry)
                    .collect();
                if tags.is_empty() && !report.report_if_empty {
                    return None;
                }
                Some(json!({ "name": report.name, "tags": tags }))
            })
            .collect();
        json!({ "reports": groups, "total": datas.len() })
    }
}

impl Reports<Tags> for EventReporter {
    fn enqueue(&self, info: ReportsInfo<Tags>) {
        let body = self.build(&info.datas);
        deliver("event", &info, body);
    }
}

impl TagReports for EventReporter {
    fn tag_operation(&self) -> TagOperation {
        TagOperation {
            id: format!("{}-inventory", self.name),
            commands: Vec::new(),
        }
    }

    fn matches(&self, tag: &DecodedTag) -> Option<bool> {
        if !self.reports.is_empty() && !self.reports.iter().any(|r| Self::accepts(r, tag)) {
            return None;
        }
        if self.needs_tid() && tag.tag().tid.is_none() {
            return Some(false);
        }
        Some(true)
    }

    fn is_completed(&self, record: &TagRecord) -> bool {
        !self.needs_tid() || record.tag.tid.is_some()
    }

    fn key_fields(&self) -> Vec<KeyField> {
        self.key_fields.clone()
    }
}

// ============================================================================
// Command cycle
// ============================================================================

/// Reports of a command cycle.
pub struct CommandReporter {
    name: String,
    cmd_specs: Vec<CCCmdSpec>,
}

impl CommandReporter {
    pub fn new(name: impl Into<String>, spec: &CCSpec) -> Self {
        Self {
            name: name.into(),
            cmd_specs: spec.cmd_specs.clone(),
        }
    }

    fn applicable<'a>(&'a self, tag: &'a DecodedTag) -> impl Iterator<Item = &'a CCCmdSpec> + 'a {
        self.cmd_specs
            .iter()
            .filter(move |s| s.filter.is_empty() || prefix_match(&s.filter, tag))
    }
}

impl Reports<Tags> for CommandReporter {
    fn enqueue(&self, info: ReportsInfo<Tags>) {
        let groups: Vec<Value> = self
            .cmd_specs
            .iter()
            .map(|spec| {
                let tags: Vec<Value> = info
                    .datas
                    .iter()
                    .map(|(_, r)| r)
                    .filter(|r| spec.filter.is_empty() || record_match(&spec.filter, r))
                    .map(tag_entry)
                    .collect();
                json!({ "name": spec.name, "tags": tags })
            })
            .collect();
        deliver("command", &info, json!({ "cmdReports": groups, "total": info.datas.len() }));
    }
}

impl TagReports for CommandReporter {
    fn tag_operation(&self) -> TagOperation {
        TagOperation {
            id: format!("{}-inventory", self.name),
            commands: Vec::new(),
        }
    }

    fn matches(&self, tag: &DecodedTag) -> Option<bool> {
        let mut applicable = self.applicable(tag).peekable();
        applicable.peek()?;
        Some(applicable.all(|s| s.operations.is_empty()))
    }

    fn is_completed(&self, record: &TagRecord) -> bool {
        !record.results.is_empty()
    }

    fn key_fields(&self) -> Vec<KeyField> {
        Vec::new()
    }

    fn commands(&self, tag: &DecodedTag) -> Vec<CommandOp> {
        self.applicable(tag)
            .flat_map(|s| s.operations.iter().cloned())
            .collect()
    }
}

// ============================================================================
// Port cycle
// ============================================================================

/// Reports of a port cycle.
pub struct PortReporter {
    name: String,
    reports: Vec<PCReportSpec>,
}

impl PortReporter {
    pub fn new(name: impl Into<String>, spec: &PCSpec) -> Self {
        Self {
            name: name.into(),
            reports: spec.report_specs.clone(),
        }
    }

    fn accepts(report: &PCReportSpec, event: &PortEvent) -> bool {
        event.is_triggered() || report.ports.is_empty() || report.ports.contains(&event.id)
    }

    fn operation_count(&self) -> usize {
        self.reports.iter().map(|r| r.operations.len()).sum()
    }
}

impl Reports<Events> for PortReporter {
    fn enqueue(&self, info: ReportsInfo<Events>) {
        let groups: Vec<Value> = self
            .reports
            .iter()
            .map(|report| {
                let events: Vec<&EventRecord> = info
                    .datas
                    .iter()
                    .map(|(_, r)| r)
                    .filter(|r| Self::accepts(report, &r.event))
                    .collect();
                json!({ "name": report.name, "events": events })
            })
            .collect();
        deliver("port", &info, json!({ "reports": groups, "total": info.datas.len() }));
    }
}

impl PortReports for PortReporter {
    fn port_observation(&self) -> Option<PortObservation> {
        let mut ports: Vec<u16> = Vec::new();
        for report in &self.reports {
            if report.ports.is_empty() {
                ports.clear();
                break;
            }
            ports.extend(report.ports.iter().copied());
        }
        ports.sort_unstable();
        ports.dedup();
        Some(PortObservation {
            id: format!("{}-ports", self.name),
            ports,
        })
    }

    fn port_operations(&self) -> Vec<PortOperation> {
        self.reports
            .iter()
            .flat_map(|r| r.operations.iter().cloned())
            .collect()
    }

    fn matches(&self, event: &PortEvent) -> Option<bool> {
        if !self.reports.is_empty() && !self.reports.iter().any(|r| Self::accepts(r, event)) {
            return None;
        }
        Some(self.operation_count() == 0)
    }

    fn is_completed(&self, record: &EventRecord) -> bool {
        record.results.len() >= self.operation_count() && record.results.iter().all(|r| r.status.is_success())
    }
}

#[cfg(test)]
#[path = "reports_tests.rs"]
mod tests;
