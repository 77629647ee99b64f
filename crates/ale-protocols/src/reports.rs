//! Per-kind report contracts.
//!
//! A `Reports` implementation owns the filtering rules of a cycle's report
//! specifications and turns closed windows into delivered reports.

use crate::cycle::ReportsInfo;
use crate::data::{CycleData, EventRecord, Events, TagRecord, Tags};
use crate::types::{CommandOp, DecodedTag, KeyField, PortEvent, PortObservation, PortOperation, TagOperation};

pub trait Reports<D: CycleData>: Send + Sync {
    /// Queue a closed window for report generation and delivery.
    fn enqueue(&self, info: ReportsInfo<D>);

    fn dispose(&self) {}
}

/// Reports over tag data, used by event and command cycles.
pub trait TagReports: Reports<Tags> {
    /// Composite inventory operation to define on the cycle's readers.
    fn tag_operation(&self) -> TagOperation;

    /// `None` rejects the tag, `Some(false)` tracks it without reporting it
    /// yet, `Some(true)` makes it reportable now.
    fn matches(&self, tag: &DecodedTag) -> Option<bool>;

    /// Whether a tracked record has everything its report needs.
    fn is_completed(&self, record: &TagRecord) -> bool;

    /// Fields the primary key is built from.
    fn key_fields(&self) -> Vec<KeyField>;

    /// Commands to execute on a newly matched tag.
    fn commands(&self, _tag: &DecodedTag) -> Vec<CommandOp> {
        Vec::new()
    }
}

/// Reports over port events, used by port cycles.
pub trait PortReports: Reports<Events> {
    /// Port observation to define on the cycle's readers, if any.
    fn port_observation(&self) -> Option<PortObservation>;

    /// Port operations to run for each new reportable event.
    fn port_operations(&self) -> Vec<PortOperation>;

    fn matches(&self, event: &PortEvent) -> Option<bool>;

    fn is_completed(&self, record: &EventRecord) -> bool;
}
