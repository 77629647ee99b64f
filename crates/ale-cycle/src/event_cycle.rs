//! Event cycles: collect distinct tags and report them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use ale_protocols::{
    DecodedTag, ECSpec, KeyField, ReaderOperation, ReportsInfo, TagRecord, TagReports, Tags,
    Termination,
};

use crate::boundary::{event_boundary, EventBoundary};
use crate::common_cycle::CommonCycle;
use crate::context::CycleContext;
use crate::cycle::{assemble, delegate_cycle};
use crate::error::{CycleError, CycleResult};
use crate::kind::{CycleKind, WindowStart};
use crate::tag_cycle::{ReaderSet, TagCycle};

enum Sighting {
    Rejected,
    Known,
    /// Became reportable on this sighting.
    Completed,
    New { reportable: bool },
}

pub struct EventKind {
    reports: Arc<dyn TagReports>,
    pipeline: TagCycle,
    key_fields: Vec<KeyField>,
    when_data_available: bool,
    /// Window the data-available debounce was armed for.
    armed_window: AtomicU64,
}

impl EventKind {
    pub fn pipeline(&self) -> &TagCycle {
        &self.pipeline
    }

    fn data_available(&self, cycle: &CommonCycle<Self>, window: u64) {
        if self.armed_window.swap(window, Ordering::SeqCst) == window {
            return;
        }
        debug!(cycle = %cycle.name(), window, "Data available, report pending");
        cycle.arm_data_available(cycle.config().reader_cycle_duration());
    }
}

impl CycleKind for EventKind {
    type Data = Tags;
    const LABEL: &'static str = "event";

    fn interval_termination(&self) -> Termination {
        Termination::StableSet
    }

    fn enqueue(&self, info: ReportsInfo<Tags>) {
        self.reports.enqueue(info);
    }

    fn on_cycle_started(&self, cycle: &CommonCycle<Self>, start: &WindowStart) {
        debug!(
            cycle = %cycle.name(),
            window = start.window,
            initiation = %start.initiation,
            readers = self.pipeline.reader_names().len(),
            "Event cycle started"
        );
    }

    fn notify_tag(&self, cycle: &CommonCycle<Self>, _reader: &str, tag: DecodedTag) {
        let key = tag.primary_key(&self.key_fields);
        let outcome = cycle.with_datas(|datas, window| {
            if let Some(record) = datas.get_mut(&key) {
                record.sighting(tag.tag());
                if !record.completed && self.reports.is_completed(record) {
                    record.completed = true;
                    return (window, Sighting::Completed);
                }
                return (window, Sighting::Known);
            }
            let Some(reportable) = self.reports.matches(&tag) else {
                return (window, Sighting::Rejected);
            };
            let mut record = TagRecord::new(&tag);
            record.completed = reportable;
            datas.add(key.clone(), record);
            (window, Sighting::New { reportable })
        });
        let Some((window, sighting)) = outcome else {
            return;
        };
        match sighting {
            Sighting::Rejected | Sighting::Known | Sighting::New { reportable: false } => {}
            Sighting::Completed | Sighting::New { reportable: true } => {
                if self.when_data_available {
                    self.data_available(cycle, window);
                } else {
                    cycle.reschedule_interval();
                }
            }
        }
    }

    fn on_dispose(&self) {
        self.pipeline.release();
        self.reports.dispose();
    }
}

/// Event cycle built from an [`ECSpec`].
pub struct EventCycle {
    spec: ECSpec,
    boundary: EventBoundary,
    cycle: Arc<CommonCycle<EventKind>>,
}

impl EventCycle {
    pub fn new(
        name: impl Into<String>,
        spec: ECSpec,
        reports: Arc<dyn TagReports>,
        context: &CycleContext,
    ) -> CycleResult<Self> {
        let name = name.into();
        let boundary = event_boundary(&spec.boundary_spec)?;
        if spec.logical_readers.is_empty() {
            return Err(CycleError::InvalidSpec(format!("event cycle '{}' has no logical readers", name)));
        }

        let guid = Uuid::new_v4().to_string();
        let readers = ReaderSet::lock(context.readers.as_ref(), &guid, &spec.logical_readers, &[])?;
        let operation = ReaderOperation::Inventory(reports.tag_operation());
        let kind = EventKind {
            key_fields: reports.key_fields(),
            reports,
            pipeline: TagCycle::new(readers, Some(operation), context.decoder.clone()),
            when_data_available: boundary.when_data_available,
            armed_window: AtomicU64::new(0),
        };
        let cycle = CommonCycle::new(
            guid,
            name,
            kind,
            boundary.base.params,
            context.config.clone(),
            context.timer.clone(),
        );
        let cycle = assemble(cycle, context, &boundary.base, |cycle| cycle.kind().pipeline.define(cycle))?;
        Ok(Self { spec, boundary, cycle })
    }

    pub fn spec(&self) -> &ECSpec {
        &self.spec
    }

    pub fn boundary(&self) -> &EventBoundary {
        &self.boundary
    }

    pub fn cycle(&self) -> &Arc<CommonCycle<EventKind>> {
        &self.cycle
    }
}

delegate_cycle!(EventCycle, EventKind);
