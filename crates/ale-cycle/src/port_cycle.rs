//! Port cycles: react to GPIO events and drive port operations.
//!
//! Without logical readers the cycle runs in trigger-only mode: every start
//! trigger opens a window that runs the configured port operations once and
//! closes with `TRIGGER` when all of them have answered.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use ale_protocols::{
    EventRecord, Events, ExecuteCallback, ExecuteRequest, ExecuteResult, OperationResult,
    OperationStatus, PCSpec, PortEvent, PortOperation, PortReports, ReaderOperation, ReportsInfo,
    Termination,
};

use crate::boundary::{port_boundary, PortBoundary};
use crate::common_cycle::CommonCycle;
use crate::context::CycleContext;
use crate::cycle::{assemble, delegate_cycle};
use crate::error::{CycleError, CycleResult};
use crate::kind::{CycleKind, WindowStart};
use crate::tag_cycle::{ReaderSet, TagCycle};

#[derive(Debug, Default)]
struct PortWindow {
    window: u64,
    /// Trigger that opened the window, reported on trigger-only completion.
    trigger: Option<String>,
    /// Reader batches still unanswered, per event key.
    pending: BTreeMap<String, usize>,
}

impl PortWindow {
    fn sync(&mut self, window: u64) {
        if self.window != window {
            *self = Self {
                window,
                ..Self::default()
            };
        }
    }
}

pub struct PortKind {
    reports: Arc<dyn PortReports>,
    pipeline: TagCycle,
    /// Port operations grouped by target reader.
    batches: BTreeMap<String, Vec<PortOperation>>,
    trigger_only: bool,
    window: Mutex<PortWindow>,
}

impl PortKind {
    pub fn pipeline(&self) -> &TagCycle {
        &self.pipeline
    }

    fn dispatch(&self, cycle: &CommonCycle<Self>, window: u64, key: &str) {
        for (reader, operations) in &self.batches {
            let failed = || {
                ExecuteResult::completed(
                    operations
                        .iter()
                        .map(|op| OperationResult::failure(&op.name, OperationStatus::PortNotFound))
                        .collect(),
                )
            };
            let Some(target) = self.pipeline.reader(reader) else {
                warn!(cycle = %cycle.name(), reader = %reader, "Port operation target not locked");
                self.merge(cycle, window, key, failed());
                continue;
            };
            let weak = cycle.weak();
            let callback_key = key.to_string();
            let callback: ExecuteCallback = Arc::new(move |result: ExecuteResult| {
                if let Some(cycle) = weak.upgrade() {
                    cycle.kind().merge(&cycle, window, &callback_key, result);
                }
            });
            if let Err(err) = target.execute(ExecuteRequest::Ports(operations.clone()), callback) {
                warn!(cycle = %cycle.name(), reader = %reader, error = %err, "Port dispatch failed");
                self.merge(cycle, window, key, failed());
            }
        }
    }

    /// Fold one reader batch answer into the event's record.
    fn merge(&self, cycle: &CommonCycle<Self>, window: u64, key: &str, result: ExecuteResult) {
        let done = cycle.with_datas(|datas, current| {
            if current != window {
                return None;
            }
            let mut state = self.window.lock();
            if state.window != window {
                return None;
            }
            if let Some(record) = datas.get_mut(key) {
                record.merge_results(result.results);
                if result.completed {
                    record.completed = self.reports.is_completed(record);
                }
            }
            if result.completed {
                if let Some(remaining) = state.pending.get_mut(key) {
                    *remaining = remaining.saturating_sub(1);
                    if *remaining == 0 {
                        state.pending.remove(key);
                    }
                }
            }
            (self.trigger_only && state.pending.is_empty()).then(|| state.trigger.clone())
        });
        if let Some(Some(trigger)) = done {
            self.finish_triggered(cycle, window, trigger);
        }
    }

    fn finish_triggered(&self, cycle: &CommonCycle<Self>, window: u64, trigger: Option<String>) {
        if cycle.terminate(Some(window), Termination::Trigger, trigger) {
            debug!(cycle = %cycle.name(), window, "Triggered port operations done");
        }
    }
}

impl CycleKind for PortKind {
    type Data = Events;
    const LABEL: &'static str = "port";

    fn interval_termination(&self) -> Termination {
        Termination::NoNewEvents
    }

    fn enqueue(&self, info: ReportsInfo<Events>) {
        self.reports.enqueue(info);
    }

    fn on_cycle_started(&self, cycle: &CommonCycle<Self>, start: &WindowStart) {
        {
            let mut state = self.window.lock();
            state.sync(start.window);
            state.trigger = start.trigger.clone();
        }
        debug!(
            cycle = %cycle.name(),
            window = start.window,
            initiation = %start.initiation,
            trigger_only = self.trigger_only,
            "Port cycle started"
        );
        if self.trigger_only {
            let uri = start.trigger.clone().unwrap_or_default();
            self.notify_port(cycle, "", PortEvent::triggered(uri));
        }
    }

    fn notify_port(&self, cycle: &CommonCycle<Self>, _reader: &str, event: PortEvent) {
        let key = event.identity();
        let outcome = cycle.with_datas(|datas, window| {
            if datas.contains(&key) {
                return None;
            }
            let matched = self.reports.matches(&event)?;
            let mut record = EventRecord::new(event.clone());
            record.completed = matched;
            datas.add(key.clone(), record);
            let mut state = self.window.lock();
            state.sync(window);
            if !self.batches.is_empty() {
                state.pending.insert(key.clone(), self.batches.len());
            }
            Some((window, state.trigger.clone()))
        });
        let Some(Some((window, trigger))) = outcome else {
            return;
        };

        cycle.reschedule_interval();
        if self.batches.is_empty() {
            if self.trigger_only {
                self.finish_triggered(cycle, window, trigger);
            }
            return;
        }
        self.dispatch(cycle, window, &key);
    }

    fn on_dispose(&self) {
        self.pipeline.release();
        self.reports.dispose();
    }
}

/// Port cycle built from a [`PCSpec`].
pub struct PortCycle {
    spec: PCSpec,
    boundary: PortBoundary,
    cycle: Arc<CommonCycle<PortKind>>,
}

impl PortCycle {
    pub fn new(
        name: impl Into<String>,
        spec: PCSpec,
        reports: Arc<dyn PortReports>,
        context: &CycleContext,
    ) -> CycleResult<Self> {
        let name = name.into();
        let boundary = port_boundary(&spec.boundary_spec)?;
        let trigger_only = spec.logical_readers.is_empty();
        if trigger_only && boundary.base.start_triggers.is_empty() {
            return Err(CycleError::InvalidSpec(format!(
                "port cycle '{}' has neither logical readers nor start triggers",
                name
            )));
        }

        let mut batches: BTreeMap<String, Vec<PortOperation>> = BTreeMap::new();
        for operation in reports.port_operations() {
            batches.entry(operation.reader.clone()).or_default().push(operation);
        }
        let targets: Vec<String> = batches.keys().cloned().collect();

        let guid = Uuid::new_v4().to_string();
        let readers = ReaderSet::lock(context.readers.as_ref(), &guid, &spec.logical_readers, &targets)?;
        let operation = if trigger_only {
            None
        } else {
            reports.port_observation().map(ReaderOperation::Ports)
        };
        let kind = PortKind {
            reports,
            pipeline: TagCycle::new(readers, operation, context.decoder.clone()),
            batches,
            trigger_only: trigger_only || boundary.trigger_only,
            window: Mutex::new(PortWindow::default()),
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

    pub fn spec(&self) -> &PCSpec {
        &self.spec
    }

    pub fn boundary(&self) -> &PortBoundary {
        &self.boundary
    }

    pub fn cycle(&self) -> &Arc<CommonCycle<PortKind>> {
        &self.cycle
    }

    pub fn is_trigger_only(&self) -> bool {
        self.cycle.kind().trigger_only
    }
}

delegate_cycle!(PortCycle, PortKind);
