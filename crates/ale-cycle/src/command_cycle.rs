//! Command cycles: run commands on every newly seen tag.
//!
//! Each first-seen tag that has commands is executed asynchronously on the
//! reader that saw it; answers are merged into the tag's record under the
//! data guard. `tagsProcessedCount` closes the window on the Cth first-seen
//! tag. With `afterError`, a failed result closes the window with `ERROR`
//! once no execution is in flight and no tag was added since the last one
//! was dispatched.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use ale_protocols::{
    CCSpec, CommandOp, CycleData, DecodedTag, ExecuteCallback, ExecuteRequest, ExecuteResult,
    KeyField, OperationResult, OperationStatus, ReaderOperation, ReportsInfo, TagRecord,
    TagReports, Tags, Termination,
};

use crate::boundary::{command_boundary, CommandBoundary};
use crate::common_cycle::CommonCycle;
use crate::context::CycleContext;
use crate::cycle::{assemble, delegate_cycle};
use crate::error::{CycleError, CycleResult};
use crate::kind::{CycleKind, WindowStart};
use crate::tag_cycle::{ReaderSet, TagCycle};

/// Execution bookkeeping of one window.
#[derive(Debug, Default)]
struct CommandWindow {
    window: u64,
    /// Distinct tags recorded.
    processed: u64,
    in_flight: usize,
    error: bool,
    /// Collection as it was when the last execution was dispatched.
    last_exec: Option<Tags>,
}

impl CommandWindow {
    fn sync(&mut self, window: u64) {
        if self.window != window {
            *self = Self {
                window,
                ..Self::default()
            };
        }
    }
}

struct NewTag {
    window: u64,
    count_reached: bool,
    commands: Vec<CommandOp>,
}

pub struct CommandKind {
    reports: Arc<dyn TagReports>,
    pipeline: TagCycle,
    key_fields: Vec<KeyField>,
    count: Option<u64>,
    after_error: bool,
    // Leaf lock, taken while holding the data guard.
    window: Mutex<CommandWindow>,
}

impl CommandKind {
    pub fn pipeline(&self) -> &TagCycle {
        &self.pipeline
    }

    fn execute(&self, cycle: &CommonCycle<Self>, reader: &str, key: String, tag: DecodedTag, new: NewTag) {
        let window = new.window;
        let failed = |commands: &[CommandOp]| {
            ExecuteResult::completed(
                commands
                    .iter()
                    .map(|c| OperationResult::failure(&c.name, OperationStatus::MiscError))
                    .collect(),
            )
        };
        let Some(target) = self.pipeline.reader(reader) else {
            warn!(cycle = %cycle.name(), reader, "Tag seen by an unknown reader, commands not run");
            self.merge(cycle, window, &key, failed(&new.commands));
            return;
        };

        let weak = cycle.weak();
        let callback_key = key.clone();
        let callback: ExecuteCallback = Arc::new(move |result: ExecuteResult| {
            if let Some(cycle) = weak.upgrade() {
                cycle.kind().merge(&cycle, window, &callback_key, result);
            }
        });
        let request = ExecuteRequest::Tag {
            tag: tag.into_tag(),
            commands: new.commands.clone(),
        };
        if let Err(err) = target.execute(request, callback) {
            warn!(cycle = %cycle.name(), reader, error = %err, "Command dispatch failed");
            self.merge(cycle, window, &key, failed(&new.commands));
        }
    }

    /// Fold an execution answer into the tag's record.
    fn merge(&self, cycle: &CommonCycle<Self>, window: u64, key: &str, result: ExecuteResult) {
        let failure = result.has_failure();
        let escalate = cycle.with_datas(|datas, current| {
            if current != window {
                return false;
            }
            if let Some(record) = datas.get_mut(key) {
                record.merge_results(result.results);
                if result.completed {
                    record.completed = true;
                }
            }
            let mut state = self.window.lock();
            if state.window != window {
                return false;
            }
            if result.completed {
                state.in_flight = state.in_flight.saturating_sub(1);
            }
            state.error |= failure;
            self.after_error
                && state.error
                && state.in_flight == 0
                && state.last_exec.as_ref().is_some_and(|last| datas.has_same_data(last))
        });
        if failure {
            debug!(cycle = %cycle.name(), window, tag = key, "Command failed");
        }
        if escalate == Some(true) && cycle.terminate(Some(window), Termination::Error, None) {
            warn!(cycle = %cycle.name(), window, "Command errors, window closed");
        }
    }
}

impl CycleKind for CommandKind {
    type Data = Tags;
    const LABEL: &'static str = "command";

    fn interval_termination(&self) -> Termination {
        Termination::NoNewTags
    }

    fn enqueue(&self, info: ReportsInfo<Tags>) {
        self.reports.enqueue(info);
    }

    fn on_cycle_started(&self, cycle: &CommonCycle<Self>, start: &WindowStart) {
        debug!(
            cycle = %cycle.name(),
            window = start.window,
            initiation = %start.initiation,
            count = self.count,
            after_error = self.after_error,
            "Command cycle started"
        );
    }

    fn notify_tag(&self, cycle: &CommonCycle<Self>, reader: &str, tag: DecodedTag) {
        let key = tag.primary_key(&self.key_fields);
        let outcome = cycle.with_datas(|datas, window| {
            if let Some(record) = datas.get_mut(&key) {
                record.sighting(tag.tag());
                return None;
            }
            let matched = self.reports.matches(&tag)?;
            let commands = self.reports.commands(&tag);
            let mut record = TagRecord::new(&tag);
            record.completed = matched && commands.is_empty();
            datas.add(key.clone(), record);

            let mut state = self.window.lock();
            state.sync(window);
            state.processed += 1;
            if !commands.is_empty() {
                state.in_flight += 1;
                state.last_exec = Some(datas.clone());
            }
            Some(NewTag {
                window,
                count_reached: self.count.is_some_and(|c| state.processed == c),
                commands,
            })
        });
        let Some(Some(new)) = outcome else {
            return;
        };

        cycle.reschedule_interval();
        let window = new.window;
        let count_reached = new.count_reached;
        if !new.commands.is_empty() {
            self.execute(cycle, reader, key, tag, new);
        }
        if count_reached && cycle.terminate(Some(window), Termination::Count, None) {
            debug!(cycle = %cycle.name(), window, "Tag count reached");
        }
    }

    fn on_dispose(&self) {
        self.pipeline.release();
        self.reports.dispose();
    }
}

/// Command cycle built from a [`CCSpec`].
pub struct CommandCycle {
    spec: CCSpec,
    boundary: CommandBoundary,
    cycle: Arc<CommonCycle<CommandKind>>,
}

impl CommandCycle {
    pub fn new(
        name: impl Into<String>,
        spec: CCSpec,
        reports: Arc<dyn TagReports>,
        context: &CycleContext,
    ) -> CycleResult<Self> {
        let name = name.into();
        let boundary = command_boundary(&spec.boundary_spec)?;
        if spec.logical_readers.is_empty() {
            return Err(CycleError::InvalidSpec(format!(
                "command cycle '{}' has no logical readers",
                name
            )));
        }
        if let Some(unnamed) = spec.cmd_specs.iter().find(|c| c.name.trim().is_empty()) {
            return Err(CycleError::InvalidSpec(format!(
                "command cycle '{}' has a command spec without a name ({} operations)",
                name,
                unnamed.operations.len()
            )));
        }

        let guid = Uuid::new_v4().to_string();
        let readers = ReaderSet::lock(context.readers.as_ref(), &guid, &spec.logical_readers, &[])?;
        let operation = ReaderOperation::Inventory(reports.tag_operation());
        let kind = CommandKind {
            key_fields: reports.key_fields(),
            reports,
            pipeline: TagCycle::new(readers, Some(operation), context.decoder.clone()),
            count: boundary.count,
            after_error: boundary.after_error,
            window: Mutex::new(CommandWindow::default()),
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

    pub fn spec(&self) -> &CCSpec {
        &self.spec
    }

    pub fn boundary(&self) -> &CommandBoundary {
        &self.boundary
    }

    pub fn cycle(&self) -> &Arc<CommonCycle<CommandKind>> {
        &self.cycle
    }
}

delegate_cycle!(CommandCycle, CommandKind);
