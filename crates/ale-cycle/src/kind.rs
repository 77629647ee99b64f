//! Capability interface implemented once per cycle kind.

use std::fmt::Debug;
use std::time::Instant;

use tracing::{debug, info, trace};

use ale_protocols::{
    CycleData, CycleState, DecodedTag, Initiation, PortEvent, ReportsInfo, Termination,
};

use crate::common_cycle::CommonCycle;

/// Describes a window that has just opened.
#[derive(Debug, Clone)]
pub struct WindowStart {
    /// Sequence number of the window, unique per cycle.
    pub window: u64,
    pub initiation: Initiation,
    pub trigger: Option<String>,
    pub started_at: Instant,
}

/// Everything the scheduler needs to know about a particular kind of cycle.
///
/// The scheduler itself never inspects tags, events or reports; it calls
/// these hooks at fixed points of the window lifecycle.
pub trait CycleKind: Send + Sync + Sized + 'static {
    /// Collection accumulated during a window.
    type Data: CycleData + Debug;

    /// Short kind name used in logs and reports.
    const LABEL: &'static str;

    /// Termination reason recorded when the inactivity interval expires.
    fn interval_termination(&self) -> Termination;

    /// Hand a closed window to the reporting side.
    fn enqueue(&self, info: ReportsInfo<Self::Data>);

    /// Called with the state lock held; must not call back into the cycle.
    fn on_state_changed(&self, cycle: &str, from: CycleState, to: CycleState) {
        debug!(cycle, kind = Self::LABEL, %from, %to, "Cycle state changed");
    }

    /// A window opened. The data collection is already cleared.
    fn on_cycle_started(&self, cycle: &CommonCycle<Self>, start: &WindowStart) {
        debug!(
            cycle = %cycle.name(),
            kind = Self::LABEL,
            window = start.window,
            initiation = %start.initiation,
            trigger = start.trigger.as_deref().unwrap_or(""),
            "Cycle started"
        );
    }

    /// A window closed; called before `enqueue`.
    fn on_cycle_finished(&self, cycle: &str, info: &ReportsInfo<Self::Data>) {
        info!(
            cycle,
            kind = Self::LABEL,
            termination = %info.termination,
            entries = info.datas.len(),
            subscribers = info.subscribers.len(),
            elapsed_ms = info.total_milliseconds,
            "Cycle finished"
        );
    }

    /// Observability hook run for every decoded tag before `notify_tag`.
    fn on_tag(&self, cycle: &str, reader: &str, tag: &DecodedTag) {
        trace!(cycle, reader, epc = %tag.tag().epc, "Tag notified");
    }

    fn on_port(&self, cycle: &str, reader: &str, event: &PortEvent) {
        trace!(cycle, reader, port = event.id, state = event.state, "Port event notified");
    }

    fn notify_tag(&self, _cycle: &CommonCycle<Self>, _reader: &str, _tag: DecodedTag) {}

    fn notify_port(&self, _cycle: &CommonCycle<Self>, _reader: &str, _event: PortEvent) {}

    /// Release kind-owned resources. Runs after the worker has exited.
    fn on_dispose(&self) {}
}
