//! Worker run loop and the collection window.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::MutexGuard;
use tracing::{debug, error};

use ale_protocols::{CycleState, Initiation, ReportsInfo, Termination};

use crate::common_cycle::{CommonCycle, CycleInner, TimerSlot};
use crate::kind::{CycleKind, WindowStart};
use crate::schedule::{millis, plan_repeat, RepeatPlan};

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl<K: CycleKind> CommonCycle<K> {
    /// Thread body. A panic in the run loop is logged and the worker
    /// reference cleared so that `is_busy` and `dispose` keep working.
    pub(crate) fn worker_main(self: Arc<Self>) {
        debug!(cycle = %self.name, "Cycle worker running");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run()));
        match outcome {
            Ok(()) => debug!(cycle = %self.name, "Cycle worker exited"),
            Err(payload) => {
                error!(
                    cycle = %self.name,
                    error = %panic_message(payload.as_ref()),
                    "Cycle worker failed"
                );
                self.worker.lock().take();
            }
        }
    }

    fn run(&self) {
        let mut inner = self.inner.lock();
        loop {
            match inner.state {
                CycleState::Undefined => break,
                CycleState::Unrequested | CycleState::Requested => self.signal.wait(&mut inner),
                CycleState::Active => self.exec(&mut inner),
            }
        }
    }

    /// One collection window.
    fn exec(&self, inner: &mut MutexGuard<'_, CycleInner>) {
        inner.window += 1;
        inner.collecting = false;
        let window = inner.window;
        let start = WindowStart {
            window,
            initiation: inner.initiation,
            trigger: inner.initiation_trigger.clone(),
            started_at: Instant::now(),
        };

        MutexGuard::unlocked(inner, || self.datas.clear());
        inner.collecting = true;

        if self.params.interval > 0 {
            self.arm_interval(window);
        }
        let due = if self.params.duration > 0 {
            let due = match inner.schedule.next_duration_due.take() {
                Some(due) => due,
                None => {
                    inner.schedule.last_triggered.unwrap_or(start.started_at)
                        + millis(self.params.duration)
                }
            };
            inner.schedule.last_duration_due = Some(due);
            Some(due)
        } else {
            None
        };

        MutexGuard::unlocked(inner, || self.kind.on_cycle_started(self, &start));

        while inner.termination.is_none() && inner.state == CycleState::Active {
            match due {
                Some(due) => {
                    let timed_out = self.signal.wait_until(inner, due).timed_out();
                    if timed_out && inner.termination.is_none() && inner.state == CycleState::Active {
                        inner.termination = Some(Termination::Duration);
                    }
                }
                None => self.signal.wait(inner),
            }
        }
        inner.collecting = false;
        self.cancel_timer(TimerSlot::Interval);
        self.cancel_timer(TimerSlot::DataAvailable);

        let termination = inner.termination.unwrap_or(match inner.state {
            CycleState::Undefined => Termination::Undefine,
            _ => Termination::Unrequested,
        });
        let termination_trigger = inner.termination_trigger.clone();
        let elapsed = start.started_at.elapsed();
        let episode = inner.episode;

        MutexGuard::unlocked(inner, || {
            self.finish_window(&start, termination, termination_trigger, elapsed.as_millis())
        });

        // A re-request during the hand-off already opened the next window.
        if inner.state == CycleState::Active && inner.episode == episode {
            self.apply_repeat(inner);
        }
    }

    /// Hand the closed window to the reporting side and reap stale
    /// subscribers. Runs without the state lock.
    fn finish_window(
        &self,
        start: &WindowStart,
        termination: Termination,
        termination_trigger: Option<String>,
        elapsed_ms: u128,
    ) {
        let subscribers: Vec<_> = self
            .subscribers
            .lock()
            .iter()
            .filter(|s| s.is_active())
            .cloned()
            .collect();
        let datas = self.datas.snapshot_and_rotate();
        let info = ReportsInfo {
            cycle: self.name.clone(),
            subscribers,
            datas,
            created: Utc::now(),
            total_milliseconds: i64::try_from(elapsed_ms).unwrap_or(i64::MAX),
            initiation: start.initiation,
            initiation_trigger: start.trigger.clone(),
            termination,
            termination_trigger,
        };
        self.kind.on_cycle_finished(&self.name, &info);
        if info.subscribers.is_empty() {
            debug!(cycle = %self.name, window = start.window, "No active subscribers, report dropped");
        } else {
            self.kind.enqueue(info);
        }

        let stale: Vec<_> = self
            .subscribers
            .lock()
            .iter()
            .filter(|s| s.is_stale())
            .cloned()
            .collect();
        for subscriber in stale {
            if self.remove(subscriber.uri()) {
                debug!(cycle = %self.name, subscriber = %subscriber.uri(), "Stale subscriber reaped");
                subscriber.dispose();
            }
        }
    }

    fn apply_repeat(&self, inner: &mut CycleInner) {
        let now = Instant::now();
        match plan_repeat(&self.params, &mut inner.schedule, now) {
            RepeatPlan::Continue => {
                let triggered_at = inner.schedule.last_triggered.unwrap_or(now);
                self.begin(inner, Initiation::RepeatPeriod, None, triggered_at);
                debug!(cycle = %self.name, "Repeating immediately");
            }
            RepeatPlan::Defer { at } => {
                self.set_state(inner, CycleState::Requested);
                inner.repeat_seq += 1;
                let token = inner.repeat_seq;
                inner.pending_repeat = Some(token);
                self.arm_repeat(at, token);
                debug!(
                    cycle = %self.name,
                    delay_ms = at.saturating_duration_since(now).as_millis() as u64,
                    "Repeat scheduled"
                );
            }
            RepeatPlan::Idle => self.set_state(inner, CycleState::Requested),
        }
    }
}
