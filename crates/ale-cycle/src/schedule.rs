//! Repeat-period arithmetic.
//!
//! Pure functions over monotonic instants so the tie-break rules can be
//! tested without clocks or threads.

use std::time::{Duration, Instant};

/// Timing parameters of a cycle, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleParams {
    /// Start as soon as the first subscriber arrives.
    pub immediate: bool,
    /// Window length; `<= 0` means unbounded.
    pub duration: i64,
    /// Period between window starts; `< 0` means no repeat.
    pub repeat_period: i64,
    /// Inactivity interval; `<= 0` disables it.
    pub interval: i64,
}

impl Default for CycleParams {
    fn default() -> Self {
        Self {
            immediate: true,
            duration: 0,
            repeat_period: -1,
            interval: 0,
        }
    }
}

/// Drift-compensation timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Schedule {
    pub last_triggered: Option<Instant>,
    pub next_triggered: Option<Instant>,
    pub last_duration_due: Option<Instant>,
    /// Precomputed due time the next window reuses instead of recomputing.
    pub next_duration_due: Option<Instant>,
}

/// What to do after a window closed while the cycle is still active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatPlan {
    /// Open the next window right away.
    Continue,
    /// Go back to REQUESTED and start again at `at`.
    Defer { at: Instant },
    /// No repeat configured; go back to REQUESTED.
    Idle,
}

pub(crate) fn millis(ms: i64) -> Duration {
    Duration::from_millis(u64::try_from(ms).unwrap_or(0))
}

/// Decide the next window after one closed at `now`, updating `schedule`.
pub fn plan_repeat(params: &CycleParams, schedule: &mut Schedule, now: Instant) -> RepeatPlan {
    let repeat = params.repeat_period;
    let duration = params.duration;
    if repeat < 0 {
        return RepeatPlan::Idle;
    }
    let last_triggered = schedule.last_triggered.unwrap_or(now);

    if repeat > duration {
        let next = last_triggered + millis(repeat);
        if next > now {
            schedule.next_triggered = Some(next);
            return RepeatPlan::Defer { at: next };
        }
        // Behind schedule.
        if duration > 0 {
            schedule.next_duration_due = schedule.last_duration_due.map(|due| due + millis(duration));
        }
        schedule.last_triggered = Some(now);
        return RepeatPlan::Continue;
    }

    if repeat == duration {
        if let (true, Some(last_due)) = (duration > 0, schedule.last_duration_due) {
            let next_due = last_due + millis(duration);
            schedule.next_duration_due = Some(next_due);
            let remaining = next_due.saturating_duration_since(now);
            if remaining > millis(repeat) {
                let aligned = last_triggered + millis(repeat);
                let at = if aligned > now {
                    aligned
                } else {
                    now + (remaining - millis(repeat))
                };
                schedule.next_triggered = Some(at);
                return RepeatPlan::Defer { at };
            }
            schedule.last_triggered = Some(last_due);
            return RepeatPlan::Continue;
        }
        schedule.last_triggered = Some(now);
        return RepeatPlan::Continue;
    }

    schedule.next_duration_due = match schedule.last_duration_due {
        Some(due) if due <= now => Some(due + millis(duration)),
        _ => None,
    };
    schedule.last_triggered = Some(now);
    RepeatPlan::Continue
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
