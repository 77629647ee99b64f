//! Timer facility.
//!
//! One-shot, cancellable callbacks on a tokio runtime. Deadlines are
//! monotonic (`std::time::Instant`). Actions run on the blocking pool since
//! they typically take cycle locks.

use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Schedules delayed callbacks on a runtime handle.
#[derive(Clone)]
pub struct CycleTimer {
    handle: Handle,
}

impl CycleTimer {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Timer on the runtime of the calling context, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Run `action` once at `deadline` unless cancelled first.
    pub fn schedule_at<F>(&self, deadline: Instant, action: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        self.handle.spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    trace!("Timer cancelled before firing");
                }
                _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {
                    if cancelled.is_cancelled() {
                        return;
                    }
                    let _ = tokio::task::spawn_blocking(action).await;
                }
            }
        });
        TimerHandle { token }
    }

    /// Run `action` once after `delay` unless cancelled first.
    pub fn schedule_after<F>(&self, delay: Duration, action: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_at(Instant::now() + delay, action)
    }
}

impl std::fmt::Debug for CycleTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleTimer").finish_non_exhaustive()
    }
}

/// Cancels its timer when cancelled explicitly or dropped.
#[derive(Debug)]
#[must_use = "dropping a TimerHandle cancels the timer"]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
