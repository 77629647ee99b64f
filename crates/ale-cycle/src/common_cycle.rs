//! Generic cycle scheduler.
//!
//! Two synchronization domains:
//! - the state domain (`inner` + `signal`): state, reasons, schedule, window
//! - the data domain (`datas`): the accumulating collection
//!
//! Lock order: the data guard may be held while taking the state lock, never
//! the reverse. Timer slots and the subscriber list are leaf locks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use ale_protocols::{
    CycleState, Initiation, SubscriberController, Termination, Trigger, TriggerCallback,
    TriggerRegistry,
};

use crate::config::CycleConfig;
use crate::data_guard::{Acquire, DataGuard};
use crate::error::{CycleError, CycleResult};
use crate::kind::CycleKind;
use crate::schedule::{millis, CycleParams, Schedule};
use crate::timer::{CycleTimer, TimerHandle};
use crate::worker::WorkerHandle;

/// State domain of a cycle.
pub(crate) struct CycleInner {
    pub state: CycleState,
    pub initiation: Initiation,
    pub initiation_trigger: Option<String>,
    /// Set exactly once per window by whoever stops it first.
    pub termination: Option<Termination>,
    pub termination_trigger: Option<String>,
    pub schedule: Schedule,
    /// Sequence number of the current or last window.
    pub window: u64,
    /// Callbacks may touch the data collection.
    pub collecting: bool,
    /// Token of the deferred repeat start currently armed.
    pub pending_repeat: Option<u64>,
    pub repeat_seq: u64,
    /// Bumped every time the cycle enters ACTIVE.
    pub episode: u64,
}

impl CycleInner {
    fn new() -> Self {
        Self {
            state: CycleState::Unrequested,
            initiation: Initiation::Requested,
            initiation_trigger: None,
            termination: None,
            termination_trigger: None,
            schedule: Schedule::default(),
            window: 0,
            collecting: false,
            pending_repeat: None,
            repeat_seq: 0,
            episode: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum TimerSlot {
    Interval,
    Repeat,
    DataAvailable,
}

#[derive(Default)]
pub(crate) struct TimerSlots {
    interval: Option<TimerHandle>,
    repeat: Option<TimerHandle>,
    data_available: Option<TimerHandle>,
}

impl TimerSlots {
    fn slot(&mut self, slot: TimerSlot) -> &mut Option<TimerHandle> {
        match slot {
            TimerSlot::Interval => &mut self.interval,
            TimerSlot::Repeat => &mut self.repeat,
            TimerSlot::DataAvailable => &mut self.data_available,
        }
    }
}

/// Generic cycle: state machine, subscribers, triggers, timers and worker.
///
/// Built through [`CommonCycle::new`], which returns an `Arc` since reader,
/// trigger and timer callbacks hold weak references back to the cycle.
pub struct CommonCycle<K: CycleKind> {
    pub(crate) guid: String,
    pub(crate) name: String,
    pub(crate) kind: K,
    pub(crate) params: CycleParams,
    pub(crate) config: CycleConfig,
    pub(crate) timer: CycleTimer,
    pub(crate) weak: Weak<Self>,

    pub(crate) inner: Mutex<CycleInner>,
    pub(crate) signal: Condvar,
    pub(crate) datas: DataGuard<K::Data>,

    pub(crate) subscribers: Mutex<Vec<Arc<dyn SubscriberController>>>,
    triggers: Mutex<Vec<Arc<dyn Trigger>>>,
    timers: Mutex<TimerSlots>,

    pub(crate) worker: Mutex<Option<WorkerHandle>>,
    started: AtomicBool,
    disposed: AtomicBool,
}

impl<K: CycleKind> CommonCycle<K> {
    pub fn new(
        guid: impl Into<String>,
        name: impl Into<String>,
        kind: K,
        params: CycleParams,
        config: CycleConfig,
        timer: CycleTimer,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            guid: guid.into(),
            name: name.into(),
            kind,
            params,
            config,
            timer,
            weak: weak.clone(),
            inner: Mutex::new(CycleInner::new()),
            signal: Condvar::new(),
            datas: DataGuard::new(),
            subscribers: Mutex::new(Vec::new()),
            triggers: Mutex::new(Vec::new()),
            timers: Mutex::new(TimerSlots::default()),
            worker: Mutex::new(None),
            started: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        })
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn params(&self) -> &CycleParams {
        &self.params
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    pub fn weak(&self) -> Weak<Self> {
        self.weak.clone()
    }

    pub fn state(&self) -> CycleState {
        self.inner.lock().state
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Spawn the worker. Only the first call has an effect.
    pub fn start_worker(&self) -> CycleResult<()> {
        if self.is_disposed() {
            return Err(CycleError::Disposed(self.name.clone()));
        }
        let mut worker = self.worker.lock();
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let cycle = self
            .weak
            .upgrade()
            .ok_or_else(|| CycleError::Disposed(self.name.clone()))?;
        let thread_name = format!("{}-{}", self.config.thread_name_prefix, self.name);
        let handle = WorkerHandle::spawn(thread_name, move || cycle.worker_main())
            .map_err(|e| CycleError::Worker(e.to_string()))?;
        *worker = Some(handle);
        debug!(cycle = %self.name, "Cycle worker spawned");
        Ok(())
    }

    /// Worker alive and the cycle requested or collecting.
    pub fn is_busy(&self) -> bool {
        let alive = self
            .worker
            .lock()
            .as_ref()
            .is_some_and(|worker| !worker.is_finished());
        alive && matches!(self.state(), CycleState::Requested | CycleState::Active)
    }

    // ------------------------------------------------------------------
    // Subscribers
    // ------------------------------------------------------------------

    /// Register a subscriber. The first one moves the cycle to REQUESTED and,
    /// without start triggers, straight into a window.
    pub fn add(&self, subscriber: Arc<dyn SubscriberController>) -> CycleResult<()> {
        if self.is_disposed() {
            return Err(CycleError::Disposed(self.name.clone()));
        }
        {
            let mut subscribers = self.subscribers.lock();
            if subscribers.iter().any(|s| s.uri() == subscriber.uri()) {
                return Err(CycleError::DuplicateSubscriber(subscriber.uri().to_string()));
            }
            subscriber.set_active(true);
            debug!(cycle = %self.name, subscriber = %subscriber.uri(), "Subscriber added");
            subscribers.push(subscriber);
        }

        let mut inner = self.inner.lock();
        if inner.state == CycleState::Unrequested && !self.subscribers.lock().is_empty() {
            self.set_state(&mut inner, CycleState::Requested);
            if self.params.immediate {
                self.begin(&mut inner, Initiation::Requested, None, Instant::now());
            }
            self.signal.notify_all();
        }
        Ok(())
    }

    /// Deactivate and remove a subscriber. Removing the last one drops the
    /// cycle to UNREQUESTED and resets the collection.
    pub fn remove(&self, uri: &str) -> bool {
        let removed = {
            let mut subscribers = self.subscribers.lock();
            subscribers
                .iter()
                .position(|s| s.uri() == uri)
                .map(|index| subscribers.remove(index))
        };
        let Some(subscriber) = removed else {
            return false;
        };
        subscriber.set_active(false);
        debug!(cycle = %self.name, subscriber = uri, "Subscriber removed");

        let emptied = {
            let mut inner = self.inner.lock();
            let requested = matches!(inner.state, CycleState::Requested | CycleState::Active);
            if requested && self.subscribers.lock().is_empty() {
                if inner.state == CycleState::Active && inner.termination.is_none() {
                    inner.termination = Some(Termination::Unrequested);
                }
                self.cancel_repeat(&mut inner);
                self.set_state(&mut inner, CycleState::Unrequested);
                self.signal.notify_all();
                true
            } else {
                false
            }
        };
        if emptied {
            self.datas.reset();
        }
        true
    }

    pub fn subscribers(&self) -> Vec<Arc<dyn SubscriberController>> {
        self.subscribers.lock().clone()
    }

    pub fn find(&self, uri: &str) -> Option<Arc<dyn SubscriberController>> {
        self.subscribers.lock().iter().find(|s| s.uri() == uri).cloned()
    }

    pub fn exists(&self, uri: &str) -> bool {
        self.subscribers.lock().iter().any(|s| s.uri() == uri)
    }

    // ------------------------------------------------------------------
    // Start / stop
    // ------------------------------------------------------------------

    /// Start trigger fired. Only opens a window from REQUESTED.
    pub fn start_triggered(&self, uri: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != CycleState::Requested {
            debug!(cycle = %self.name, trigger = uri, state = %inner.state, "Start trigger ignored");
            return false;
        }
        self.cancel_repeat(&mut inner);
        self.begin(&mut inner, Initiation::Trigger, Some(uri.to_string()), Instant::now());
        self.signal.notify_all();
        true
    }

    /// Stop trigger fired. Closes the active window, or cancels a pending
    /// repeat start while REQUESTED.
    pub fn stop_triggered(&self, uri: &str) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CycleState::Active if inner.termination.is_none() => {
                inner.termination = Some(Termination::Trigger);
                inner.termination_trigger = Some(uri.to_string());
                self.signal.notify_all();
                true
            }
            CycleState::Requested if inner.pending_repeat.is_some() => {
                self.cancel_repeat(&mut inner);
                debug!(cycle = %self.name, trigger = uri, "Pending repeat cancelled");
                true
            }
            _ => false,
        }
    }

    /// Inactivity interval expired for `window`.
    pub fn interrupt(&self, window: u64) -> bool {
        self.terminate(Some(window), self.kind.interval_termination(), None)
    }

    /// Close the active window with `reason`. The first reason wins; a
    /// `window` that is no longer current is ignored.
    pub fn terminate(&self, window: Option<u64>, reason: Termination, trigger: Option<String>) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != CycleState::Active || inner.termination.is_some() {
            return false;
        }
        if window.is_some_and(|w| w != inner.window) {
            return false;
        }
        inner.termination = Some(reason);
        inner.termination_trigger = trigger;
        self.signal.notify_all();
        true
    }

    /// Deferred repeat start armed with `token` fired.
    pub(crate) fn start_scheduled(&self, token: u64) {
        let mut inner = self.inner.lock();
        if inner.state != CycleState::Requested || inner.pending_repeat != Some(token) {
            return;
        }
        inner.pending_repeat = None;
        let triggered_at = inner.schedule.next_triggered.take().unwrap_or_else(Instant::now);
        self.begin(&mut inner, Initiation::RepeatPeriod, None, triggered_at);
        self.signal.notify_all();
    }

    pub(crate) fn set_state(&self, inner: &mut CycleInner, to: CycleState) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;
        self.kind.on_state_changed(&self.name, from, to);
    }

    /// Move to ACTIVE with the given initiation.
    pub(crate) fn begin(
        &self,
        inner: &mut CycleInner,
        initiation: Initiation,
        trigger: Option<String>,
        triggered_at: Instant,
    ) {
        inner.initiation = initiation;
        inner.initiation_trigger = trigger;
        inner.termination = None;
        inner.termination_trigger = None;
        inner.schedule.last_triggered = Some(triggered_at);
        if initiation != Initiation::RepeatPeriod {
            inner.schedule.next_duration_due = None;
            inner.schedule.next_triggered = None;
        }
        inner.episode += 1;
        self.set_state(inner, CycleState::Active);
    }

    // ------------------------------------------------------------------
    // Data domain
    // ------------------------------------------------------------------

    /// Run `f` on the collection of the current window.
    ///
    /// Gives up (returns `None`) when the cycle is not collecting, when the
    /// collection is reset while waiting, or after the configured bound.
    pub fn with_datas<R>(&self, f: impl FnOnce(&mut K::Data, u64) -> R) -> Option<R> {
        let step = self.config.data_lock_step();
        let deadline = Instant::now() + self.config.data_lock_timeout();
        loop {
            let window = match self.inner.try_lock_for(step) {
                Some(inner) if inner.state == CycleState::Active && inner.collecting => inner.window,
                Some(_) => return None,
                None => {
                    if Instant::now() >= deadline {
                        warn!(cycle = %self.name, "State lock busy, notification dropped");
                        return None;
                    }
                    continue;
                }
            };
            let epoch = self.datas.epoch();
            match self.datas.try_acquire(epoch, step) {
                Acquire::Locked(mut datas) => {
                    {
                        let inner = self.inner.lock();
                        if inner.state != CycleState::Active || !inner.collecting || inner.window != window {
                            return None;
                        }
                    }
                    return Some(f(&mut datas, window));
                }
                Acquire::Reset => return None,
                Acquire::Busy => {
                    if Instant::now() >= deadline {
                        warn!(cycle = %self.name, "Data guard busy, notification dropped");
                        return None;
                    }
                }
            }
        }
    }

    /// Current window if collecting.
    pub fn collecting_window(&self) -> Option<u64> {
        let inner = self.inner.lock();
        (inner.state == CycleState::Active && inner.collecting).then_some(inner.window)
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    fn arm<F>(&self, slot: TimerSlot, at: Instant, action: F)
    where
        F: FnOnce(&Self) + Send + 'static,
    {
        if self.is_disposed() {
            return;
        }
        let weak = self.weak.clone();
        let handle = self.timer.schedule_at(at, move || {
            if let Some(cycle) = weak.upgrade() {
                action(cycle.as_ref());
            }
        });
        let mut timers = self.timers.lock();
        if let Some(previous) = timers.slot(slot).replace(handle) {
            previous.cancel();
        }
    }

    pub(crate) fn cancel_timer(&self, slot: TimerSlot) {
        if let Some(handle) = self.timers.lock().slot(slot).take() {
            handle.cancel();
        }
    }

    fn cancel_timers(&self) {
        let mut timers = self.timers.lock();
        for slot in [TimerSlot::Interval, TimerSlot::Repeat, TimerSlot::DataAvailable] {
            if let Some(handle) = timers.slot(slot).take() {
                handle.cancel();
            }
        }
    }

    pub(crate) fn arm_interval(&self, window: u64) {
        let at = Instant::now() + millis(self.params.interval);
        self.arm(TimerSlot::Interval, at, move |cycle| {
            if cycle.interrupt(window) {
                debug!(cycle = %cycle.name, window, "Inactivity interval expired");
            }
        });
    }

    /// Restart the inactivity interval of the current window.
    pub fn reschedule_interval(&self) {
        if self.params.interval <= 0 {
            return;
        }
        if let Some(window) = self.collecting_window() {
            self.arm_interval(window);
        }
    }

    /// Close the current window with `DataAvailable` after `delay`.
    pub fn arm_data_available(&self, delay: Duration) {
        let Some(window) = self.collecting_window() else {
            return;
        };
        self.arm(TimerSlot::DataAvailable, Instant::now() + delay, move |cycle| {
            cycle.terminate(Some(window), Termination::DataAvailable, None);
        });
    }

    pub(crate) fn arm_repeat(&self, at: Instant, token: u64) {
        self.arm(TimerSlot::Repeat, at, move |cycle| cycle.start_scheduled(token));
    }

    fn cancel_repeat(&self, inner: &mut CycleInner) {
        if inner.pending_repeat.take().is_some() {
            inner.schedule.next_triggered = None;
            self.cancel_timer(TimerSlot::Repeat);
        }
    }

    // ------------------------------------------------------------------
    // Triggers
    // ------------------------------------------------------------------

    /// Register start and stop trigger callbacks under this cycle's guid.
    pub fn bind_triggers(
        &self,
        registry: &dyn TriggerRegistry,
        start: &[String],
        stop: &[String],
    ) -> CycleResult<()> {
        for uri in start {
            let weak = self.weak.clone();
            let callback: TriggerCallback =
                Arc::new(move |uri: &str| weak.upgrade().is_some_and(|c| c.start_triggered(uri)));
            let trigger = registry.get_instance(&self.guid, uri, callback)?;
            self.triggers.lock().push(trigger);
        }
        for uri in stop {
            let weak = self.weak.clone();
            let callback: TriggerCallback =
                Arc::new(move |uri: &str| weak.upgrade().is_some_and(|c| c.stop_triggered(uri)));
            let trigger = registry.get_instance(&self.guid, uri, callback)?;
            self.triggers.lock().push(trigger);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Undefine the cycle. Idempotent.
    ///
    /// Stops timers, moves to UNDEFINED, joins the worker (bounded), then
    /// disposes subscribers (failed ones first), triggers and the kind.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel_timers();
        {
            let mut inner = self.inner.lock();
            if inner.state == CycleState::Active && inner.termination.is_none() {
                inner.termination = Some(Termination::Undefine);
            }
            inner.pending_repeat = None;
            self.set_state(&mut inner, CycleState::Undefined);
            self.signal.notify_all();
        }
        self.datas.invalidate();

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if worker.is_current() {
                debug!(cycle = %self.name, "Dispose called from the worker, skipping join");
            } else if !worker.join_timeout(self.config.join_timeout()) {
                warn!(cycle = %self.name, "Cycle worker did not exit in time, detaching");
            }
        }

        let mut subscribers = std::mem::take(&mut *self.subscribers.lock());
        subscribers.sort_by_key(|s| !s.is_error_state());
        for subscriber in subscribers {
            subscriber.set_active(false);
            subscriber.dispose();
        }

        let triggers = std::mem::take(&mut *self.triggers.lock());
        for trigger in triggers {
            trigger.dispose();
        }

        self.kind.on_dispose();
        info!(cycle = %self.name, kind = K::LABEL, "Cycle undefined");
    }
}

#[cfg(test)]
#[path = "common_cycle_tests.rs"]
mod tests;
