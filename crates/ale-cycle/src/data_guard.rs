//! Guard of the per-cycle data collection.
//!
//! Separate from the state lock. An epoch counter lets teardown release
//! callbacks that are waiting for the guard: once the epoch moves, a
//! waiter gives up instead of touching the collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use ale_protocols::CycleData;

pub(crate) enum Acquire<'a, D> {
    Locked(MutexGuard<'a, D>),
    /// The collection was reset or invalidated while waiting.
    Reset,
    /// Not acquired within the timeout.
    Busy,
}

pub(crate) struct DataGuard<D> {
    data: Mutex<D>,
    epoch: AtomicU64,
}

impl<D: CycleData> DataGuard<D> {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(D::default()),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Try to lock the collection, provided nobody reset it since `epoch`.
    pub fn try_acquire(&self, epoch: u64, timeout: Duration) -> Acquire<'_, D> {
        if self.epoch() != epoch {
            return Acquire::Reset;
        }
        match self.data.try_lock_for(timeout) {
            Some(guard) if self.epoch() == epoch => Acquire::Locked(guard),
            Some(_) => Acquire::Reset,
            None if self.epoch() != epoch => Acquire::Reset,
            None => Acquire::Busy,
        }
    }

    pub fn clear(&self) {
        self.data.lock().clear();
    }

    /// Clone the current window for reporting and rotate it out.
    pub fn snapshot_and_rotate(&self) -> D {
        let mut data = self.data.lock();
        let snapshot = data.clone();
        data.rotate();
        snapshot
    }

    /// Release waiters, then drop everything.
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.data.lock().reset();
    }

    /// Release waiters without touching the collection.
    pub fn invalidate(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    #[cfg(test)]
    pub fn lock(&self) -> MutexGuard<'_, D> {
        self.data.lock()
    }
}
