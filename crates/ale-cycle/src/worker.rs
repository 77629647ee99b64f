//! Worker thread handle with a bounded join.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Default)]
struct Completion {
    finished: Mutex<bool>,
    signal: Condvar,
}

impl Completion {
    fn finish(&self) {
        *self.finished.lock() = true;
        self.signal.notify_all();
    }

    fn is_finished(&self) -> bool {
        *self.finished.lock()
    }

    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut finished = self.finished.lock();
        while !*finished {
            if self.signal.wait_until(&mut finished, deadline).timed_out() {
                return *finished;
            }
        }
        true
    }
}

/// Marks completion even when the body unwinds.
struct FinishOnDrop(Arc<Completion>);

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        self.0.finish();
    }
}

pub(crate) struct WorkerHandle {
    thread: JoinHandle<()>,
    completion: Arc<Completion>,
}

impl WorkerHandle {
    pub fn spawn<F>(name: String, body: F) -> io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let completion = Arc::new(Completion::default());
        let marker = FinishOnDrop(completion.clone());
        let thread = thread::Builder::new().name(name).spawn(move || {
            let _marker = marker;
            body();
        })?;
        Ok(Self { thread, completion })
    }

    /// Whether the caller is this worker.
    pub fn is_current(&self) -> bool {
        self.thread.thread().id() == thread::current().id()
    }

    pub fn is_finished(&self) -> bool {
        self.completion.is_finished()
    }

    /// Wait up to `timeout` for the worker to exit. On timeout the thread
    /// is detached and `false` is returned.
    pub fn join_timeout(self, timeout: Duration) -> bool {
        if !self.completion.wait(timeout) {
            return false;
        }
        let _ = self.thread.join();
        true
    }
}
