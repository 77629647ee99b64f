//! Report subscribers.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use ale_protocols::{CycleReport, ReportError, SubscriberController};

/// Pushes reports into a channel.
///
/// With [`with_remaining`](Self::with_remaining) it behaves like a poll
/// listener: each delivery consumes one cycle and the subscriber turns stale
/// once the budget is spent.
pub struct ChannelSubscriber {
    uri: String,
    sender: Mutex<Option<Sender<CycleReport>>>,
    active: AtomicBool,
    error: AtomicBool,
    /// Negative means unlimited.
    remaining: AtomicI64,
}

impl ChannelSubscriber {
    pub fn new(uri: impl Into<String>) -> (Arc<Self>, Receiver<CycleReport>) {
        let (tx, rx) = mpsc::channel();
        let subscriber = Self {
            uri: uri.into(),
            sender: Mutex::new(Some(tx)),
            active: AtomicBool::new(true),
            error: AtomicBool::new(false),
            remaining: AtomicI64::new(-1),
        };
        (Arc::new(subscriber), rx)
    }

    pub fn with_remaining(uri: impl Into<String>, cycles: u32) -> (Arc<Self>, Receiver<CycleReport>) {
        let (subscriber, rx) = Self::new(uri);
        subscriber.remaining.store(i64::from(cycles), Ordering::SeqCst);
        (subscriber, rx)
    }

    pub fn is_disposed(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl SubscriberController for ChannelSubscriber {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    fn deliver(&self, report: &CycleReport) -> Result<(), ReportError> {
        let sender = self.sender.lock();
        let Some(tx) = sender.as_ref() else {
            return Err(ReportError::Disposed(self.uri.clone()));
        };
        if tx.send(report.clone()).is_err() {
            self.error.store(true, Ordering::SeqCst);
            return Err(ReportError::Delivery {
                uri: self.uri.clone(),
                message: "receiver dropped".to_string(),
            });
        }
        let _ = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n > 0).then(|| n - 1));
        Ok(())
    }

    fn is_stale(&self) -> bool {
        self.remaining.load(Ordering::SeqCst) == 0
    }

    fn is_error_state(&self) -> bool {
        self.error.load(Ordering::SeqCst)
    }

    fn dispose(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.sender.lock().take();
    }
}

/// Writes every report to the log as JSON.
pub struct LoggingSubscriber {
    uri: String,
    active: AtomicBool,
}

impl LoggingSubscriber {
    pub fn new(uri: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            uri: uri.into(),
            active: AtomicBool::new(true),
        })
    }
}

impl SubscriberController for LoggingSubscriber {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    fn deliver(&self, report: &CycleReport) -> Result<(), ReportError> {
        let body = serde_json::to_string(report)?;
        info!(
            subscriber = %self.uri,
            cycle = %report.cycle,
            termination = %report.termination,
            report = %body,
            "Report"
        );
        Ok(())
    }

    fn dispose(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            info!(subscriber = %self.uri, "Subscriber disposed");
        } else {
            warn!(subscriber = %self.uri, "Subscriber disposed twice");
        }
    }
}
