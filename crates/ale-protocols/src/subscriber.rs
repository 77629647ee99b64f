//! Subscriber controller contract.

use crate::cycle::CycleReport;
use crate::error::ReportError;

/// A registered report recipient.
///
/// Poll-style listeners carry a remaining-cycle budget and report
/// themselves stale once it is exhausted; the cycle reaps stale
/// subscribers after each window.
pub trait SubscriberController: Send + Sync {
    /// Identity of the subscriber within a cycle.
    fn uri(&self) -> &str;

    fn is_active(&self) -> bool;

    fn set_active(&self, active: bool);

    /// Deliver one finished report.
    fn deliver(&self, report: &CycleReport) -> Result<(), ReportError>;

    fn is_stale(&self) -> bool {
        false
    }

    /// Set once delivery has failed; such subscribers are disposed first.
    fn is_error_state(&self) -> bool {
        false
    }

    fn dispose(&self);
}
