//! Surface shared by the cycle wrappers.

use std::sync::Arc;

use tracing::{info, warn};

use ale_protocols::{CycleState, SubscriberController};

use crate::boundary::Boundary;
use crate::common_cycle::CommonCycle;
use crate::context::CycleContext;
use crate::error::CycleResult;
use crate::kind::CycleKind;

/// Object-safe view of any cycle, used by the composition root.
pub trait Cycle: Send + Sync {
    fn name(&self) -> &str;

    fn guid(&self) -> &str;

    /// `event`, `command` or `port`.
    fn kind_label(&self) -> &'static str;

    fn state(&self) -> CycleState;

    fn subscribers(&self) -> Vec<Arc<dyn SubscriberController>>;

    fn add(&self, subscriber: Arc<dyn SubscriberController>) -> CycleResult<()>;

    fn remove(&self, uri: &str) -> bool;

    fn find(&self, uri: &str) -> Option<Arc<dyn SubscriberController>>;

    fn exists(&self, uri: &str) -> bool;

    fn is_busy(&self) -> bool;

    fn dispose(&self);
}

/// Bind triggers, define reader operations and start the worker. Any
/// failure disposes the cycle, which releases what was acquired so far.
pub(crate) fn assemble<K, F>(
    cycle: Arc<CommonCycle<K>>,
    context: &CycleContext,
    boundary: &Boundary,
    define: F,
) -> CycleResult<Arc<CommonCycle<K>>>
where
    K: CycleKind,
    F: FnOnce(&CommonCycle<K>) -> CycleResult<()>,
{
    let result = cycle
        .bind_triggers(context.triggers.as_ref(), &boundary.start_triggers, &boundary.stop_triggers)
        .and_then(|()| define(cycle.as_ref()))
        .and_then(|()| cycle.start_worker());
    match result {
        Ok(()) => {
            info!(
                cycle = %cycle.name(),
                guid = %cycle.guid(),
                kind = K::LABEL,
                immediate = boundary.params.immediate,
                duration_ms = boundary.params.duration,
                repeat_ms = boundary.params.repeat_period,
                interval_ms = boundary.params.interval,
                "Cycle defined"
            );
            Ok(cycle)
        }
        Err(err) => {
            warn!(cycle = %cycle.name(), error = %err, "Cycle construction failed");
            cycle.dispose();
            Err(err)
        }
    }
}

/// Implement [`Cycle`] for a wrapper holding `cycle: Arc<CommonCycle<_>>`,
/// and dispose it when the wrapper is dropped.
macro_rules! delegate_cycle {
    ($wrapper:ty, $kind:ty) => {
        impl $crate::cycle::Cycle for $wrapper {
            fn name(&self) -> &str {
                self.cycle.name()
            }

            fn guid(&self) -> &str {
                self.cycle.guid()
            }

            fn kind_label(&self) -> &'static str {
                <$kind as $crate::kind::CycleKind>::LABEL
            }

            fn state(&self) -> ::ale_protocols::CycleState {
                self.cycle.state()
            }

            fn subscribers(&self) -> Vec<::std::sync::Arc<dyn ::ale_protocols::SubscriberController>> {
                self.cycle.subscribers()
            }

            fn add(
                &self,
                subscriber: ::std::sync::Arc<dyn ::ale_protocols::SubscriberController>,
            ) -> $crate::error::CycleResult<()> {
                self.cycle.add(subscriber)
            }

            fn remove(&self, uri: &str) -> bool {
                self.cycle.remove(uri)
            }

            fn find(&self, uri: &str) -> Option<::std::sync::Arc<dyn ::ale_protocols::SubscriberController>> {
                self.cycle.find(uri)
            }

            fn exists(&self, uri: &str) -> bool {
                self.cycle.exists(uri)
            }

            fn is_busy(&self) -> bool {
                self.cycle.is_busy()
            }

            fn dispose(&self) {
                self.cycle.dispose()
            }
        }

        impl Drop for $wrapper {
            fn drop(&mut self) {
                self.cycle.dispose();
            }
        }
    };
}

pub(crate) use delegate_cycle;
