//! Trigger contract.

use std::sync::Arc;

use crate::error::TriggerError;

/// Invoked with the trigger URI when the trigger fires; returns whether the
/// receiver acted on it.
pub type TriggerCallback = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A registered trigger instance.
pub trait Trigger: Send + Sync {
    fn uri(&self) -> &str;

    /// Owner id the instance was registered for.
    fn owner(&self) -> &str;

    /// Stop delivering to the callback. Idempotent.
    fn dispose(&self);
}

/// Source of trigger instances.
pub trait TriggerRegistry: Send + Sync {
    fn get_instance(
        &self,
        owner: &str,
        uri: &str,
        callback: TriggerCallback,
    ) -> Result<Arc<dyn Trigger>, TriggerError>;
}
