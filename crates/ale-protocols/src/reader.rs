//! Logical reader contract.

use std::sync::Arc;

use crate::error::ReaderError;
use crate::types::{ExecuteRequest, ExecuteResult, ReaderEvent, ReaderOperation};

/// Callback attached to a defined operation: `(reader_name, event)`.
pub type ReaderCallback = Arc<dyn Fn(&str, ReaderEvent) + Send + Sync>;

/// Receives partial and final answers of an execution.
pub type ExecuteCallback = Arc<dyn Fn(ExecuteResult) + Send + Sync>;

/// A named logical reader.
///
/// Operations are defined per owner id; defining again under the same owner
/// and operation id replaces the previous definition.
pub trait LogicalReader: Send + Sync {
    fn name(&self) -> &str;

    fn define(
        &self,
        operation: &ReaderOperation,
        callback: ReaderCallback,
        owner: &str,
    ) -> Result<(), ReaderError>;

    fn undefine(&self, operation: &ReaderOperation, owner: &str) -> Result<(), ReaderError>;

    fn enable(&self, operation: &ReaderOperation, owner: &str) -> Result<(), ReaderError>;

    fn disable(&self, operation: &ReaderOperation, owner: &str) -> Result<(), ReaderError>;

    /// Run a one-off request; answers arrive asynchronously through `callback`.
    fn execute(&self, request: ExecuteRequest, callback: ExecuteCallback) -> Result<(), ReaderError>;

    /// Release the lock taken by `owner` through [`ReaderRegistry::lock`].
    fn unlock(&self, owner: &str);
}

/// Lookup of logical readers by name.
pub trait ReaderRegistry: Send + Sync {
    /// Look up a reader and lock it for `owner` so it cannot be removed while in use.
    fn lock(&self, name: &str, owner: &str) -> Result<Arc<dyn LogicalReader>, ReaderError>;
}
