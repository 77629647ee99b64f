//! Error types for the ALE protocol layer.

mod reader;
mod report;
mod trigger;

pub use reader::*;
pub use report::*;
pub use trigger::*;
