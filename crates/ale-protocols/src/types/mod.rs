//! Observation and operation types exchanged with readers.

mod operation;
mod port;
mod tag;

pub use operation::*;
pub use port::*;
pub use tag::*;

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
