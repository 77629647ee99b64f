//! # ALE Cycle Engine
//!
//! Reporting cycles for the Application Level Events standard.
//!
//! A cycle is a long-lived reporting task with its own state machine:
//!
//! ```text
//! UNREQUESTED --add--> REQUESTED --start--> ACTIVE --window closes--> REQUESTED | ACTIVE
//!      ^                                                                   |
//!      +------------------------- last subscriber removed -----------------+
//!
//! any state --dispose--> UNDEFINED
//! ```
//!
//! [`CommonCycle`] is the generic scheduler. It owns one worker thread that
//! opens collection windows, waits for a stop condition and hands closed
//! windows to the reporting side. Everything kind-specific is supplied by a
//! [`CycleKind`]: [`EventKind`], [`CommandKind`] and [`PortKind`], wrapped by
//! [`EventCycle`], [`CommandCycle`] and [`PortCycle`].

mod boundary;
mod command_cycle;
mod common_cycle;
mod common_cycle_worker;
mod config;
mod context;
mod cycle;
mod data_guard;
mod error;
mod event_cycle;
mod kind;
mod port_cycle;
mod schedule;
mod tag_cycle;
mod timer;
mod worker;

pub use boundary::{
    command_boundary, event_boundary, port_boundary, Boundary, CommandBoundary, EventBoundary,
    PortBoundary,
};
pub use command_cycle::{CommandCycle, CommandKind};
pub use common_cycle::CommonCycle;
pub use config::CycleConfig;
pub use context::CycleContext;
pub use cycle::Cycle;
pub use error::{CycleError, CycleResult};
pub use event_cycle::{EventCycle, EventKind};
pub use kind::{CycleKind, WindowStart};
pub use port_cycle::{PortCycle, PortKind};
pub use schedule::{plan_repeat, CycleParams, RepeatPlan, Schedule};
pub use tag_cycle::{ReaderSet, TagCycle};
pub use timer::{CycleTimer, TimerHandle};
