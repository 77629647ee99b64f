//! # ALE Protocols
//!
//! Contracts (traits) and data model shared by the ALE cycle engine and the
//! collaborators it drives. Contains no engine logic.
//!
//! ## Core Traits
//!
//! - [`LogicalReader`] / [`ReaderRegistry`] - reader lookup, locking and operation binding
//! - [`Trigger`] / [`TriggerRegistry`] - URI-addressed start/stop event sources
//! - [`TagDecoder`] - attaches a semantic identity to raw tags
//! - [`Reports`], [`TagReports`], [`PortReports`] - per-kind filtering and report hand-off
//! - [`SubscriberController`] - report recipients
//! - [`CycleData`] - accumulating report data ([`Tags`], [`Events`])

pub mod cycle;
pub mod data;
pub mod error;
pub mod reader;
pub mod reports;
pub mod spec;
pub mod subscriber;
pub mod trigger;
pub mod types;

pub use cycle::{CycleReport, CycleState, Initiation, ReportsInfo, Termination};
pub use data::{CycleData, EventRecord, Events, SightingStats, TagRecord, Tags};
pub use error::{ReaderError, ReportError, TriggerError};
pub use reader::{ExecuteCallback, LogicalReader, ReaderCallback, ReaderRegistry};
pub use reports::{PortReports, Reports, TagReports};
pub use spec::{
    AleTime, CCBoundarySpec, CCCmdSpec, CCSpec, ECBoundarySpec, ECReportSpec, ECSpec,
    PCBoundarySpec, PCReportSpec, PCSpec,
};
pub use subscriber::SubscriberController;
pub use trigger::{Trigger, TriggerCallback, TriggerRegistry};
pub use types::*;
