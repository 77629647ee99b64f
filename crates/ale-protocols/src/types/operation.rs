//! Reader operations and their results.

use serde::{Deserialize, Serialize};

use super::port::PortEvent;
use super::tag::Tag;

/// Outcome of a single tag or port operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Success,
    MiscError,
    MemoryOverflow,
    MemoryLocked,
    PermissionError,
    PasswordError,
    OpNotPossible,
    PortNotFound,
}

impl OperationStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationStatus::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Name of the operation this result belongs to.
    pub name: String,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl OperationResult {
    pub fn success(name: impl Into<String>, data: Option<String>) -> Self {
        Self {
            name: name.into(),
            status: OperationStatus::Success,
            data,
        }
    }

    pub fn failure(name: impl Into<String>, status: OperationStatus) -> Self {
        Self {
            name: name.into(),
            status,
            data: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    Read,
    Write,
    Lock,
    Kill,
    Password,
    Check,
}

/// One command executed against a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOp {
    pub name: String,
    pub kind: CommandKind,
    #[serde(default)]
    pub bank: u8,
    #[serde(default)]
    pub offset: u16,
    #[serde(default)]
    pub length: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl CommandOp {
    pub fn read(name: impl Into<String>, bank: u8, offset: u16, length: u16) -> Self {
        Self {
            name: name.into(),
            kind: CommandKind::Read,
            bank,
            offset,
            length,
            data: None,
        }
    }

    pub fn write(name: impl Into<String>, bank: u8, offset: u16, data: impl Into<String>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            kind: CommandKind::Write,
            bank,
            offset,
            length: (data.len() / 4) as u16,
            data: Some(data),
        }
    }
}

/// Composite inventory operation defined once on each reader of a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagOperation {
    pub id: String,
    /// Commands executed inline during the inventory, results land in
    /// [`Tag::results`].
    #[serde(default)]
    pub commands: Vec<CommandOp>,
}

/// Port observation defined on readers of a port cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortObservation {
    pub id: String,
    /// Input ports of interest, empty means all.
    #[serde(default)]
    pub ports: Vec<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortOpKind {
    Read,
    Write,
}

/// A port operation addressed to a named reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortOperation {
    pub name: String,
    pub reader: String,
    pub kind: PortOpKind,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<bool>,
    /// Pulse length for writes; the port is restored afterwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

/// Operation a cycle defines on its logical readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReaderOperation {
    Inventory(TagOperation),
    Ports(PortObservation),
}

impl ReaderOperation {
    pub fn id(&self) -> &str {
        match self {
            ReaderOperation::Inventory(op) => &op.id,
            ReaderOperation::Ports(op) => &op.id,
        }
    }
}

/// One-off execution requested from a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteRequest {
    Tag { tag: Tag, commands: Vec<CommandOp> },
    Ports(Vec<PortOperation>),
}

/// Partial or final answer to an [`ExecuteRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteResult {
    pub results: Vec<OperationResult>,
    /// Set on the last answer for a request.
    pub completed: bool,
}

impl ExecuteResult {
    pub fn completed(results: Vec<OperationResult>) -> Self {
        Self {
            results,
            completed: true,
        }
    }

    pub fn partial(results: Vec<OperationResult>) -> Self {
        Self {
            results,
            completed: false,
        }
    }

    pub fn has_failure(&self) -> bool {
        self.results.iter().any(|r| !r.status.is_success())
    }
}

/// What a reader hands to a defined operation's callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    Tag(Tag),
    Port(PortEvent),
}
