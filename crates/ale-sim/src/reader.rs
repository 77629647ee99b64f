//! Simulated logical reader.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ale_protocols::{
    CommandKind, CommandOp, ExecuteCallback, ExecuteRequest, ExecuteResult, LogicalReader,
    OperationResult, OperationStatus, PortEvent, PortOpKind, PortOperation, ReaderCallback,
    ReaderError, ReaderEvent, ReaderOperation, Tag,
};

struct Definition {
    owner: String,
    operation: ReaderOperation,
    callback: ReaderCallback,
    enabled: bool,
}

/// A logical reader whose sightings are injected by tests or produced by a
/// periodic generator.
pub struct SimulatedReader {
    name: String,
    weak: Weak<Self>,
    definitions: Mutex<Vec<Definition>>,
    owners: Mutex<BTreeSet<String>>,
    failing: Mutex<HashSet<String>>,
    fail_define: AtomicBool,
    execute_delay: Mutex<Duration>,
    outputs: Mutex<BTreeMap<u16, bool>>,
    inputs: Mutex<BTreeMap<u16, bool>>,
    generator: Mutex<Option<CancellationToken>>,
}

impl SimulatedReader {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            name: name.into(),
            weak: weak.clone(),
            definitions: Mutex::new(Vec::new()),
            owners: Mutex::new(BTreeSet::new()),
            failing: Mutex::new(HashSet::new()),
            fail_define: AtomicBool::new(false),
            execute_delay: Mutex::new(Duration::from_millis(5)),
            outputs: Mutex::new(BTreeMap::new()),
            inputs: Mutex::new(BTreeMap::new()),
            generator: Mutex::new(None),
        })
    }

    // ------------------------------------------------------------------
    // Test controls
    // ------------------------------------------------------------------

    /// Make executions of the command or port operation `name` fail.
    pub fn fail_operation(&self, name: impl Into<String>) {
        self.failing.lock().insert(name.into());
    }

    /// Make every subsequent `define` fail.
    pub fn fail_define(&self, fail: bool) {
        self.fail_define.store(fail, Ordering::SeqCst);
    }

    pub fn set_execute_delay(&self, delay: Duration) {
        *self.execute_delay.lock() = delay;
    }

    pub fn is_locked(&self) -> bool {
        !self.owners.lock().is_empty()
    }

    pub fn lock_owners(&self) -> Vec<String> {
        self.owners.lock().iter().cloned().collect()
    }

    pub(crate) fn lock_for(&self, owner: &str) {
        self.owners.lock().insert(owner.to_string());
    }

    /// Number of operations currently defined.
    pub fn definition_count(&self) -> usize {
        self.definitions.lock().len()
    }

    pub fn is_defined(&self, owner: &str) -> bool {
        self.definitions.lock().iter().any(|d| d.owner == owner)
    }

    pub fn output(&self, port: u16) -> Option<bool> {
        self.outputs.lock().get(&port).copied()
    }

    // ------------------------------------------------------------------
    // Observations
    // ------------------------------------------------------------------

    /// Deliver a sighting to every enabled inventory definition.
    /// Returns the number of deliveries.
    pub fn inject_tag(&self, mut tag: Tag) -> usize {
        tag.reader = self.name.clone();
        let targets: Vec<(ReaderCallback, Vec<CommandOp>)> = self
            .definitions
            .lock()
            .iter()
            .filter(|d| d.enabled)
            .filter_map(|d| match &d.operation {
                ReaderOperation::Inventory(op) => Some((d.callback.clone(), op.commands.clone())),
                ReaderOperation::Ports(_) => None,
            })
            .collect();
        for (callback, commands) in &targets {
            let mut sighting = tag.clone();
            if !commands.is_empty() {
                sighting.results = self.run_commands(commands);
            }
            callback(&self.name, ReaderEvent::Tag(sighting));
        }
        targets.len()
    }

    /// Change an input port and deliver the event to interested definitions.
    pub fn inject_port(&self, id: u16, state: bool) -> usize {
        self.inputs.lock().insert(id, state);
        let event = PortEvent::input(self.name.clone(), id, state);
        let targets: Vec<ReaderCallback> = self
            .definitions
            .lock()
            .iter()
            .filter(|d| d.enabled)
            .filter(|d| match &d.operation {
                ReaderOperation::Ports(obs) => obs.ports.is_empty() || obs.ports.contains(&id),
                ReaderOperation::Inventory(_) => false,
            })
            .map(|d| d.callback.clone())
            .collect();
        for callback in &targets {
            callback(&self.name, ReaderEvent::Port(event.clone()));
        }
        targets.len()
    }

    /// Inject `epcs` every `period` on `handle` until stopped.
    pub fn start_generator(&self, handle: &Handle, period: Duration, epcs: Vec<String>) {
        let token = CancellationToken::new();
        if let Some(previous) = self.generator.lock().replace(token.clone()) {
            previous.cancel();
        }
        let weak = self.weak.clone();
        let name = self.name.clone();
        handle.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(reader) = weak.upgrade() else { break };
                        let epcs = epcs.clone();
                        let _ = tokio::task::spawn_blocking(move || {
                            for epc in epcs {
                                reader.inject_tag(Tag::new("", epc));
                            }
                        })
                        .await;
                    }
                }
            }
            debug!(reader = %name, "Sighting generator stopped");
        });
        info!(reader = %self.name, period_ms = period.as_millis() as u64, "Sighting generator started");
    }

    pub fn stop_generator(&self) {
        if let Some(token) = self.generator.lock().take() {
            token.cancel();
        }
    }

    fn run_commands(&self, commands: &[CommandOp]) -> Vec<OperationResult> {
        let failing = self.failing.lock();
        commands
            .iter()
            .map(|cmd| {
                if failing.contains(&cmd.name) {
                    return OperationResult::failure(&cmd.name, OperationStatus::MiscError);
                }
                match cmd.kind {
                    CommandKind::Read => {
                        OperationResult::success(&cmd.name, Some("0".repeat(usize::from(cmd.length) * 4)))
                    }
                    _ => OperationResult::success(&cmd.name, None),
                }
            })
            .collect()
    }

    fn run_ports(&self, operations: &[PortOperation]) -> Vec<OperationResult> {
        let failing = self.failing.lock();
        operations
            .iter()
            .map(|op| {
                if failing.contains(&op.name) {
                    return OperationResult::failure(&op.name, OperationStatus::PortNotFound);
                }
                match op.kind {
                    PortOpKind::Write => {
                        self.outputs.lock().insert(op.port, op.state.unwrap_or(true));
                        OperationResult::success(&op.name, None)
                    }
                    PortOpKind::Read => {
                        let state = self.inputs.lock().get(&op.port).copied().unwrap_or(false);
                        OperationResult::success(&op.name, Some(u8::from(state).to_string()))
                    }
                }
            })
            .collect()
    }

    fn find_definition<'a>(
        definitions: &'a mut [Definition],
        operation: &ReaderOperation,
        owner: &str,
    ) -> Option<&'a mut Definition> {
        definitions
            .iter_mut()
            .find(|d| d.owner == owner && d.operation.id() == operation.id())
    }

    fn not_defined(&self, owner: &str) -> ReaderError {
        ReaderError::NotDefined {
            reader: self.name.clone(),
            owner: owner.to_string(),
        }
    }
}

impl LogicalReader for SimulatedReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn define(
        &self,
        operation: &ReaderOperation,
        callback: ReaderCallback,
        owner: &str,
    ) -> Result<(), ReaderError> {
        if self.fail_define.load(Ordering::SeqCst) {
            return Err(ReaderError::Define {
                reader: self.name.clone(),
                message: "simulated define failure".to_string(),
            });
        }
        let mut definitions = self.definitions.lock();
        match Self::find_definition(&mut definitions, operation, owner) {
            Some(existing) => {
                existing.operation = operation.clone();
                existing.callback = callback;
                existing.enabled = true;
            }
            None => definitions.push(Definition {
                owner: owner.to_string(),
                operation: operation.clone(),
                callback,
                enabled: true,
            }),
        }
        debug!(reader = %self.name, owner, operation = %operation.id(), "Operation defined");
        Ok(())
    }

    fn undefine(&self, operation: &ReaderOperation, owner: &str) -> Result<(), ReaderError> {
        let mut definitions = self.definitions.lock();
        let before = definitions.len();
        definitions.retain(|d| !(d.owner == owner && d.operation.id() == operation.id()));
        if definitions.len() == before {
            return Err(self.not_defined(owner));
        }
        Ok(())
    }

    fn enable(&self, operation: &ReaderOperation, owner: &str) -> Result<(), ReaderError> {
        let mut definitions = self.definitions.lock();
        let definition =
            Self::find_definition(&mut definitions, operation, owner).ok_or_else(|| self.not_defined(owner))?;
        definition.enabled = true;
        Ok(())
    }

    fn disable(&self, operation: &ReaderOperation, owner: &str) -> Result<(), ReaderError> {
        let mut definitions = self.definitions.lock();
        let definition =
            Self::find_definition(&mut definitions, operation, owner).ok_or_else(|| self.not_defined(owner))?;
        definition.enabled = false;
        Ok(())
    }

    fn execute(&self, request: ExecuteRequest, callback: ExecuteCallback) -> Result<(), ReaderError> {
        let results = match &request {
            ExecuteRequest::Tag { tag, commands } => {
                debug!(reader = %self.name, epc = %tag.epc, commands = commands.len(), "Executing tag commands");
                self.run_commands(commands)
            }
            ExecuteRequest::Ports(operations) => self.run_ports(operations),
        };
        let delay = *self.execute_delay.lock();
        let reader = self.name.clone();
        std::thread::Builder::new()
            .name(format!("sim-exec-{}", reader))
            .spawn(move || {
                std::thread::sleep(delay);
                callback(ExecuteResult::completed(results));
            })
            .map(|_| ())
            .map_err(|e| {
                warn!(reader = %self.name, error = %e, "Failed to spawn execution");
                ReaderError::Execute {
                    reader: self.name.clone(),
                    message: e.to_string(),
                }
            })
    }

    fn unlock(&self, owner: &str) {
        self.owners.lock().remove(owner);
    }
}

impl Drop for SimulatedReader {
    fn drop(&mut self) {
        if let Some(token) = self.generator.get_mut().take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
