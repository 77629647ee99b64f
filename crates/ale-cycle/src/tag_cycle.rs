//! Tag notification pipeline.
//!
//! Binds one composite reader operation across every observed logical reader
//! of a cycle and forwards reader callbacks, decoded, into the cycle kind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use ale_protocols::{
    LogicalReader, ReaderCallback, ReaderError, ReaderEvent, ReaderOperation, ReaderRegistry,
    TagDecoder,
};

use crate::common_cycle::CommonCycle;
use crate::error::CycleResult;
use crate::kind::CycleKind;

struct ReaderEntry {
    reader: Arc<dyn LogicalReader>,
    /// The composite operation is defined on it. Target-only readers are
    /// locked for executions but never observed.
    observed: bool,
}

/// Logical readers locked by one owner.
pub struct ReaderSet {
    owner: String,
    entries: Vec<ReaderEntry>,
}

impl ReaderSet {
    /// Lock `observed` and `targets` (duplicates collapse, observation wins).
    /// On failure the readers already locked are released.
    pub fn lock(
        registry: &dyn ReaderRegistry,
        owner: &str,
        observed: &[String],
        targets: &[String],
    ) -> CycleResult<Self> {
        let mut set = Self {
            owner: owner.to_string(),
            entries: Vec::new(),
        };
        let wanted = observed
            .iter()
            .map(|name| (name, true))
            .chain(targets.iter().map(|name| (name, false)));
        for (name, is_observed) in wanted {
            if let Some(entry) = set.entries.iter_mut().find(|e| e.reader.name() == name.as_str()) {
                entry.observed |= is_observed;
                continue;
            }
            match registry.lock(name, owner) {
                Ok(reader) => set.entries.push(ReaderEntry {
                    reader,
                    observed: is_observed,
                }),
                Err(err) => {
                    warn!(owner, reader = %name, error = %err, "Failed to lock logical reader");
                    set.unlock_all();
                    return Err(err.into());
                }
            }
        }
        Ok(set)
    }

    /// Empty set, for cycles without readers.
    pub fn empty(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn LogicalReader>> {
        self.entries
            .iter()
            .find(|e| e.reader.name() == name)
            .map(|e| &e.reader)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.reader.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn observed(&self) -> impl Iterator<Item = &Arc<dyn LogicalReader>> {
        self.entries.iter().filter(|e| e.observed).map(|e| &e.reader)
    }

    fn unlock_all(&mut self) {
        for entry in self.entries.drain(..) {
            entry.reader.unlock(&self.owner);
        }
    }
}

/// Composite operation bound across a [`ReaderSet`].
pub struct TagCycle {
    readers: RwLock<ReaderSet>,
    operation: Option<ReaderOperation>,
    decoder: Arc<dyn TagDecoder>,
    defined: AtomicBool,
    released: AtomicBool,
}

impl TagCycle {
    pub fn new(readers: ReaderSet, operation: Option<ReaderOperation>, decoder: Arc<dyn TagDecoder>) -> Self {
        Self {
            readers: RwLock::new(readers),
            operation,
            decoder,
            defined: AtomicBool::new(false),
            released: AtomicBool::new(false),
        }
    }

    pub fn operation(&self) -> Option<&ReaderOperation> {
        self.operation.as_ref()
    }

    pub fn reader(&self, name: &str) -> Option<Arc<dyn LogicalReader>> {
        self.readers.read().get(name).cloned()
    }

    pub fn is_defined(&self) -> bool {
        self.defined.load(Ordering::SeqCst)
    }

    pub fn reader_names(&self) -> Vec<String> {
        self.readers.read().names().into_iter().map(str::to_string).collect()
    }

    /// Define the operation on every observed reader, all or nothing.
    pub fn define<K: CycleKind>(&self, cycle: &CommonCycle<K>) -> CycleResult<()> {
        let Some(operation) = &self.operation else {
            return Ok(());
        };
        let readers = self.readers.read();
        let callback = self.callback(cycle);
        let mut defined: Vec<&Arc<dyn LogicalReader>> = Vec::new();
        for reader in readers.observed() {
            if let Err(err) = reader.define(operation, callback.clone(), readers.owner()) {
                warn!(
                    cycle = %cycle.name(),
                    reader = %reader.name(),
                    error = %err,
                    "Define failed, unwinding"
                );
                for done in defined {
                    if let Err(undo) = done.undefine(operation, readers.owner()) {
                        warn!(reader = %done.name(), error = %undo, "Undefine during unwind failed");
                    }
                }
                return Err(err.into());
            }
            defined.push(reader);
        }
        self.defined.store(true, Ordering::SeqCst);
        debug!(cycle = %cycle.name(), operation = %operation.id(), readers = defined.len(), "Operation defined");
        Ok(())
    }

    pub fn undefine(&self) {
        if !self.defined.swap(false, Ordering::SeqCst) {
            return;
        }
        self.each_observed("undefine", |reader, operation, owner| reader.undefine(operation, owner));
    }

    pub fn enable(&self) {
        self.each_observed("enable", |reader, operation, owner| reader.enable(operation, owner));
    }

    pub fn disable(&self) {
        self.each_observed("disable", |reader, operation, owner| reader.disable(operation, owner));
    }

    /// Undefine and unlock every reader. Idempotent.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        self.undefine();
        self.readers.write().unlock_all();
    }

    fn each_observed<F>(&self, action: &str, f: F)
    where
        F: Fn(&dyn LogicalReader, &ReaderOperation, &str) -> Result<(), ReaderError>,
    {
        let Some(operation) = &self.operation else {
            return;
        };
        let readers = self.readers.read();
        for reader in readers.observed() {
            if let Err(err) = f(reader.as_ref(), operation, readers.owner()) {
                warn!(reader = %reader.name(), action, error = %err, "Reader operation failed");
            }
        }
    }

    fn callback<K: CycleKind>(&self, cycle: &CommonCycle<K>) -> ReaderCallback {
        let weak = cycle.weak();
        let decoder = self.decoder.clone();
        Arc::new(move |reader: &str, event: ReaderEvent| {
            let Some(cycle) = weak.upgrade() else {
                return;
            };
            match event {
                ReaderEvent::Tag(tag) => {
                    let tag = decoder.decode(tag);
                    cycle.kind().on_tag(cycle.name(), reader, &tag);
                    cycle.kind().notify_tag(&cycle, reader, tag);
                }
                ReaderEvent::Port(event) => {
                    cycle.kind().on_port(cycle.name(), reader, &event);
                    cycle.kind().notify_port(&cycle, reader, event);
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "tag_cycle_tests.rs"]
mod tests;
