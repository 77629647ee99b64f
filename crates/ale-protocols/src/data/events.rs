//! Port event records keyed by event identity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::CycleData;
use crate::types::{OperationResult, PortEvent};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event: PortEvent,
    pub completed: bool,
    pub results: Vec<OperationResult>,
}

impl EventRecord {
    pub fn new(event: PortEvent) -> Self {
        Self {
            event,
            completed: false,
            results: Vec::new(),
        }
    }

    pub fn merge_results(&mut self, results: Vec<OperationResult>) {
        for result in results {
            match self.results.iter_mut().find(|r| r.name == result.name) {
                Some(existing) => *existing = result,
                None => self.results.push(result),
            }
        }
    }
}

/// Port events of the current and previous window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Events {
    current: BTreeMap<String, EventRecord>,
    previous: BTreeMap<String, EventRecord>,
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, record: EventRecord) -> bool {
        let key = key.into();
        if self.current.contains_key(&key) {
            return false;
        }
        self.current.insert(key, record);
        true
    }

    pub fn get(&self, key: &str) -> Option<&EventRecord> {
        self.current.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut EventRecord> {
        self.current.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<EventRecord> {
        self.current.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.current.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &EventRecord)> {
        self.current.iter()
    }

    pub fn completed(&self) -> impl Iterator<Item = &EventRecord> {
        self.current.values().filter(|r| r.completed)
    }

    pub fn previous(&self) -> impl Iterator<Item = (&String, &EventRecord)> {
        self.previous.iter()
    }
}

impl CycleData for Events {
    fn clear(&mut self) {
        self.current.clear();
    }

    fn rotate(&mut self) {
        self.previous = std::mem::take(&mut self.current);
    }

    fn reset(&mut self) {
        self.current.clear();
        self.previous.clear();
    }

    fn len(&self) -> usize {
        self.current.len()
    }

    fn has_same_data(&self, other: &Self) -> bool {
        self.current.len() == other.current.len()
            && self.current.keys().all(|k| other.current.contains_key(k))
    }
}
