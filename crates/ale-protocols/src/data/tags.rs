//! Tag records keyed by primary key.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CycleData;
use crate::types::{DecodedTag, OperationResult, Tag};

/// Per-reader sighting statistics of one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SightingStats {
    pub count: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub antennas: BTreeSet<u16>,
}

impl SightingStats {
    fn new(tag: &Tag) -> Self {
        let mut antennas = BTreeSet::new();
        antennas.insert(tag.antenna);
        Self {
            count: tag.count,
            first_seen: tag.seen_at,
            last_seen: tag.seen_at,
            antennas,
        }
    }

    fn record(&mut self, tag: &Tag) {
        self.count = self.count.saturating_add(tag.count);
        if tag.seen_at > self.last_seen {
            self.last_seen = tag.seen_at;
        }
        if tag.seen_at < self.first_seen {
            self.first_seen = tag.seen_at;
        }
        self.antennas.insert(tag.antenna);
    }
}

/// A tracked tag within a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    /// Latest sighting.
    pub tag: Tag,
    pub identity: String,
    /// Reportable: the match or completion predicate holds.
    pub completed: bool,
    /// Sighting statistics per reader name.
    pub stats: BTreeMap<String, SightingStats>,
    /// Operation results merged from inventory and executions.
    pub results: Vec<OperationResult>,
}

impl TagRecord {
    pub fn new(tag: &DecodedTag) -> Self {
        let raw = tag.tag();
        let mut stats = BTreeMap::new();
        stats.insert(raw.reader.clone(), SightingStats::new(raw));
        Self {
            tag: raw.clone(),
            identity: tag.identity().to_string(),
            completed: false,
            stats,
            results: raw.results.clone(),
        }
    }

    /// Fold another sighting of the same tag into this record.
    pub fn sighting(&mut self, tag: &Tag) {
        match self.stats.get_mut(&tag.reader) {
            Some(stats) => stats.record(tag),
            None => {
                self.stats.insert(tag.reader.clone(), SightingStats::new(tag));
            }
        }
        if !tag.results.is_empty() {
            self.merge_results(tag.results.clone());
        }
        if tag.seen_at >= self.tag.seen_at {
            let results = std::mem::take(&mut self.tag.results);
            self.tag = tag.clone();
            if self.tag.results.is_empty() {
                self.tag.results = results;
            }
        }
    }

    /// Merge operation results, replacing earlier results of the same name.
    pub fn merge_results(&mut self, results: Vec<OperationResult>) {
        for result in results {
            match self.results.iter_mut().find(|r| r.name == result.name) {
                Some(existing) => *existing = result,
                None => self.results.push(result),
            }
        }
    }

    /// Total sightings across all readers.
    pub fn sighting_count(&self) -> u32 {
        self.stats.values().map(|s| s.count).sum()
    }
}

/// Tags of the current and previous window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    current: BTreeMap<String, TagRecord>,
    previous: BTreeMap<String, TagRecord>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new record; returns false if the key was already tracked.
    pub fn add(&mut self, key: impl Into<String>, record: TagRecord) -> bool {
        let key = key.into();
        if self.current.contains_key(&key) {
            return false;
        }
        self.current.insert(key, record);
        true
    }

    pub fn get(&self, key: &str) -> Option<&TagRecord> {
        self.current.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut TagRecord> {
        self.current.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<TagRecord> {
        self.current.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.current.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TagRecord)> {
        self.current.iter()
    }

    /// Records that are reportable in the current window.
    pub fn completed(&self) -> impl Iterator<Item = &TagRecord> {
        self.current.values().filter(|r| r.completed)
    }

    pub fn previous(&self) -> impl Iterator<Item = (&String, &TagRecord)> {
        self.previous.iter()
    }

    /// Keys present now but not in the previous window.
    pub fn additions(&self) -> Vec<&TagRecord> {
        self.current
            .iter()
            .filter(|(k, _)| !self.previous.contains_key(*k))
            .map(|(_, r)| r)
            .collect()
    }

    /// Keys present in the previous window but not now.
    pub fn deletions(&self) -> Vec<&TagRecord> {
        self.previous
            .iter()
            .filter(|(k, _)| !self.current.contains_key(*k))
            .map(|(_, r)| r)
            .collect()
    }
}

impl CycleData for Tags {
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
