//! Registry of simulated readers.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use ale_protocols::{LogicalReader, ReaderError, ReaderRegistry};

use crate::reader::SimulatedReader;

/// Reader registry built by the composition root.
#[derive(Default)]
pub struct ReaderPool {
    readers: DashMap<String, Arc<SimulatedReader>>,
}

impl ReaderPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reader, replacing any unlocked reader of the same name.
    pub fn add_reader(&self, reader: Arc<SimulatedReader>) -> Result<(), ReaderError> {
        let name = reader.name().to_string();
        if self.readers.get(&name).is_some_and(|r| r.is_locked()) {
            return Err(ReaderError::InUse(name));
        }
        self.readers.insert(name, reader);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<SimulatedReader>> {
        self.readers.get(name).map(|r| r.value().clone())
    }

    /// Remove a reader. Refused while any cycle holds it.
    pub fn remove_reader(&self, name: &str) -> Result<Arc<SimulatedReader>, ReaderError> {
        let reader = self.get(name).ok_or_else(|| ReaderError::NotFound(name.to_string()))?;
        if reader.is_locked() {
            return Err(ReaderError::InUse(name.to_string()));
        }
        reader.stop_generator();
        self.readers.remove(name);
        Ok(reader)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.readers.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// Stop every generator and drop all readers.
    pub fn shutdown(&self) {
        for reader in self.readers.iter() {
            reader.stop_generator();
        }
        self.readers.clear();
    }
}

impl ReaderRegistry for ReaderPool {
    fn lock(&self, name: &str, owner: &str) -> Result<Arc<dyn LogicalReader>, ReaderError> {
        let reader = self.get(name).ok_or_else(|| ReaderError::NotFound(name.to_string()))?;
        reader.lock_for(owner);
        debug!(reader = name, owner, "Reader locked");
        Ok(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_unknown_reader() {
        let pool = ReaderPool::new();
        assert!(matches!(pool.lock("nope", "cycle-a"), Err(ReaderError::NotFound(_))));
    }

    #[test]
    fn test_locked_reader_cannot_be_removed() {
        let pool = ReaderPool::new();
        pool.add_reader(SimulatedReader::new("dock")).unwrap();

        let reader = pool.lock("dock", "cycle-a").unwrap();
        assert!(matches!(pool.remove_reader("dock"), Err(ReaderError::InUse(_))));
        assert!(matches!(
            pool.add_reader(SimulatedReader::new("dock")),
            Err(ReaderError::InUse(_))
        ));

        reader.unlock("cycle-a");
        assert!(pool.remove_reader("dock").is_ok());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_shared_lock_by_two_owners() {
        let pool = ReaderPool::new();
        pool.add_reader(SimulatedReader::new("dock")).unwrap();
        let a = pool.lock("dock", "cycle-a").unwrap();
        let _b = pool.lock("dock", "cycle-b").unwrap();
        a.unlock("cycle-a");
        assert_eq!(pool.get("dock").unwrap().lock_owners(), vec!["cycle-b".to_string()]);
    }
}
