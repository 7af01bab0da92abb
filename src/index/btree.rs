//! BTreeMap-backed memory index.

use std::collections::BTreeMap;

use crate::storage::Locator;

use super::MemoryIndex;

/// Ordered memory index
#[derive(Debug, Default)]
pub struct BTreeIndex {
    entries: BTreeMap<String, Locator>,
}

impl BTreeIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate entries in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Locator)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl MemoryIndex for BTreeIndex {
    fn insert(&mut self, key: String, locator: Locator) {
        self.entries.insert(key, locator);
    }

    fn delete(&mut self, key: &str) -> Option<Locator> {
        self.entries.remove(key)
    }

    fn lookup(&self, key: &str) -> Option<Locator> {
        self.entries.get(key).copied()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}
