use std::collections::HashMap;

use crate::storage::Locator;

use super::MemoryIndex;

/// Unordered memory index
#[derive(Debug, Default)]
pub struct HashIndex {
    entries: HashMap<String, Locator>,
}

impl HashIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryIndex for HashIndex {
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
