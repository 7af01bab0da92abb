//! Memory Index Module
//!
//! Maps each key to the locator of its latest record.
//!
//! ## Responsibilities
//! - Exact-match lookups for warm reads
//! - One entry per key, replaced on every write (tombstones included)
//! - Starts empty on every open; never rebuilt from disk
//!
//! ## Data Structure Choice
//! `BTreeIndex` (ordered) is the engine default. `HashIndex` satisfies the
//! same contract for callers that never need ordered traversal.

mod btree;
mod hash;

pub use btree::BTreeIndex;
pub use hash::HashIndex;

use crate::storage::Locator;

/// Exact-match key → locator map consulted by the engine
pub trait MemoryIndex: Send + Sync {
    /// Insert or replace the locator for `key`
    fn insert(&mut self, key: String, locator: Locator);

    /// Remove `key`, returning its locator if present
    fn delete(&mut self, key: &str) -> Option<Locator>;

    /// Look up the locator for `key`
    fn lookup(&self, key: &str) -> Option<Locator>;

    /// Number of indexed keys
    fn len(&self) -> usize;

    /// Drop every entry
    fn clear(&mut self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
