//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Turn put/update/delete into one appended record plus an index update
//! - Serve reads from the memory index, falling back to a segment scan
//! - Verify the checksum of every record before returning its value
//! - Report every stored record for diagnostics

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::index::{BTreeIndex, MemoryIndex};
use crate::record::{self, Record, FIELD_DELIMITER};
use crate::storage::{Locator, SegmentStore};

/// One record as reported by [`Engine::list_all`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedRecord {
    pub segment_id: u64,
    pub key: String,
    /// `None` for a tombstone
    pub value: Option<String>,
    pub timestamp: u64,
}

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (put/update/delete): Serialized by `write_lock`
///   - Append and index update happen under the same guard, so a reader
///     never sees a locator for a record that was not yet appended
///
/// - **Reads** (get): Take only a read lock on the index
///   - Segment reads open their own file handle
///
/// The memory index only covers writes made by this instance. Keys written
/// by an earlier process are found by scanning segments newest → oldest.
pub struct Engine<I: MemoryIndex = BTreeIndex> {
    /// Engine configuration
    config: Config,

    /// Segment files and the current-segment cursor
    store: SegmentStore,

    /// Key → locator of the latest record written by this instance
    index: RwLock<I>,

    /// Serializes writes; holds the last issued timestamp
    write_lock: Mutex<u64>,
}

impl Engine<BTreeIndex> {
    /// Open an engine with the default ordered index
    pub fn open(config: Config) -> Result<Self> {
        Self::with_index(config, BTreeIndex::new())
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }
}

impl<I: MemoryIndex> Engine<I> {
    /// Open an engine backed by the given index implementation
    ///
    /// On startup:
    /// 1. Validate config
    /// 2. Create the data directory if needed
    /// 3. Find the current segment id from the directory listing
    ///
    /// The index is cleared: it never carries state across opens.
    pub fn with_index(config: Config, mut index: I) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let store = SegmentStore::open(
            &config.data_dir,
            config.segment_size_threshold,
            config.sync_writes,
        )?;

        index.clear();

        info!(
            data_dir = %config.data_dir.display(),
            current_segment = store.current_segment_id(),
            threshold = config.segment_size_threshold,
            "engine opened"
        );

        Ok(Self {
            config,
            store,
            index: RwLock::new(index),
            write_lock: Mutex::new(0),
        })
    }

    /// Put a key-value pair
    ///
    /// Steps:
    /// 1. Acquire write lock
    /// 2. Stamp, checksum and encode the record
    /// 3. Append it to the current segment
    /// 4. Replace the key's index entry with the new locator
    pub fn put(&self, key: &str, value: &str) -> Result<Locator> {
        validate_text("value", value)?;
        self.write(key, Some(value))
    }

    /// Alias for [`Engine::put`]
    pub fn update(&self, key: &str, value: &str) -> Result<Locator> {
        self.put(key, value)
    }

    /// Delete a key by writing a tombstone
    ///
    /// The index entry is replaced by the tombstone's locator, not removed.
    pub fn delete(&self, key: &str) -> Result<Locator> {
        self.write(key, None)
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. Memory index → one targeted segment read
    /// 2. On index miss: every segment, newest to oldest
    ///
    /// Returns `Ok(None)` for absent keys, tombstones and records that fail
    /// their checksum. Only I/O failures surface as errors.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let located = self.index.read().lookup(key);

        match located {
            Some(locator) => self.read_located(key, &locator),
            None => self.scan_segments(key),
        }
    }

    /// Every decodable record in every segment, oldest segment first
    ///
    /// Does not touch the memory index.
    pub fn list_all(&self) -> Result<Vec<ListedRecord>> {
        let mut ids = self.store.list_segment_ids_descending()?;
        ids.reverse();

        let mut listed = Vec::new();
        for segment_id in ids {
            let records = match self.store.records(segment_id) {
                Ok(records) => records,
                Err(KvError::SegmentNotFound(_)) => continue,
                Err(e) => return Err(e),
            };

            listed.extend(records.into_iter().map(|r| ListedRecord {
                segment_id,
                key: r.key,
                value: r.value,
                timestamp: r.timestamp,
            }));
        }

        debug!(count = listed.len(), "listed all records");
        Ok(listed)
    }

    /// Drop the memory index, forcing subsequent reads onto the scan path
    pub fn clear_index(&self) {
        self.index.write().clear();
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Id of the segment receiving appends
    pub fn current_segment_id(&self) -> u64 {
        self.store.current_segment_id()
    }

    /// All segment ids, newest first
    pub fn segment_ids(&self) -> Result<Vec<u64>> {
        self.store.list_segment_ids_descending()
    }

    /// Number of keys in the memory index
    pub fn indexed_key_count(&self) -> usize {
        self.index.read().len()
    }

    /// Get the segment store
    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn write(&self, key: &str, value: Option<&str>) -> Result<Locator> {
        validate_key(key)?;

        let mut last_timestamp = self.write_lock.lock();
        let timestamp = now_millis().max(*last_timestamp);
        *last_timestamp = timestamp;

        let record = Record::new(timestamp, key, value.map(str::to_string));
        let locator = self.store.append(&record::encode(&record))?;

        self.index.write().insert(key.to_string(), locator);

        Ok(locator)
    }

    /// Index hit: read, decode and verify exactly the located bytes
    ///
    /// A corrupt record, or one stored under a different key, is final;
    /// the segments are not rescanned.
    fn read_located(&self, key: &str, locator: &Locator) -> Result<Option<String>> {
        let bytes = match self.store.read(locator) {
            Ok(bytes) => bytes,
            Err(e @ (KvError::SegmentNotFound(_) | KvError::CorruptRecord(_))) => {
                warn!(key, ?locator, error = %e, "indexed record unreadable");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        match record::decode(&bytes) {
            Ok(record) if record.key != key => {
                warn!(key, found = %record.key, ?locator, "indexed record holds another key");
                Ok(None)
            }
            Ok(record) => Ok(verified_value(record)),
            Err(e) => {
                warn!(key, ?locator, error = %e, "indexed record undecodable");
                Ok(None)
            }
        }
    }

    /// Index miss: the first segment (newest first) holding the key decides
    fn scan_segments(&self, key: &str) -> Result<Option<String>> {
        for segment_id in self.store.list_segment_ids_descending()? {
            if let Some(record) = self.store.scan_file(segment_id, key) {
                debug!(key, segment_id, "cold scan hit");
                return Ok(verified_value(record));
            }
        }

        debug!(key, "cold scan miss");
        Ok(None)
    }
}

/// The record's value if its checksum holds and it is not a tombstone
fn verified_value(record: Record) -> Option<String> {
    if !record.verify() {
        warn!(
            key = %record.key,
            stored = record.checksum,
            "checksum mismatch, treating record as missing"
        );
        return None;
    }
    record.value
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(KvError::InvalidArgument("key must not be empty".to_string()));
    }
    validate_text("key", key)
}

/// Reject text that would break the line format
fn validate_text(what: &str, text: &str) -> Result<()> {
    if text.contains(|c: char| c == FIELD_DELIMITER || c == '\n' || c == '\r') {
        return Err(KvError::InvalidArgument(format!(
            "{} must not contain {:?} or line breaks",
            what, FIELD_DELIMITER
        )));
    }
    Ok(())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
