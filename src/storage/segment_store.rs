//! Segment Store
//!
//! Owns the segment directory and the current-segment cursor.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{KvError, Result};
use crate::record::{self, Record, LINE_TERMINATOR};

use super::{Locator, SEGMENT_EXTENSION};

/// Manages the set of on-disk segment files
///
/// ## Concurrency:
/// - `current_id`: held for the whole of `append`, so the rollover check
///   and the write it guards cannot interleave with another append
/// - Reads open their own file handle and take no lock
/// - No file handle outlives a single method call
pub struct SegmentStore {
    /// Directory where segments are stored
    dir: PathBuf,

    /// Rollover threshold in bytes
    threshold: u64,

    /// fsync after each append
    sync_writes: bool,

    /// Id of the segment receiving appends
    current_id: Mutex<u64>,
}

impl SegmentStore {
    /// Open the store over an existing directory
    ///
    /// The current segment is the highest id present, or 0 when the
    /// directory holds no segments.
    pub fn open(dir: &Path, threshold: u64, sync_writes: bool) -> Result<Self> {
        let current_id = Self::discover(dir)?.into_iter().max().unwrap_or(0);

        debug!(dir = %dir.display(), current_id, threshold, "segment store opened");

        Ok(Self {
            dir: dir.to_path_buf(),
            threshold,
            sync_writes,
            current_id: Mutex::new(current_id),
        })
    }

    /// Id of the segment that receives the next append (before rollover)
    pub fn current_segment_id(&self) -> u64 {
        *self.current_id.lock()
    }

    /// Append encoded bytes, rolling over first if the current segment
    /// has reached the threshold
    ///
    /// The check uses the length before this write, so one append may
    /// push a segment past the threshold; the next append rolls over.
    pub fn append(&self, bytes: &[u8]) -> Result<Locator> {
        let mut current = self.current_id.lock();

        let current_len = Self::file_len(&self.segment_path(*current))?;
        let segment_id = if current_len >= self.threshold {
            *current + 1
        } else {
            *current
        };

        // The cursor only moves once the new segment file exists
        let path = self.segment_path(segment_id);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if segment_id != *current {
            info!(
                previous = *current,
                next = segment_id,
                size = current_len,
                "segment reached threshold, rolling over"
            );
            *current = segment_id;
        }
        let offset = file.metadata()?.len();

        file.write_all(bytes)?;
        if self.sync_writes {
            file.sync_data()?;
        }

        debug!(segment_id, offset, length = bytes.len(), "appended record");

        Ok(Locator::new(segment_id, offset, bytes.len() as u64))
    }

    /// Read `length` bytes at `offset` from segment `segment_id`
    ///
    /// Returns:
    /// - `Err(SegmentNotFound)` — no such segment file
    /// - `Err(CorruptRecord)` — the range runs past the end of the file
    /// - `Err(Io)` — any other read failure
    pub fn read_range(&self, segment_id: u64, offset: u64, length: u64) -> Result<Vec<u8>> {
        let mut file = self.open_segment(segment_id)?;
        file.seek(SeekFrom::Start(offset))?;

        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                KvError::CorruptRecord(format!(
                    "segment {} ends before {}+{}",
                    segment_id, offset, length
                ))
            } else {
                KvError::Io(e)
            }
        })?;

        Ok(buf)
    }

    /// Read the bytes a locator points at
    pub fn read(&self, locator: &Locator) -> Result<Vec<u8>> {
        self.read_range(locator.segment_id, locator.offset, locator.length)
    }

    /// All segment ids, newest (largest) first
    pub fn list_segment_ids_descending(&self) -> Result<Vec<u64>> {
        let mut ids = Self::discover(&self.dir)?;
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    /// Decode every well-formed record of a segment, in file order
    ///
    /// Lines that fail to decode are skipped.
    pub fn records(&self, segment_id: u64) -> Result<Vec<Record>> {
        let data = match fs::read(self.segment_path(segment_id)) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(KvError::SegmentNotFound(segment_id))
            }
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (line_no, line) in data
            .split(|&b| b == LINE_TERMINATOR)
            .enumerate()
            .filter(|(_, line)| !line.is_empty())
        {
            match record::decode(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(segment_id, line_no, error = %e, "skipping undecodable line"),
            }
        }

        Ok(records)
    }

    /// Last record for `key` in file order, or `None` if the segment has
    /// no match or cannot be read
    pub fn scan_file(&self, segment_id: u64, key: &str) -> Option<Record> {
        match self.records(segment_id) {
            Ok(records) => records.into_iter().rev().find(|r| r.key == key),
            Err(e) => {
                warn!(segment_id, error = %e, "segment unreadable during scan");
                None
            }
        }
    }

    /// Get the directory path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the rollover threshold
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Generate the file path for a segment with given id
    pub fn segment_path(&self, segment_id: u64) -> PathBuf {
        self.dir.join(format!("{}.{}", segment_id, SEGMENT_EXTENSION))
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn open_segment(&self, segment_id: u64) -> Result<File> {
        File::open(self.segment_path(segment_id)).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                KvError::SegmentNotFound(segment_id)
            } else {
                KvError::Io(e)
            }
        })
    }

    /// Length of a file, 0 if it does not exist yet
    fn file_len(path: &Path) -> Result<u64> {
        match fs::metadata(path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Segment ids present in `dir`, unordered
    fn discover(dir: &Path) -> Result<Vec<u64>> {
        let mut ids = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }
            match Self::parse_segment_id(&path) {
                Some(id) => ids.push(id),
                None => debug!(path = %path.display(), "ignoring non-segment file"),
            }
        }

        Ok(ids)
    }

    /// Parse segment id from filename
    /// "42.sst" → Some(42), "042.sst" / "x.sst" / "42.log" → None
    fn parse_segment_id(path: &Path) -> Option<u64> {
        if path.extension()?.to_str()? != SEGMENT_EXTENSION {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let id: u64 = stem.parse().ok()?;
        (id.to_string() == stem).then_some(id)
    }
}
