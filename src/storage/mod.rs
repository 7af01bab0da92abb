//! Storage Module
//!
//! Persistent storage as a directory of append-only segment files.
//!
//! ## Responsibilities
//! - Discover segment files and track the current (highest id) segment
//! - Roll over to a new segment once the current one reaches the threshold
//! - Append encoded records and hand back their locators
//! - Targeted byte-range reads and whole-segment scans
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//!   ├── 0.sst      oldest, immutable
//!   ├── 1.sst      immutable
//!   └── 2.sst      current, append-only
//! ```
//! There is no manifest: the segment set is always a directory listing.
//! Files not named `<id>.sst` are ignored.

mod segment_store;

pub use segment_store::SegmentStore;

/// File extension of segment files
pub const SEGMENT_EXTENSION: &str = "sst";

/// Position of one encoded record inside one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locator {
    /// Id of the segment file holding the record
    pub segment_id: u64,

    /// Byte offset of the first byte of the record
    pub offset: u64,

    /// Encoded length, line terminator included
    pub length: u64,
}

impl Locator {
    pub fn new(segment_id: u64, offset: u64, length: u64) -> Self {
        Self {
            segment_id,
            offset,
            length,
        }
    }
}
