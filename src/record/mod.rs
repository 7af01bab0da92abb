//! Record Module
//!
//! The unit of durable storage: one key/value write (or tombstone),
//! stamped with a timestamp and protected by a CRC32.
//!
//! ## Line Format
//! ```text
//! checksum,timestamp,keyLength,valueLength,key,value\n
//! ```
//! - `value` is empty for a tombstone. An empty-string value encodes
//!   identically and therefore also reads back as a tombstone.
//! - Keys and values may not contain `,` or line breaks; the engine
//!   rejects such input before it reaches the codec.
//!
//! The checksum covers `"{timestamp} {keyLength} {valueLength} {key} {value}"`.

pub mod codec;

pub use codec::{checksum, decode, encode};

/// Separator between the six fields of an encoded record
pub const FIELD_DELIMITER: char = ',';

/// Terminator closing every encoded record
pub const LINE_TERMINATOR: u8 = b'\n';

/// Number of fields in an encoded record
pub const FIELD_COUNT: usize = 6;

/// A single key/value write as stored in a segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// CRC32 over the other five fields
    pub checksum: u32,

    /// Wall-clock milliseconds since the epoch (metadata only)
    pub timestamp: u64,

    /// Byte length of `key`
    pub key_len: usize,

    /// Byte length of `value` (0 for a tombstone)
    pub value_len: usize,

    pub key: String,

    /// `None` marks a tombstone
    pub value: Option<String>,
}

impl Record {
    /// Build a record, deriving lengths and checksum from the inputs
    pub fn new(timestamp: u64, key: impl Into<String>, value: Option<String>) -> Self {
        let key = key.into();
        let key_len = key.len();
        let value_len = value.as_ref().map_or(0, String::len);
        let checksum = checksum(timestamp, key_len, value_len, &key, value.as_deref());

        Self {
            checksum,
            timestamp,
            key_len,
            value_len,
            key,
            value,
        }
    }

    /// Build a tombstone for `key`
    pub fn tombstone(timestamp: u64, key: impl Into<String>) -> Self {
        Self::new(timestamp, key, None)
    }

    /// True if this record deletes its key
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }

    /// Recompute the checksum and compare it with the stored one
    pub fn verify(&self) -> bool {
        self.checksum
            == checksum(
                self.timestamp,
                self.key_len,
                self.value_len,
                &self.key,
                self.value.as_deref(),
            )
    }
}
