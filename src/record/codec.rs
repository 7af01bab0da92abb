//! Record Codec
//!
//! Text encoding of a `Record` into one delimiter-joined line, and back.
//! Decoding never checks the checksum; callers decide what a mismatch means.

use crate::error::{KvError, Result};

use super::{Record, FIELD_COUNT, FIELD_DELIMITER, LINE_TERMINATOR};

/// CRC32 over the space-joined textual form of the record fields.
///
/// An absent value contributes an empty string.
pub fn checksum(
    timestamp: u64,
    key_len: usize,
    value_len: usize,
    key: &str,
    value: Option<&str>,
) -> u32 {
    let canonical = format!(
        "{} {} {} {} {}",
        timestamp,
        key_len,
        value_len,
        key,
        value.unwrap_or("")
    );

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(canonical.as_bytes());
    hasher.finalize()
}

/// Encode a record as `checksum,timestamp,keyLength,valueLength,key,value\n`
pub fn encode(record: &Record) -> Vec<u8> {
    let d = FIELD_DELIMITER;
    let mut line = format!(
        "{}{d}{}{d}{}{d}{}{d}{}{d}{}",
        record.checksum,
        record.timestamp,
        record.key_len,
        record.value_len,
        record.key,
        record.value.as_deref().unwrap_or(""),
    )
    .into_bytes();
    line.push(LINE_TERMINATOR);
    line
}

/// Decode one encoded line (with or without its terminator)
///
/// Fails with `CorruptRecord` on invalid UTF-8, a wrong field count,
/// unparseable numbers or an empty key.
pub fn decode(bytes: &[u8]) -> Result<Record> {
    let line = std::str::from_utf8(bytes)
        .map_err(|e| KvError::CorruptRecord(format!("record is not valid UTF-8: {}", e)))?;
    let line = line.trim_end_matches(|c: char| c == '\n' || c == '\r');

    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if fields.len() != FIELD_COUNT {
        return Err(KvError::CorruptRecord(format!(
            "expected {} fields, found {}",
            FIELD_COUNT,
            fields.len()
        )));
    }

    let checksum = parse_field::<u32>(fields[0], "checksum")?;
    let timestamp = parse_field::<u64>(fields[1], "timestamp")?;
    let key_len = parse_field::<usize>(fields[2], "keyLength")?;
    let value_len = parse_field::<usize>(fields[3], "valueLength")?;

    let key = fields[4];
    if key.is_empty() {
        return Err(KvError::CorruptRecord("empty key".to_string()));
    }

    let value = match fields[5] {
        "" => None,
        v => Some(v.to_string()),
    };

    Ok(Record {
        checksum,
        timestamp,
        key_len,
        value_len,
        key: key.to_string(),
        value,
    })
}

fn parse_field<T: std::str::FromStr>(field: &str, name: &str) -> Result<T> {
    field
        .parse()
        .map_err(|_| KvError::CorruptRecord(format!("invalid {}: {:?}", name, field)))
}
