//! Tests for Engine
//!
//! These tests verify:
//! - Basic put/get/update/delete operations
//! - Argument validation
//! - Cold reads (index miss) scanning segments newest → oldest
//! - Checksum rejection on both read paths
//! - I/O failures reaching the caller
//! - Diagnostic listing
//! - Engine lifecycle (open/reopen, config validation)
//! - Concurrent readers alongside a writer

use std::fs;
use std::sync::Arc;
use std::thread;

use sstkv::config::Config;
use sstkv::engine::Engine;
use sstkv::record::{decode, encode, Record};
use sstkv::{HashIndex, KvError, Locator};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn config_for(temp_dir: &TempDir, threshold: u64) -> Config {
    Config::builder()
        .data_dir(temp_dir.path())
        .segment_size_threshold(threshold)
        .sync_writes(false)
        .build()
}

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config_for(&temp_dir, 1024 * 1024)).unwrap();
    (temp_dir, engine)
}

fn setup_temp_engine_with_small_segments() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config_for(&temp_dir, 64)).unwrap();
    (temp_dir, engine)
}

/// Write filler keys until the engine has moved past its current segment
fn force_rollover(engine: &Engine) {
    let start = engine.current_segment_id();
    let mut i = 0;
    while engine.current_segment_id() == start {
        engine.put(&format!("filler{}", i), "x").unwrap();
        i += 1;
    }
}

/// Overwrite the last value byte of the record at `locator`
fn corrupt_value_byte(engine: &Engine, locator: &Locator) {
    let path = engine.store().segment_path(locator.segment_id);
    let mut data = fs::read(&path).unwrap();
    // Last byte is the terminator; the one before it ends the value
    let pos = (locator.offset + locator.length - 2) as usize;
    data[pos] ^= 0x01;
    fs::write(&path, data).unwrap();
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_open_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("mydb");

    let config = Config::builder().data_dir(&data_dir).build();
    let engine = Engine::open(config).unwrap();

    assert!(data_dir.is_dir());
    assert_eq!(engine.current_segment_id(), 0);
    assert_eq!(engine.data_dir(), data_dir.as_path());
}

#[test]
fn test_engine_put_get() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("hello", "world").unwrap();

    assert_eq!(engine.get("hello").unwrap(), Some("world".to_string()));
}

#[test]
fn test_engine_get_nonexistent_key() {
    let (_temp, engine) = setup_temp_engine();

    assert_eq!(engine.get("nonexistent").unwrap(), None);
}

#[test]
fn test_engine_overwrite() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("key", "v1").unwrap();
    engine.put("key", "v2").unwrap();

    assert_eq!(engine.get("key").unwrap(), Some("v2".to_string()));
    assert_eq!(engine.indexed_key_count(), 1);
}

#[test]
fn test_engine_update_is_put() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("key", "v1").unwrap();
    engine.update("key", "v2").unwrap();

    assert_eq!(engine.get("key").unwrap(), Some("v2".to_string()));
}

#[test]
fn test_engine_delete() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("key", "value").unwrap();
    engine.delete("key").unwrap();

    assert_eq!(engine.get("key").unwrap(), None);
    // The tombstone replaces the entry rather than removing it
    assert_eq!(engine.indexed_key_count(), 1);
}

#[test]
fn test_engine_delete_never_written_key() {
    let (_temp, engine) = setup_temp_engine();

    engine.delete("ghost").unwrap();

    assert_eq!(engine.get("ghost").unwrap(), None);
}

#[test]
fn test_engine_put_after_delete() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("key", "v1").unwrap();
    engine.delete("key").unwrap();
    engine.put("key", "v2").unwrap();

    assert_eq!(engine.get("key").unwrap(), Some("v2".to_string()));
}

#[test]
fn test_engine_put_returns_locator_of_record() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("a", "1").unwrap();
    let locator = engine.put("b", "2").unwrap();

    let record = decode(&engine.store().read(&locator).unwrap()).unwrap();
    assert_eq!(record.key, "b");
    assert_eq!(record.value.as_deref(), Some("2"));
    assert!(record.verify());
    assert!(locator.offset > 0);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_engine_rejects_empty_key() {
    let (_temp, engine) = setup_temp_engine();

    assert!(matches!(engine.put("", "v"), Err(KvError::InvalidArgument(_))));
    assert!(matches!(engine.delete(""), Err(KvError::InvalidArgument(_))));
}

#[test]
fn test_engine_rejects_delimiter_and_line_breaks() {
    let (_temp, engine) = setup_temp_engine();

    assert!(matches!(engine.put("a,b", "v"), Err(KvError::InvalidArgument(_))));
    assert!(matches!(engine.put("a", "v,w"), Err(KvError::InvalidArgument(_))));
    assert!(matches!(engine.put("a\nb", "v"), Err(KvError::InvalidArgument(_))));
    assert!(matches!(engine.put("a", "v\r"), Err(KvError::InvalidArgument(_))));

    // Nothing was written
    assert!(engine.segment_ids().unwrap().is_empty());
}

#[test]
fn test_engine_open_path_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();

    let engine = Engine::open_path(temp_dir.path()).unwrap();

    assert_eq!(engine.config().segment_size_threshold, Config::default().segment_size_threshold);
    assert!(engine.config().sync_writes);
    engine.put("a", "1").unwrap();
    assert_eq!(engine.get("a").unwrap(), Some("1".to_string()));
}

#[test]
fn test_engine_rejects_zero_threshold() {
    let temp_dir = TempDir::new().unwrap();

    let result = Engine::open(config_for(&temp_dir, 0));

    assert!(matches!(result, Err(KvError::Config(_))));
}

// =============================================================================
// Cold Read Tests
// =============================================================================

#[test]
fn test_engine_cold_read_after_clear_index() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("a", "1").unwrap();
    engine.put("b", "2").unwrap();
    engine.clear_index();

    assert_eq!(engine.indexed_key_count(), 0);
    assert_eq!(engine.get("a").unwrap(), Some("1".to_string()));
    assert_eq!(engine.get("b").unwrap(), Some("2".to_string()));
    assert_eq!(engine.get("c").unwrap(), None);
}

#[test]
fn test_engine_cold_read_newest_segment_wins() {
    let (_temp, engine) = setup_temp_engine_with_small_segments();

    engine.put("a", "1").unwrap();
    force_rollover(&engine);
    engine.put("a", "2").unwrap();
    engine.clear_index();

    assert_eq!(engine.get("a").unwrap(), Some("2".to_string()));
    assert!(engine.segment_ids().unwrap().len() >= 2);
}

#[test]
fn test_engine_cold_read_last_write_in_segment_wins() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("a", "1").unwrap();
    engine.put("a", "2").unwrap();
    engine.put("a", "3").unwrap();
    engine.clear_index();

    assert_eq!(engine.get("a").unwrap(), Some("3".to_string()));
}

#[test]
fn test_engine_cold_tombstone_shadows_older_segment() {
    let (_temp, engine) = setup_temp_engine_with_small_segments();

    engine.put("a", "1").unwrap();
    force_rollover(&engine);
    engine.delete("a").unwrap();
    engine.clear_index();

    assert_eq!(engine.get("a").unwrap(), None);
}

#[test]
fn test_engine_reopen_reads_from_segments() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(config_for(&temp_dir, 64)).unwrap();
        engine.put("a", "1").unwrap();
        force_rollover(&engine);
        engine.put("b", "2").unwrap();
        engine.delete("filler0").unwrap();
    }

    let engine = Engine::open(config_for(&temp_dir, 64)).unwrap();

    assert_eq!(engine.indexed_key_count(), 0);
    assert_eq!(engine.get("a").unwrap(), Some("1".to_string()));
    assert_eq!(engine.get("b").unwrap(), Some("2".to_string()));
    assert_eq!(engine.get("filler0").unwrap(), None);
}

#[test]
fn test_engine_reopen_continues_current_segment() {
    let temp_dir = TempDir::new().unwrap();

    let last_segment = {
        let engine = Engine::open(config_for(&temp_dir, 64)).unwrap();
        engine.put("a", "1").unwrap();
        force_rollover(&engine);
        engine.current_segment_id()
    };

    let engine = Engine::open(config_for(&temp_dir, 64)).unwrap();

    assert_eq!(engine.current_segment_id(), last_segment);
}

// =============================================================================
// Checksum Tests
// =============================================================================

#[test]
fn test_engine_corrupt_indexed_record_is_not_found() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("a", "old").unwrap();
    let locator = engine.put("a", "value").unwrap();
    corrupt_value_byte(&engine, &locator);

    // No fallback to the older valid write
    assert_eq!(engine.get("a").unwrap(), None);
}

#[test]
fn test_engine_corrupt_last_write_is_not_found_on_cold_scan() {
    let (_temp, engine) = setup_temp_engine_with_small_segments();

    engine.put("a", "old").unwrap();
    force_rollover(&engine);
    let locator = engine.put("a", "value").unwrap();
    corrupt_value_byte(&engine, &locator);
    engine.clear_index();

    assert_eq!(engine.get("a").unwrap(), None);
}

#[test]
fn test_engine_corruption_is_local_to_record() {
    let (_temp, engine) = setup_temp_engine();

    let locator = engine.put("a", "value").unwrap();
    engine.put("b", "other").unwrap();
    corrupt_value_byte(&engine, &locator);

    assert_eq!(engine.get("a").unwrap(), None);
    assert_eq!(engine.get("b").unwrap(), Some("other".to_string()));
}

#[test]
fn test_engine_missing_segment_on_index_hit() {
    let (_temp, engine) = setup_temp_engine();

    let locator = engine.put("a", "1").unwrap();
    fs::remove_file(engine.store().segment_path(locator.segment_id)).unwrap();

    assert_eq!(engine.get("a").unwrap(), None);
}

#[test]
fn test_engine_truncated_segment_on_index_hit() {
    let (_temp, engine) = setup_temp_engine();

    let locator = engine.put("a", "1").unwrap();
    let path = engine.store().segment_path(locator.segment_id);
    let data = fs::read(&path).unwrap();
    fs::write(&path, &data[..data.len() - 3]).unwrap();

    assert_eq!(engine.get("a").unwrap(), None);
}

#[test]
fn test_engine_index_hit_holding_other_key_is_not_found() {
    let (_temp, engine) = setup_temp_engine();

    let locator = engine.put("a", "1").unwrap();

    // Intact record for "z" occupying exactly the bytes indexed for "a"
    let foreign = (0u64..)
        .map(|i| encode(&Record::new(1_700_000_000_000 + i, "z", Some("1".to_string()))))
        .find(|bytes| bytes.len() as u64 == locator.length)
        .unwrap();
    fs::write(engine.store().segment_path(locator.segment_id), &foreign).unwrap();

    assert_eq!(engine.get("a").unwrap(), None);
    assert_eq!(engine.get("z").unwrap(), Some("1".to_string()));
}

// =============================================================================
// I/O Failure Tests
// =============================================================================

#[test]
fn test_engine_put_returns_io_error() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir(temp_dir.path().join("0.sst")).unwrap();
    let engine = Engine::open(config_for(&temp_dir, 1024 * 1024)).unwrap();

    let result = engine.put("a", "1");

    assert!(matches!(result, Err(KvError::Io(_))));
    assert_eq!(engine.current_segment_id(), 0);
    assert_eq!(engine.indexed_key_count(), 0);
}

#[test]
fn test_engine_index_hit_returns_io_error() {
    let (_temp, engine) = setup_temp_engine();

    let locator = engine.put("a", "1").unwrap();
    let path = engine.store().segment_path(locator.segment_id);
    fs::remove_file(&path).unwrap();
    fs::create_dir(&path).unwrap();

    // Opening succeeds but reading a directory fails
    let result = engine.get("a");

    assert!(matches!(result, Err(KvError::Io(_))));
}

// =============================================================================
// Listing Tests
// =============================================================================

#[test]
fn test_engine_list_all() {
    let (_temp, engine) = setup_temp_engine_with_small_segments();

    engine.put("a", "1").unwrap();
    force_rollover(&engine);
    engine.put("b", "2").unwrap();
    engine.delete("a").unwrap();

    let listed = engine.list_all().unwrap();

    assert_eq!(listed.first().unwrap().key, "a");
    assert_eq!(listed.first().unwrap().value.as_deref(), Some("1"));
    assert_eq!(listed.first().unwrap().segment_id, 0);

    let last = listed.last().unwrap();
    assert_eq!(last.key, "a");
    assert_eq!(last.value, None);
    assert_eq!(last.segment_id, engine.current_segment_id());

    // Oldest segment first, and timestamps never go backwards
    assert!(listed.windows(2).all(|w| w[0].segment_id <= w[1].segment_id));
    assert!(listed.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[test]
fn test_engine_list_all_skips_malformed_lines() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("a", "1").unwrap();
    engine.store().append(b"half,a,line\n").unwrap();
    engine.put("b", "2").unwrap();

    let keys: Vec<String> = engine.list_all().unwrap().into_iter().map(|r| r.key).collect();

    assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_engine_list_all_leaves_index_untouched() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("a", "1").unwrap();
    engine.clear_index();
    engine.list_all().unwrap();

    assert_eq!(engine.indexed_key_count(), 0);
}

// =============================================================================
// Index Implementation Tests
// =============================================================================

#[test]
fn test_engine_with_hash_index() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::with_index(config_for(&temp_dir, 64), HashIndex::new()).unwrap();

    engine.put("a", "1").unwrap();
    engine.put("b", "2").unwrap();
    engine.delete("b").unwrap();

    assert_eq!(engine.get("a").unwrap(), Some("1".to_string()));
    assert_eq!(engine.get("b").unwrap(), None);
    assert_eq!(engine.indexed_key_count(), 2);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_engine_concurrent_readers_and_writer() {
    let (_temp, engine) = setup_temp_engine_with_small_segments();
    let engine = Arc::new(engine);

    for i in 0..20 {
        engine.put(&format!("key{}", i), &format!("value{}", i)).unwrap();
    }

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 20..60 {
                engine.put(&format!("key{}", i), &format!("value{}", i)).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..20 {
                    let value = engine.get(&format!("key{}", i)).unwrap();
                    assert_eq!(value, Some(format!("value{}", i)));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    for i in 0..60 {
        assert_eq!(
            engine.get(&format!("key{}", i)).unwrap(),
            Some(format!("value{}", i))
        );
    }
}
