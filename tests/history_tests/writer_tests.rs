//! Tests for the history log writer and reader
//!
//! These tests verify:
//! - LSNs are assigned sequentially and survive reopening
//! - Timestamps never go backwards
//! - Entries read back in append order
//! - Both sync strategies leave complete entries on disk
//! - A failed append that cannot be cut back blocks later appends

use std::path::PathBuf;

use sensorhub::config::SyncStrategy;
use sensorhub::history::{HistoryReader, HistoryWriter, Operation};
use sensorhub::{HubError, StoreError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("history.log");
    (temp_dir, log_path)
}

fn reading(node_id: &str, temperature: f64) -> Operation {
    Operation::Upsert {
        node_id: node_id.to_string(),
        source_address: format!("{}:5000", node_id),
        temperature,
        humidity: 50.0,
    }
}

// =============================================================================
// LSN Tests
// =============================================================================

#[test]
fn test_new_log_starts_at_lsn_one() {
    let (_temp, path) = setup_temp_log();
    let mut writer = HistoryWriter::open(&path, SyncStrategy::EveryWrite).unwrap();

    assert!(writer.is_empty());
    assert_eq!(writer.current_lsn(), 1);
    assert_eq!(writer.last_lsn(), 0);

    let entry = writer.append(reading("a", 20.0)).unwrap();
    assert_eq!(entry.lsn, 1);
    assert_eq!(writer.current_lsn(), 2);
    assert_eq!(writer.last_lsn(), 1);
    assert!(!writer.is_empty());
}

#[test]
fn test_lsns_are_sequential() {
    let (_temp, path) = setup_temp_log();
    let mut writer = HistoryWriter::open(&path, SyncStrategy::EveryWrite).unwrap();

    let lsns: Vec<u64> = (0..10)
        .map(|i| writer.append(reading("a", i as f64)).unwrap().lsn)
        .collect();

    assert_eq!(lsns, (1..=10).collect::<Vec<_>>());
}

#[test]
fn test_reopen_continues_lsn() {
    let (_temp, path) = setup_temp_log();

    {
        let mut writer = HistoryWriter::open(&path, SyncStrategy::EveryWrite).unwrap();
        writer.append(reading("a", 1.0)).unwrap();
        writer.append(reading("b", 2.0)).unwrap();
    }

    let mut writer = HistoryWriter::open(&path, SyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.current_lsn(), 3);
    assert_eq!(writer.append(reading("a", 3.0)).unwrap().lsn, 3);
}

#[test]
fn test_len_tracks_file_size() {
    let (_temp, path) = setup_temp_log();
    let mut writer = HistoryWriter::open(&path, SyncStrategy::EveryWrite).unwrap();

    writer.append(reading("a", 1.0)).unwrap();
    writer.append(reading("a", 2.0)).unwrap();

    assert_eq!(writer.len(), std::fs::metadata(&path).unwrap().len());
    assert_eq!(writer.path(), path.as_path());
}

// =============================================================================
// Timestamp Tests
// =============================================================================

#[test]
fn test_timestamps_non_decreasing() {
    let (_temp, path) = setup_temp_log();
    let mut writer = HistoryWriter::open(&path, SyncStrategy::EveryWrite).unwrap();

    let mut previous = 0;
    for i in 0..50 {
        let entry = writer.append(reading("a", i as f64)).unwrap();
        assert!(entry.timestamp >= previous);
        previous = entry.timestamp;
    }
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_reader_returns_entries_in_order() {
    let (_temp, path) = setup_temp_log();
    let mut writer = HistoryWriter::open(&path, SyncStrategy::EveryWrite).unwrap();

    let written: Vec<_> = ["a", "b", "a", "c"]
        .iter()
        .enumerate()
        .map(|(i, node)| writer.append(reading(node, i as f64)).unwrap())
        .collect();
    drop(writer);

    let read: Vec<_> = HistoryReader::open(&path)
        .unwrap()
        .entries()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(read, written);
}

#[test]
fn test_reader_empty_file() {
    let (_temp, path) = setup_temp_log();
    std::fs::File::create(&path).unwrap();

    let mut reader = HistoryReader::open(&path).unwrap();
    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), 0);
    assert_eq!(reader.last_lsn(), 0);
}

#[test]
fn test_reader_reports_partial_tail() {
    let (_temp, path) = setup_temp_log();
    {
        let mut writer = HistoryWriter::open(&path, SyncStrategy::EveryWrite).unwrap();
        writer.append(reading("a", 1.0)).unwrap();
    }
    let good_len = std::fs::metadata(&path).unwrap().len();

    // Half a header
    let mut bytes = std::fs::read(&path).unwrap();
    bytes.extend_from_slice(&[0u8; 7]);
    std::fs::write(&path, &bytes).unwrap();

    let mut reader = HistoryReader::open(&path).unwrap();
    assert!(reader.next_entry().unwrap().is_some());
    assert!(reader.next_entry().is_err());
    assert_eq!(reader.position(), good_len);
}

// =============================================================================
// Sync Strategy Tests
// =============================================================================

#[test]
fn test_every_n_entries_keeps_entries_readable() {
    let (_temp, path) = setup_temp_log();
    {
        let mut writer =
            HistoryWriter::open(&path, SyncStrategy::EveryNEntries { count: 4 }).unwrap();
        for i in 0..10 {
            writer.append(reading("a", i as f64)).unwrap();
        }
        writer.sync().unwrap();
    }

    let count = HistoryReader::open(&path).unwrap().entries().count();
    assert_eq!(count, 10);
}

// =============================================================================
// Failure Tests
// =============================================================================

/// `/dev/full` rejects every write and cannot be truncated
#[cfg(target_os = "linux")]
#[test]
fn test_unrecoverable_append_failure_blocks_writer() {
    let full = std::path::Path::new("/dev/full");
    if !full.exists() {
        return;
    }
    let (_temp, path) = setup_temp_log();
    std::os::unix::fs::symlink(full, &path).unwrap();

    let mut writer = HistoryWriter::open(&path, SyncStrategy::EveryWrite).unwrap();

    assert!(writer.append(reading("a", 1.0)).is_err());
    assert!(writer.has_dirty_tail());
    assert_eq!(writer.current_lsn(), 1);

    // Nothing may be appended behind bytes that recovery would cut off
    match writer.append(reading("a", 2.0)) {
        Err(HubError::Store(StoreError::Unavailable(msg))) => {
            assert!(msg.contains("partial entry"), "{}", msg)
        }
        other => panic!("expected the writer to refuse appends, got {:?}", other),
    }
    assert_eq!(writer.current_lsn(), 1);
    assert!(writer.is_empty());
}

#[test]
fn test_clean_writer_has_no_dirty_tail() {
    let (_temp, path) = setup_temp_log();
    let mut writer = HistoryWriter::open(&path, SyncStrategy::EveryWrite).unwrap();
    writer.append(reading("a", 1.0)).unwrap();
    assert!(!writer.has_dirty_tail());
}
