//! Tests for history log entry framing
//!
//! These tests verify:
//! - Frames decode back to the same entry
//! - CRC32 corruption detection
//! - Incomplete frames and LSN mismatches are rejected
//! - Entries map onto history records

use sensorhub::history::{LogEntry, Operation, HEADER_SIZE, MAX_BODY_SIZE};
use sensorhub::HubError;

// =============================================================================
// Helper Functions
// =============================================================================

fn upsert(node_id: &str, temperature: f64, humidity: f64) -> Operation {
    Operation::Upsert {
        node_id: node_id.to_string(),
        source_address: format!("{}:4210", node_id),
        temperature,
        humidity,
    }
}

// =============================================================================
// Framing Tests
// =============================================================================

#[test]
fn test_serialize_deserialize_upsert() {
    let entry = LogEntry::new(1, 1_700_000_000_000, upsert("10.0.0.5", 23.5, 60.1));

    let bytes = entry.serialize().unwrap();
    let recovered = LogEntry::deserialize(&bytes).unwrap();

    assert_eq!(entry, recovered);
}

#[test]
fn test_frame_header_layout() {
    let entry = LogEntry::new(7, 42, upsert("fe80::1", -4.5, 99.9));
    let bytes = entry.serialize().unwrap();

    assert_eq!(u64::from_le_bytes(bytes[0..8].try_into().unwrap()), 7);

    let body = &bytes[HEADER_SIZE..];
    let crc = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
    let len = u32::from_le_bytes(bytes[12..16].try_into().unwrap());
    assert_eq!(len as usize, body.len());
    assert_eq!(crc, LogEntry::compute_crc(body));
}

#[test]
fn test_deserialize_ignores_trailing_bytes() {
    let first = LogEntry::new(1, 10, upsert("a", 1.0, 2.0));
    let second = LogEntry::new(2, 11, upsert("b", 3.0, 4.0));

    let mut bytes = first.serialize().unwrap();
    bytes.extend_from_slice(&second.serialize().unwrap());

    assert_eq!(LogEntry::deserialize(&bytes).unwrap(), first);
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_crc_detects_body_corruption() {
    let entry = LogEntry::new(3, 100, upsert("10.0.0.5", 20.0, 50.0));
    let mut bytes = entry.serialize().unwrap();

    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;

    match LogEntry::deserialize(&bytes) {
        Err(HubError::HistoryCorruption(msg)) => assert!(msg.contains("CRC"), "{}", msg),
        other => panic!("expected CRC corruption, got {:?}", other),
    }
}

#[test]
fn test_incomplete_header_rejected() {
    let entry = LogEntry::new(1, 1, upsert("n", 0.0, 0.0));
    let bytes = entry.serialize().unwrap();

    let result = LogEntry::deserialize(&bytes[..HEADER_SIZE - 1]);
    assert!(matches!(result, Err(HubError::HistoryCorruption(_))));
}

#[test]
fn test_incomplete_body_rejected() {
    let entry = LogEntry::new(1, 1, upsert("n", 0.0, 0.0));
    let bytes = entry.serialize().unwrap();

    let result = LogEntry::deserialize(&bytes[..bytes.len() - 3]);
    assert!(matches!(result, Err(HubError::HistoryCorruption(_))));
}

#[test]
fn test_header_lsn_must_match_body() {
    let entry = LogEntry::new(5, 1, upsert("n", 0.0, 0.0));
    let mut bytes = entry.serialize().unwrap();
    bytes[0..8].copy_from_slice(&6u64.to_le_bytes());

    match LogEntry::deserialize(&bytes) {
        Err(HubError::HistoryCorruption(msg)) => assert!(msg.contains("LSN"), "{}", msg),
        other => panic!("expected LSN mismatch, got {:?}", other),
    }
}

#[test]
fn test_oversized_length_rejected() {
    let entry = LogEntry::new(1, 1, upsert("n", 0.0, 0.0));
    let mut bytes = entry.serialize().unwrap();
    bytes[12..16].copy_from_slice(&(MAX_BODY_SIZE + 1).to_le_bytes());

    assert!(matches!(
        LogEntry::deserialize(&bytes),
        Err(HubError::HistoryCorruption(_))
    ));
}

// =============================================================================
// Record Mapping Tests
// =============================================================================

#[test]
fn test_to_record_copies_values() {
    let entry = LogEntry::new(9, 1234, upsert("192.168.1.20", 21.5, 48.0));
    let record = entry.to_record();

    assert_eq!(record.sequence_id, 9);
    assert_eq!(record.node_id, "192.168.1.20");
    assert_eq!(record.temperature, 21.5);
    assert_eq!(record.humidity, 48.0);
    assert_eq!(record.recorded_at, 1234);
    assert_eq!(entry.node_id(), "192.168.1.20");
}
