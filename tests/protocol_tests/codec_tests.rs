//! Tests for the query protocol codec
//!
//! These tests verify:
//! - Command and response framing
//! - Malformed frames are rejected
//! - Stream helpers read exactly one frame
//! - Payloads larger than one frame are split and joined again
//! - View payloads decode on the client side

use std::io::Cursor;

use sensorhub::history::HistoryRecord;
use sensorhub::protocol::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, Command, CommandType, Response, Status,
    CONTINUATION, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
use sensorhub::snapshot::SnapshotRow;
use sensorhub::{HubError, NodeView};

// =============================================================================
// Helper Functions
// =============================================================================

fn sample_view(node_id: &str) -> NodeView {
    NodeView {
        snapshot: SnapshotRow {
            node_id: node_id.to_string(),
            source_address: format!("[{}]:4210", node_id),
            temperature: 22.0,
            humidity: 48.0,
            updated_at: 2_000,
        },
        history: vec![
            HistoryRecord {
                sequence_id: 1,
                node_id: node_id.to_string(),
                temperature: 21.0,
                humidity: 50.0,
                recorded_at: 1_000,
            },
            HistoryRecord {
                sequence_id: 4,
                node_id: node_id.to_string(),
                temperature: 22.0,
                humidity: 48.0,
                recorded_at: 2_000,
            },
        ],
    }
}

// =============================================================================
// Command Tests
// =============================================================================

#[test]
fn test_command_type_bytes() {
    assert_eq!(Command::View.command_type(), CommandType::View);
    assert_eq!(encode_command(&Command::View), vec![0x01, 0, 0, 0, 0]);
    assert_eq!(encode_command(&Command::Ping), vec![0x03, 0, 0, 0, 0]);
}

#[test]
fn test_node_command_layout() {
    let bytes = encode_command(&Command::Node {
        node_id: "fe80::1".to_string(),
    });

    assert_eq!(bytes[0], 0x02);
    assert_eq!(&bytes[1..5], &11u32.to_be_bytes());
    assert_eq!(&bytes[5..9], &7u32.to_be_bytes());
    assert_eq!(&bytes[9..], b"fe80::1");
}

#[test]
fn test_decode_commands() {
    for command in [
        Command::View,
        Command::Ping,
        Command::Node {
            node_id: "192.168.1.20".to_string(),
        },
        Command::Node {
            node_id: String::new(),
        },
    ] {
        assert_eq!(decode_command(&encode_command(&command)).unwrap(), command);
    }
}

#[test]
fn test_unknown_command_type() {
    let result = decode_command(&[0x7f, 0, 0, 0, 0]);
    assert!(matches!(result, Err(HubError::Protocol(_))));
}

#[test]
fn test_incomplete_command_header() {
    assert!(decode_command(&[0x01, 0, 0]).is_err());
}

#[test]
fn test_incomplete_command_payload() {
    let mut bytes = encode_command(&Command::Node {
        node_id: "fe80::1".to_string(),
    });
    bytes.truncate(bytes.len() - 2);
    assert!(decode_command(&bytes).is_err());
}

#[test]
fn test_node_id_length_mismatch() {
    // Declares a 10-byte id but carries 3
    let mut bytes = vec![0x02, 0, 0, 0, 7];
    bytes.extend_from_slice(&10u32.to_be_bytes());
    bytes.extend_from_slice(b"abc");
    assert!(matches!(decode_command(&bytes), Err(HubError::Protocol(_))));
}

#[test]
fn test_node_id_must_be_utf8() {
    let mut bytes = vec![0x02, 0, 0, 0, 6];
    bytes.extend_from_slice(&2u32.to_be_bytes());
    bytes.extend_from_slice(&[0xff, 0xfe]);
    assert!(decode_command(&bytes).is_err());
}

#[test]
fn test_view_with_payload_rejected() {
    assert!(decode_command(&[0x01, 0, 0, 0, 1, 0xaa]).is_err());
}

#[test]
fn test_oversized_payload_rejected() {
    let mut bytes = vec![0x01];
    bytes.extend_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_be_bytes());
    assert!(decode_command(&bytes).is_err());
}

// =============================================================================
// Response Tests
// =============================================================================

#[test]
fn test_response_layout() {
    let bytes = encode_response(&Response::ok(Some(b"PONG".to_vec())));
    assert_eq!(bytes.len(), HEADER_SIZE + 4);
    assert_eq!(bytes[0], Status::Ok as u8);
    assert_eq!(&bytes[5..], b"PONG");
}

#[test]
fn test_decode_responses() {
    for response in [
        Response::ok(None),
        Response::not_found(),
        Response::error("store unavailable"),
    ] {
        assert_eq!(decode_response(&encode_response(&response)).unwrap(), response);
    }
}

#[test]
fn test_unknown_status_rejected() {
    assert!(decode_response(&[0x09, 0, 0, 0, 0]).is_err());
}

#[test]
fn test_error_message() {
    let response = Response::error("disk detached");
    assert_eq!(response.error_message().as_deref(), Some("disk detached"));
    assert_eq!(Response::not_found().error_message(), None);
}

#[test]
fn test_view_payload() {
    let views = vec![sample_view("fe80::1"), sample_view("fe80::2")];
    let response = Response::view(&views).unwrap();

    let decoded = decode_response(&encode_response(&response)).unwrap();
    assert_eq!(decoded.into_view().unwrap(), views);
}

#[test]
fn test_empty_view_payload() {
    let response = Response::view(&[]).unwrap();
    let decoded = decode_response(&encode_response(&response)).unwrap();
    assert!(decoded.into_view().unwrap().is_empty());
}

#[test]
fn test_node_payload_and_not_found() {
    let view = sample_view("fe80::1");
    let response = Response::node(&view).unwrap();
    assert_eq!(response.into_node().unwrap(), Some(view));

    assert_eq!(Response::not_found().into_node().unwrap(), None);
}

#[test]
fn test_error_response_fails_view() {
    let result = Response::error("boom").into_view();
    match result {
        Err(HubError::Network(msg)) => assert!(msg.contains("boom"), "{}", msg),
        other => panic!("expected server error, got {:?}", other),
    }
}

// =============================================================================
// Large Payload Tests
// =============================================================================

fn oversized_payload() -> Vec<u8> {
    (0..MAX_PAYLOAD_SIZE as usize + 1234)
        .map(|i| (i % 251) as u8)
        .collect()
}

#[test]
fn test_large_response_is_split_into_frames() {
    let payload = oversized_payload();
    let bytes = encode_response(&Response::ok(Some(payload.clone())));

    let first_len = MAX_PAYLOAD_SIZE as usize;
    assert_eq!(bytes[0], CONTINUATION);
    assert_eq!(&bytes[1..5], &MAX_PAYLOAD_SIZE.to_be_bytes());

    let second = HEADER_SIZE + first_len;
    assert_eq!(bytes[second], Status::Ok as u8);
    assert_eq!(&bytes[second + 1..second + 5], &1234u32.to_be_bytes());
    assert_eq!(bytes.len(), 2 * HEADER_SIZE + payload.len());
}

#[test]
fn test_large_response_decodes_whole() {
    let payload = oversized_payload();
    let response = Response::ok(Some(payload));

    let decoded = decode_response(&encode_response(&response)).unwrap();
    assert_eq!(decoded, response);
}

#[test]
fn test_large_response_over_stream() {
    let payload = oversized_payload();
    let response = Response::error(&String::from_utf8_lossy(&payload));

    let mut buffer = Vec::new();
    write_response(&mut buffer, &response).unwrap();
    write_response(&mut buffer, &Response::not_found()).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert_eq!(read_response(&mut cursor).unwrap(), response);
    assert_eq!(read_response(&mut cursor).unwrap(), Response::not_found());
}

#[test]
fn test_payload_of_exactly_one_frame() {
    let payload = vec![7u8; MAX_PAYLOAD_SIZE as usize];
    let bytes = encode_response(&Response::ok(Some(payload.clone())));

    assert_eq!(bytes[0], Status::Ok as u8);
    assert_eq!(bytes.len(), HEADER_SIZE + payload.len());
    assert_eq!(decode_response(&bytes).unwrap().payload, Some(payload));
}

#[test]
fn test_missing_final_frame_rejected() {
    let mut bytes = vec![CONTINUATION, 0, 0, 0, 2, 1, 2];
    assert!(decode_response(&bytes).is_err());

    bytes.extend_from_slice(&[Status::Ok as u8, 0, 0, 0, 1, 3]);
    let response = decode_response(&bytes).unwrap();
    assert_eq!(response.payload, Some(vec![1, 2, 3]));
}

// =============================================================================
// Stream Tests
// =============================================================================

#[test]
fn test_stream_commands_back_to_back() {
    let mut buffer = Vec::new();
    write_command(&mut buffer, &Command::Ping).unwrap();
    write_command(
        &mut buffer,
        &Command::Node {
            node_id: "fe80::1".to_string(),
        },
    )
    .unwrap();

    let mut cursor = Cursor::new(buffer);
    assert_eq!(read_command(&mut cursor).unwrap(), Command::Ping);
    assert_eq!(
        read_command(&mut cursor).unwrap(),
        Command::Node {
            node_id: "fe80::1".to_string()
        }
    );
    assert!(matches!(read_command(&mut cursor), Err(HubError::Io(_))));
}

#[test]
fn test_stream_response() {
    let mut buffer = Vec::new();
    write_response(&mut buffer, &Response::not_found()).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert_eq!(read_response(&mut cursor).unwrap(), Response::not_found());
}
