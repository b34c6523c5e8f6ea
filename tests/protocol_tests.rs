//! Codec Tests
//!
//! Tests for command encoding and reply decoding.

use std::io::Cursor;

use docstash::protocol::{
    decode_reply, encode_command, encode_reply, read_reply, write_command, Command, Reply,
    MAX_DEPTH,
};
use docstash::StashError;

// =============================================================================
// Command Encoding Tests
// =============================================================================

#[test]
fn test_encode_get() {
    let cmd = Command::Get {
        key: "hello".to_string(),
    };
    assert_eq!(encode_command(&cmd), b"*2\r\n$3\r\nGET\r\n$5\r\nhello\r\n");
}

#[test]
fn test_encode_set_binary_value() {
    let cmd = Command::Set {
        key: "k".to_string(),
        value: b"a\r\nb".to_vec(),
    };
    assert_eq!(
        encode_command(&cmd),
        b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$4\r\na\r\nb\r\n"
    );
}

#[test]
fn test_encode_lrange_negative_stop() {
    let cmd = Command::LRange {
        key: "tag:x".to_string(),
        start: 0,
        stop: -1,
    };
    assert_eq!(
        encode_command(&cmd),
        b"*4\r\n$6\r\nLRANGE\r\n$5\r\ntag:x\r\n$1\r\n0\r\n$2\r\n-1\r\n"
    );
}

#[test]
fn test_encode_ping_no_args() {
    assert_eq!(encode_command(&Command::Ping), b"*1\r\n$4\r\nPING\r\n");
}

#[test]
fn test_command_names() {
    assert_eq!(Command::Select { db: 3 }.name(), "SELECT");
    assert_eq!(
        Command::Expire {
            key: "k".to_string(),
            seconds: 5
        }
        .args(),
        vec![b"EXPIRE".to_vec(), b"k".to_vec(), b"5".to_vec()]
    );
}

#[test]
fn test_write_command_to_buffer() {
    let mut buffer = Vec::new();
    write_command(&mut buffer, &Command::Quit).unwrap();
    assert_eq!(buffer, b"*1\r\n$4\r\nQUIT\r\n");
}

#[test]
fn test_command_reads_back_as_array() {
    let cmd = Command::LPush {
        key: "documents".to_string(),
        value: b"note1".to_vec(),
    };
    let (reply, _) = decode_reply(&encode_command(&cmd)).unwrap();
    assert_eq!(reply.into_bulk_array().unwrap(), cmd.args());
}

// =============================================================================
// Reply Decoding Tests
// =============================================================================

#[test]
fn test_decode_simple_replies() {
    assert_eq!(
        decode_reply(b"+OK\r\n").unwrap(),
        (Reply::Status("OK".to_string()), 5)
    );
    assert_eq!(decode_reply(b":42\r\n").unwrap().0, Reply::Integer(42));
    assert_eq!(decode_reply(b":-7\r\n").unwrap().0, Reply::Integer(-7));
    assert_eq!(
        decode_reply(b"-ERR boom\r\n").unwrap().0,
        Reply::Error("ERR boom".to_string())
    );
}

#[test]
fn test_decode_bulk_and_nil() {
    assert_eq!(
        decode_reply(b"$5\r\nhello\r\n").unwrap().0,
        Reply::Bulk(Some(b"hello".to_vec()))
    );
    assert_eq!(decode_reply(b"$0\r\n\r\n").unwrap().0, Reply::Bulk(Some(Vec::new())));
    assert_eq!(decode_reply(b"$-1\r\n").unwrap().0, Reply::Bulk(None));
    assert_eq!(decode_reply(b"*-1\r\n").unwrap().0, Reply::Array(None));
}

#[test]
fn test_decode_nested_array() {
    let bytes = b"*2\r\n$1\r\na\r\n*1\r\n:1\r\n";
    let (reply, consumed) = decode_reply(bytes).unwrap();
    assert_eq!(consumed, bytes.len());
    assert_eq!(
        reply,
        Reply::Array(Some(vec![
            Reply::Bulk(Some(b"a".to_vec())),
            Reply::Array(Some(vec![Reply::Integer(1)])),
        ]))
    );
}

#[test]
fn test_decode_consumes_one_reply() {
    let (reply, consumed) = decode_reply(b"+OK\r\n:1\r\n").unwrap();
    assert_eq!(reply, Reply::Status("OK".to_string()));
    assert_eq!(consumed, 5);
}

#[test]
fn test_decode_incomplete() {
    for partial in [&b"$5\r\nhel"[..], b"*2\r\n:1\r\n", b"+OK"] {
        match decode_reply(partial) {
            Err(StashError::Protocol(message)) => assert!(message.contains("Incomplete")),
            other => panic!("Expected incomplete reply error, got {:?}", other),
        }
    }
}

#[test]
fn test_decode_unknown_type() {
    assert!(matches!(
        decode_reply(b"!oops\r\n"),
        Err(StashError::Protocol(_))
    ));
}

#[test]
fn test_decode_bad_integer() {
    assert!(matches!(decode_reply(b":abc\r\n"), Err(StashError::Protocol(_))));
}

#[test]
fn test_decode_bulk_over_limit() {
    for header in [&b"$9223372036854775807\r\n"[..], b"$4294967297\r\n"] {
        match decode_reply(header) {
            Err(StashError::Protocol(message)) => assert!(message.contains("too large")),
            other => panic!("Expected bulk size error, got {:?}", other),
        }
    }
}

#[test]
fn test_decode_too_deep() {
    let mut bytes = Vec::new();
    for _ in 0..=MAX_DEPTH + 1 {
        bytes.extend_from_slice(b"*1\r\n");
    }
    bytes.extend_from_slice(b":1\r\n");

    match decode_reply(&bytes) {
        Err(StashError::Protocol(message)) => assert!(message.contains("nested")),
        other => panic!("Expected depth error, got {:?}", other),
    }
}

#[test]
fn test_read_replies_from_stream() {
    let mut bytes = encode_reply(&Reply::Status("PONG".to_string()));
    bytes.extend(encode_reply(&Reply::Bulk(Some(b"body".to_vec()))));
    let mut cursor = Cursor::new(bytes);

    assert_eq!(read_reply(&mut cursor).unwrap(), Reply::Status("PONG".to_string()));
    assert_eq!(
        read_reply(&mut cursor).unwrap(),
        Reply::Bulk(Some(b"body".to_vec()))
    );
    assert!(read_reply(&mut cursor).is_err());
}

// =============================================================================
// Reply Conversion Tests
// =============================================================================

#[test]
fn test_error_reply_becomes_store_error() {
    match Reply::Error("WRONGTYPE bad".to_string()).into_integer() {
        Err(StashError::Store(message)) => assert_eq!(message, "WRONGTYPE bad"),
        other => panic!("Expected store error, got {:?}", other),
    }
}

#[test]
fn test_reply_shape_mismatch() {
    assert!(matches!(
        Reply::Integer(1).into_bulk(),
        Err(StashError::Protocol(_))
    ));
    assert!(Reply::Status("QUEUED".to_string()).expect_status("OK").is_err());
}

#[test]
fn test_string_array() {
    let reply = Reply::Array(Some(vec![
        Reply::Bulk(Some(b"tag:a".to_vec())),
        Reply::Bulk(Some(b"tag:b".to_vec())),
    ]));
    assert_eq!(reply.into_string_array().unwrap(), vec!["tag:a", "tag:b"]);
    assert!(Reply::Array(None).into_string_array().unwrap().is_empty());
}
