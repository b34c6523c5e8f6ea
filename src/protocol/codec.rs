//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Command
//! ```text
//! ┌───────────────┬────────────────────────────────────────┐
//! │ *<argc>\r\n   │ $<len>\r\n<bytes>\r\n  × argc           │
//! └───────────────┴────────────────────────────────────────┘
//! ```
//!
//! ### Reply
//! ```text
//! ┌──────────┬──────────────────────────┬─────────────────┐
//! │ Type (1) │ Line (decimal or text)   │ \r\n [+ body]   │
//! └──────────┴──────────────────────────┴─────────────────┘
//! ```

use std::io::{BufRead, Cursor, ErrorKind, Read, Write};

use crate::error::{Result, StashError};
use super::{Command, Reply};

/// Maximum bulk string size accepted from the server (512 MB)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting accepted from the server
pub const MAX_DEPTH: usize = 32;

// =============================================================================
// Command Encoding
// =============================================================================

/// Encode a command as an array of bulk strings
pub fn encode_command(command: &Command) -> Vec<u8> {
    let args = command.args();
    let body_len: usize = args.iter().map(|a| a.len() + 16).sum();

    let mut message = Vec::with_capacity(16 + body_len);
    message.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in &args {
        message.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        message.extend_from_slice(arg);
        message.extend_from_slice(b"\r\n");
    }
    message
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Reply Encoding (server side, used by test doubles)
// =============================================================================

/// Encode a reply to bytes
pub fn encode_reply(reply: &Reply) -> Vec<u8> {
    let mut out = Vec::new();
    encode_reply_into(reply, &mut out);
    out
}

fn encode_reply_into(reply: &Reply, out: &mut Vec<u8>) {
    match reply {
        Reply::Status(status) => out.extend_from_slice(format!("+{}\r\n", status).as_bytes()),
        Reply::Error(message) => out.extend_from_slice(format!("-{}\r\n", message).as_bytes()),
        Reply::Integer(n) => out.extend_from_slice(format!(":{}\r\n", n).as_bytes()),
        Reply::Bulk(None) => out.extend_from_slice(b"$-1\r\n"),
        Reply::Bulk(Some(bytes)) => {
            out.extend_from_slice(format!("${}\r\n", bytes.len()).as_bytes());
            out.extend_from_slice(bytes);
            out.extend_from_slice(b"\r\n");
        }
        Reply::Array(None) => out.extend_from_slice(b"*-1\r\n"),
        Reply::Array(Some(items)) => {
            out.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
            for item in items {
                encode_reply_into(item, out);
            }
        }
    }
}

/// Write a reply to a stream
pub fn write_reply<W: Write>(writer: &mut W, reply: &Reply) -> Result<()> {
    writer.write_all(&encode_reply(reply))?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Reply Decoding
// =============================================================================

/// Decode one reply from the front of `bytes`
///
/// Returns the reply and the number of bytes consumed. A buffer holding
/// only part of a reply is a protocol error.
pub fn decode_reply(bytes: &[u8]) -> Result<(Reply, usize)> {
    let mut cursor = Cursor::new(bytes);
    match read_reply(&mut cursor) {
        Ok(reply) => Ok((reply, cursor.position() as usize)),
        Err(StashError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => Err(
            StashError::Protocol(format!("Incomplete reply: {} bytes", bytes.len())),
        ),
        Err(e) => Err(e),
    }
}

/// Read a complete reply from a stream
///
/// Blocks until a complete reply is received or an error occurs
pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Reply> {
    read_reply_at_depth(reader, 0)
}

fn read_reply_at_depth<R: BufRead>(reader: &mut R, depth: usize) -> Result<Reply> {
    if depth > MAX_DEPTH {
        return Err(StashError::Protocol(format!(
            "Reply nested deeper than {} levels",
            MAX_DEPTH
        )));
    }

    let line = read_line(reader)?;
    let (kind, rest) = match line.split_first() {
        Some((kind, rest)) => (*kind, rest),
        None => return Err(StashError::Protocol("Empty reply line".to_string())),
    };

    match kind {
        b'+' => Ok(Reply::Status(line_text(rest)?)),
        b'-' => Ok(Reply::Error(line_text(rest)?)),
        b':' => Ok(Reply::Integer(parse_int(rest)?)),
        b'$' => {
            let len = parse_int(rest)?;
            if len < 0 {
                return Ok(Reply::Bulk(None));
            }
            let len = usize::try_from(len).unwrap_or(usize::MAX);
            if len > MAX_BULK_SIZE {
                return Err(StashError::Protocol(format!(
                    "Bulk string too large: {} bytes (max {})",
                    len, MAX_BULK_SIZE
                )));
            }

            let mut body = vec![0u8; len + 2];
            reader.read_exact(&mut body)?;
            if &body[len..] != b"\r\n" {
                return Err(StashError::Protocol(
                    "Bulk string not terminated by CRLF".to_string(),
                ));
            }
            body.truncate(len);
            Ok(Reply::Bulk(Some(body)))
        }
        b'*' => {
            let count = parse_int(rest)?;
            if count < 0 {
                return Ok(Reply::Array(None));
            }
            let mut items = Vec::with_capacity((count as usize).min(1024));
            for _ in 0..count {
                items.push(read_reply_at_depth(reader, depth + 1)?);
            }
            Ok(Reply::Array(Some(items)))
        }
        other => Err(StashError::Protocol(format!(
            "Unknown reply type: 0x{:02x}",
            other
        ))),
    }
}

/// Read one CRLF-terminated line, without the terminator
fn read_line<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    let read = reader.read_until(b'\n', &mut line)?;
    if read == 0 {
        return Err(StashError::Io(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            "connection closed before reply",
        )));
    }
    if !line.ends_with(b"\r\n") {
        if line.ends_with(b"\n") {
            return Err(StashError::Protocol("Reply line not terminated by CRLF".to_string()));
        }
        return Err(StashError::Io(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            "reply line cut short",
        )));
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

fn line_text(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| StashError::Protocol(format!("Non UTF-8 reply line: {}", e)))
}

fn parse_int(bytes: &[u8]) -> Result<i64> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| StashError::Protocol(format!("Non UTF-8 integer: {}", e)))?;
    text.parse::<i64>()
        .map_err(|_| StashError::Protocol(format!("Invalid integer: '{}'", text)))
}
