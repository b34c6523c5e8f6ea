//! Protocol Module
//!
//! Client side of the Redis serialization protocol (RESP2), the wire format
//! spoken by the external store behind the indexed backend.
//!
//! ## Request Format
//! Every command is an array of bulk strings:
//! ```text
//! *<argc>\r\n
//! $<len>\r\n<arg bytes>\r\n   (repeated argc times)
//! ```
//!
//! ## Reply Types
//! - `+` status line       (`+OK\r\n`)
//! - `-` error line        (`-ERR unknown command\r\n`)
//! - `:` integer           (`:3\r\n`)
//! - `$` bulk string       (`$5\r\nhello\r\n`, `$-1\r\n` for nil)
//! - `*` array of replies  (`*2\r\n...`, `*-1\r\n` for nil)

mod command;
mod reply;
mod codec;

pub use command::Command;
pub use reply::Reply;
pub use codec::{
    encode_command, decode_reply, encode_reply, read_reply, write_command, write_reply,
    MAX_BULK_SIZE, MAX_DEPTH,
};
