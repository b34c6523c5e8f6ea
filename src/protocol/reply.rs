//! Reply definitions
//!
//! Decoded server replies and conversions into the shapes callers expect.

use crate::error::{Result, StashError};

/// A decoded server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+OK`, `+PONG`, ...
    Status(String),

    /// Error line sent by the server
    Error(String),

    Integer(i64),

    /// Bulk string; `None` is the nil bulk
    Bulk(Option<Vec<u8>>),

    /// Array of replies; `None` is the nil array
    Array(Option<Vec<Reply>>),
}

impl Reply {
    /// Turn an error line into `StashError::Store`, passing anything else through
    pub fn into_result(self) -> Result<Reply> {
        match self {
            Reply::Error(message) => Err(StashError::Store(message)),
            other => Ok(other),
        }
    }

    /// Expect a specific status line (e.g. `OK`)
    pub fn expect_status(self, expected: &str) -> Result<()> {
        match self.into_result()? {
            Reply::Status(status) if status == expected => Ok(()),
            other => Err(unexpected(&format!("+{}", expected), &other)),
        }
    }

    pub fn into_integer(self) -> Result<i64> {
        match self.into_result()? {
            Reply::Integer(n) => Ok(n),
            other => Err(unexpected("integer", &other)),
        }
    }

    /// Bulk payload, `None` for nil
    pub fn into_bulk(self) -> Result<Option<Vec<u8>>> {
        match self.into_result()? {
            Reply::Bulk(bytes) => Ok(bytes),
            other => Err(unexpected("bulk string", &other)),
        }
    }

    /// Array of non-nil bulk strings; a nil array is empty
    pub fn into_bulk_array(self) -> Result<Vec<Vec<u8>>> {
        match self.into_result()? {
            Reply::Array(None) => Ok(Vec::new()),
            Reply::Array(Some(items)) => items
                .into_iter()
                .map(|item| match item {
                    Reply::Bulk(Some(bytes)) => Ok(bytes),
                    other => Err(unexpected("bulk string element", &other)),
                })
                .collect(),
            other => Err(unexpected("array", &other)),
        }
    }

    /// Array of UTF-8 bulk strings
    pub fn into_string_array(self) -> Result<Vec<String>> {
        self.into_bulk_array()?
            .into_iter()
            .map(|bytes| {
                String::from_utf8(bytes)
                    .map_err(|e| StashError::Protocol(format!("non UTF-8 key in reply: {}", e)))
            })
            .collect()
    }
}

fn unexpected(expected: &str, got: &Reply) -> StashError {
    StashError::Protocol(format!("expected {} reply, got {:?}", expected, got))
}
