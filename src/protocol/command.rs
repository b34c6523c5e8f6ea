//! Command definitions
//!
//! The subset of store commands the document backends issue.

/// A store command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Authenticate the connection
    Auth { password: String },

    /// Select a logical database
    Select { db: u32 },

    /// Health check
    Ping,

    /// Ask the server to close the connection
    Quit,

    /// Read a plain value
    Get { key: String },

    /// Write a plain value
    Set { key: String, value: Vec<u8> },

    /// Arm a time-to-live in seconds
    Expire { key: String, seconds: u64 },

    /// Prepend to a list
    LPush { key: String, value: Vec<u8> },

    /// List length
    LLen { key: String },

    /// Inclusive list slice
    LRange { key: String, start: i64, stop: i64 },

    /// Enumerate keys matching a glob pattern
    Keys { pattern: String },
}

impl Command {
    /// Command name as sent on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Command::Auth { .. } => "AUTH",
            Command::Select { .. } => "SELECT",
            Command::Ping => "PING",
            Command::Quit => "QUIT",
            Command::Get { .. } => "GET",
            Command::Set { .. } => "SET",
            Command::Expire { .. } => "EXPIRE",
            Command::LPush { .. } => "LPUSH",
            Command::LLen { .. } => "LLEN",
            Command::LRange { .. } => "LRANGE",
            Command::Keys { .. } => "KEYS",
        }
    }

    /// Full argument vector, command name first
    pub fn args(&self) -> Vec<Vec<u8>> {
        let mut args = vec![self.name().as_bytes().to_vec()];
        match self {
            Command::Auth { password } => args.push(password.as_bytes().to_vec()),
            Command::Select { db } => args.push(db.to_string().into_bytes()),
            Command::Ping | Command::Quit => {}
            Command::Get { key } | Command::LLen { key } => args.push(key.as_bytes().to_vec()),
            Command::Set { key, value } | Command::LPush { key, value } => {
                args.push(key.as_bytes().to_vec());
                args.push(value.clone());
            }
            Command::Expire { key, seconds } => {
                args.push(key.as_bytes().to_vec());
                args.push(seconds.to_string().into_bytes());
            }
            Command::LRange { key, start, stop } => {
                args.push(key.as_bytes().to_vec());
                args.push(start.to_string().into_bytes());
                args.push(stop.to_string().into_bytes());
            }
            Command::Keys { pattern } => args.push(pattern.as_bytes().to_vec()),
        }
        args
    }
}
