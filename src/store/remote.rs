//! Remote store
//!
//! [`ListStore`] over a Redis-protocol server, sharing one connection
//! between all callers.

use parking_lot::Mutex;

use crate::config::IndexedConfig;
use crate::error::{Result, StashError};
use crate::network::Connection;
use crate::protocol::{Command, Reply};
use super::ListStore;

/// Shared handle to an external Redis-protocol store
///
/// Lifecycle is explicit: [`RemoteStore::connect`] dials, authenticates and
/// selects the database before returning; [`ListStore::shutdown`] closes the
/// connection. After a transport or framing failure the connection is
/// dropped and every later call fails with `StoreUnavailable`.
pub struct RemoteStore {
    connection: Mutex<Option<Connection>>,
    addr: String,
}

impl RemoteStore {
    /// Connect according to `config`
    pub fn connect(config: &IndexedConfig) -> Result<Self> {
        let addr = config.addr();
        tracing::info!("Configuring store connection to {}", addr);

        let mut connection = Connection::connect(&addr)?;
        connection.set_timeouts(config.read_timeout_ms, config.write_timeout_ms)?;
        Self::handshake(connection, &addr, config)
    }

    /// Use an already open connection (handshake still runs)
    pub fn with_connection(connection: Connection, config: &IndexedConfig) -> Result<Self> {
        let addr = connection.peer_addr().to_string();
        Self::handshake(connection, &addr, config)
    }

    fn handshake(mut connection: Connection, addr: &str, config: &IndexedConfig) -> Result<Self> {
        if let Some(password) = &config.password {
            connection
                .call(&Command::Auth {
                    password: password.clone(),
                })?
                .expect_status("OK")
                .map_err(|e| StashError::StoreUnavailable(format!("auth on {}: {}", addr, e)))?;
        }

        connection
            .call(&Command::Select { db: config.db })?
            .expect_status("OK")
            .map_err(|e| {
                tracing::error!("Error connecting to store index {}: {}", config.db, e);
                StashError::StoreUnavailable(format!("select {} on {}: {}", config.db, addr, e))
            })?;

        tracing::info!("Connected to store on {}/{}", addr, config.db);

        Ok(Self {
            connection: Mutex::new(Some(connection)),
            addr: addr.to_string(),
        })
    }

    /// Whether the connection is still usable
    pub fn is_connected(&self) -> bool {
        self.connection.lock().is_some()
    }

    /// Address the store was dialed at
    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn call(&self, command: Command) -> Result<Reply> {
        let mut guard = self.connection.lock();
        let connection = guard.as_mut().ok_or_else(|| {
            StashError::StoreUnavailable(format!("connection to {} is closed", self.addr))
        })?;

        match connection.call(&command) {
            Ok(reply) => Ok(reply),
            Err(e @ (StashError::StoreUnavailable(_) | StashError::Protocol(_))) => {
                // The stream position is unknown now; never reuse it
                guard.take();
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn non_negative(n: i64) -> Result<u64> {
        u64::try_from(n).map_err(|_| StashError::Protocol(format!("negative count {}", n)))
    }
}

impl ListStore for RemoteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.call(Command::Get { key: key.to_string() })?.into_bulk()
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.call(Command::Set {
            key: key.to_string(),
            value: value.to_vec(),
        })?
        .expect_status("OK")
    }

    fn expire(&self, key: &str, seconds: u64) -> Result<bool> {
        let armed = self
            .call(Command::Expire {
                key: key.to_string(),
                seconds,
            })?
            .into_integer()?;
        Ok(armed == 1)
    }

    fn lpush(&self, key: &str, value: &[u8]) -> Result<u64> {
        let len = self
            .call(Command::LPush {
                key: key.to_string(),
                value: value.to_vec(),
            })?
            .into_integer()?;
        Self::non_negative(len)
    }

    fn llen(&self, key: &str) -> Result<u64> {
        let len = self.call(Command::LLen { key: key.to_string() })?.into_integer()?;
        Self::non_negative(len)
    }

    fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Vec<u8>>> {
        self.call(Command::LRange {
            key: key.to_string(),
            start,
            stop,
        })?
        .into_bulk_array()
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.call(Command::Keys {
            pattern: pattern.to_string(),
        })?
        .into_string_array()
    }

    fn ping(&self) -> Result<()> {
        self.call(Command::Ping)?.expect_status("PONG")
    }

    /// Close the connection. Later calls fail with `StoreUnavailable`.
    fn shutdown(&self) -> Result<()> {
        let Some(mut connection) = self.connection.lock().take() else {
            return Ok(());
        };

        tracing::info!("Closing store connection to {}", self.addr);
        // Some servers close without answering QUIT
        match connection.call(&Command::Quit) {
            Ok(_) | Err(StashError::StoreUnavailable(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
