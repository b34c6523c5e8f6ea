//! Store Module
//!
//! The external key/value-plus-list store consumed by the indexed backend.
//!
//! ## Implementations
//! - [`MemoryStore`]: in-process, for tests and embedding
//! - [`RemoteStore`]: Redis-protocol client over one shared TCP connection
//!
//! ## Semantics
//! Values are either plain byte strings or lists of byte strings. List
//! writes prepend. Keys may carry a time-to-live; an expired key behaves
//! exactly like an absent one.

mod memory;
mod remote;
pub mod pattern;

pub use memory::MemoryStore;
pub use remote::RemoteStore;

use crate::error::Result;

/// Key/value-plus-list store
///
/// Implementations must be thread-safe: one handle is shared by every
/// concurrent sub-operation of the document service.
pub trait ListStore: Send + Sync {
    /// Read a plain value. `Ok(None)` if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Set a plain value, replacing whatever the key held and clearing its TTL
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Arm a time-to-live on an existing key. `Ok(false)` if the key does not exist.
    fn expire(&self, key: &str, seconds: u64) -> Result<bool>;

    /// Prepend `value` to the list at `key`, creating it. Returns the new length.
    fn lpush(&self, key: &str, value: &[u8]) -> Result<u64>;

    /// Length of the list at `key` (0 if absent)
    fn llen(&self, key: &str) -> Result<u64>;

    /// Elements `start..=stop` of the list at `key`; negative indexes count from the end
    fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Vec<u8>>>;

    /// All keys matching a glob pattern, in no particular order
    fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Round-trip health check
    fn ping(&self) -> Result<()>;

    /// Release the connection, if any. Later calls may fail with `StoreUnavailable`.
    fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    /// Every element of the list at `key`
    fn list_all(&self, key: &str) -> Result<Vec<Vec<u8>>> {
        self.lrange(key, 0, -1)
    }
}
