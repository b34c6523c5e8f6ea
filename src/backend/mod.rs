//! Backend Module
//!
//! Storage capability shared by the document service.
//!
//! ## Variants
//! - [`FileBackend`]: payload only, one file per document under a base directory
//! - [`IndexedBackend`]: payload + tag index + document catalog in a [`ListStore`]
//!
//! Both implement one [`Backend`] trait. Operations a variant cannot perform
//! fail with `StashError::Unsupported` instead of silently doing nothing, and
//! [`Backend::capabilities`] lets callers check ahead of time.
//!
//! ## Index Layout (indexed backend)
//! ```text
//! <key>            payload
//! tag:<name>       list of document keys carrying <name> (newest first)
//! <key>:tag        list of tags attached to <key> (newest first)
//! documents        catalog list of document keys (newest first)
//! ```

mod file;
mod indexed;

pub use file::FileBackend;
pub use indexed::IndexedBackend;

use std::sync::Arc;

use bytes::Bytes;

use crate::config::BackendConfig;
use crate::document::TagWeight;
use crate::error::{Result, StashError};
use crate::store::{ListStore, RemoteStore};

/// Number of entries returned by [`Backend::get_catalog`]
pub const CATALOG_VIEW_LEN: usize = 11;

/// What a backend variant can do beyond plain payload storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Tags, catalog and search
    pub tag_index: bool,

    /// Time-to-live on stored documents
    pub expiration: bool,
}

/// Storage capability set
///
/// `put` and `get` are mandatory. Every other operation has a default that
/// fails with `Unsupported`, so payload-only variants only override what
/// they implement.
pub trait Backend: Send + Sync {
    /// Short variant name used in logs and errors
    fn name(&self) -> &'static str;

    /// Capability flags of this variant
    fn capabilities(&self) -> Capabilities;

    /// Store a payload under `key` (overwrites)
    fn put(&self, key: &str, body: &[u8]) -> Result<()>;

    /// Read the payload of `key`
    ///
    /// A normal read (`skip_expire == false`) re-arms the key's time-to-live
    /// when one is configured; a skip-expire read never does. Absent keys
    /// fail with `NotFound`.
    fn get(&self, key: &str, skip_expire: bool) -> Result<Bytes>;

    /// Whether `key` is occupied, without touching its time-to-live
    fn exists(&self, key: &str) -> Result<bool> {
        match self.get(key, true) {
            Ok(_) => Ok(true),
            Err(StashError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Reject keys a document may not be stored under
    ///
    /// Payload-only variants accept every key.
    fn check_key(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    /// Attach `tags` to `key` in both the forward and reverse index
    fn put_tags(&self, _key: &str, _tags: &[String]) -> Result<()> {
        Err(self.unsupported("put_tags"))
    }

    /// All tags attached to `key` (empty if none)
    fn get_tags(&self, _key: &str) -> Result<Vec<String>> {
        Err(self.unsupported("get_tags"))
    }

    /// Record `key` in the document catalog
    fn put_catalog_entry(&self, _key: &str) -> Result<()> {
        Err(self.unsupported("put_catalog_entry"))
    }

    /// The most recent catalog entries, at most [`CATALOG_VIEW_LEN`]
    fn get_catalog(&self) -> Result<Vec<String>> {
        Err(self.unsupported("get_catalog"))
    }

    /// Document keys containing `substring` literally
    fn search_keys(&self, _substring: &str) -> Result<Vec<String>> {
        Err(self.unsupported("search_keys"))
    }

    /// Keys of documents tagged `tag` (empty if the tag is unknown)
    fn search_tag(&self, _tag: &str) -> Result<Vec<String>> {
        Err(self.unsupported("search_tag"))
    }

    /// Every known tag name
    fn get_all_tags(&self) -> Result<Vec<String>> {
        Err(self.unsupported("get_all_tags"))
    }

    /// Every known tag name with its document count
    fn get_all_tag_weights(&self) -> Result<Vec<TagWeight>> {
        Err(self.unsupported("get_all_tag_weights"))
    }

    /// Release any connection held by this backend
    fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    /// Build the `Unsupported` error for `operation` on this variant
    fn unsupported(&self, operation: &'static str) -> StashError {
        StashError::Unsupported {
            backend: self.name(),
            operation,
        }
    }
}

/// Open the backend described by `config`
///
/// For the indexed variant this dials the remote store; the returned handle
/// is meant to be created once and shared by every service.
pub fn open_backend(config: &BackendConfig) -> Result<Arc<dyn Backend>> {
    match config {
        BackendConfig::File(file) => {
            tracing::info!("Using file backend at {}", file.path.display());
            Ok(Arc::new(FileBackend::new(file)))
        }
        BackendConfig::Indexed(indexed) => {
            let store: Arc<dyn ListStore> = Arc::new(RemoteStore::connect(indexed)?);
            Ok(Arc::new(IndexedBackend::new(store, indexed)))
        }
    }
}
