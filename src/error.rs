//! Error types for docstash
//!
//! Provides a unified error type for all operations. Every failure that can
//! reach a caller keeps its cause distinguishable so that a boundary layer
//! (HTTP, CLI) can pick an appropriate outward signal.

use thiserror::Error;

use crate::document::WriteStep;

/// Result type alias using StashError
pub type Result<T> = std::result::Result<T, StashError>;

/// Unified error type for docstash operations
#[derive(Debug, Error)]
pub enum StashError {
    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document already exists: {0}")]
    DuplicateKey(String),

    /// The key collides with the backend's reserved index key space
    #[error("Invalid document key: {0}")]
    InvalidKey(String),

    // -------------------------------------------------------------------------
    // Capability Errors
    // -------------------------------------------------------------------------
    #[error("Operation '{operation}' is not supported by the {backend} backend")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },

    // -------------------------------------------------------------------------
    // Write Errors
    // -------------------------------------------------------------------------
    #[error("Document exceeds maximum length: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Some sub-writes of a compound put completed and some did not.
    /// Completed steps are NOT rolled back.
    #[error("Partial write for '{key}': completed {completed:?}, failed {failed:?}: {source}")]
    PartialWriteFailure {
        key: String,
        completed: Vec<WriteStep>,
        failed: Vec<WriteStep>,
        #[source]
        source: Box<StashError>,
    },

    // -------------------------------------------------------------------------
    // Key Allocation Errors
    // -------------------------------------------------------------------------
    #[error("No free key found after {attempts} attempts")]
    KeyspaceExhausted { attempts: u32 },

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StashError {
    /// True for a read against an absent key
    pub fn is_not_found(&self) -> bool {
        matches!(self, StashError::NotFound(_))
    }

    /// True when the active backend lacks the requested capability
    pub fn is_unsupported(&self) -> bool {
        matches!(self, StashError::Unsupported { .. })
    }

    /// True for connection/transport level failures of the external store
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StashError::StoreUnavailable(_))
    }
}
