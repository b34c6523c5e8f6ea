//! # docstash
//!
//! A small document store that keeps opaque text blobs under random keys,
//! with a secondary index from free-form tags to documents:
//! - Collision-checked key allocation
//! - Pluggable backends (payload-only files, or a Redis-protocol store with
//!   tag index and document catalog)
//! - Compound put/get/search operations joined fail-fast over concurrent
//!   sub-operations
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Boundary layer (CLI, HTTP, ...)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  DocumentService                            │
//! │        (size limit, fail-fast join, key allocation)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────┐
//!   │ FileBackend │          │IndexedBackend│
//!   │ (payloads)  │          │ (+tags, cat.)│
//!   └─────────────┘          └──────┬───────┘
//!                                   │
//!                                   ▼
//!                           ┌──────────────┐
//!                           │  ListStore   │
//!                           │(memory/RESP) │
//!                           └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod document;

pub mod keys;
pub mod store;
pub mod protocol;
pub mod network;
pub mod backend;
pub mod join;
pub mod service;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StashError, Result};
pub use config::{BackendConfig, Config, FileConfig, IndexedConfig};
pub use document::{Document, SearchQuery, SearchResults, TagWeight, WriteStep};
pub use backend::{open_backend, Backend, Capabilities, FileBackend, IndexedBackend};
pub use keys::{KeyAllocator, KeyGenerator, RandomKeyGenerator};
pub use store::{ListStore, MemoryStore, RemoteStore};
pub use service::DocumentService;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of docstash
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
