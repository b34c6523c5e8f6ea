//! Document Types
//!
//! Values exchanged between the document service and its callers.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A stored document with its attached tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Immutable key the document was stored under
    pub key: String,

    /// Opaque payload
    pub body: Bytes,

    /// Tags in store order (most recently attached first)
    pub tags: Vec<String>,
}

impl Document {
    /// Body as UTF-8 text, replacing invalid sequences
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A tag name with the number of documents carrying it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagWeight {
    pub name: String,
    pub weight: u64,
}

/// Query terms for a combined key/tag search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Substrings looked up in the key space (empty terms are ignored)
    #[serde(default)]
    pub keys: Vec<String>,

    /// Tag names whose document lists are returned
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key substring term
    pub fn key(mut self, term: impl Into<String>) -> Self {
        self.keys.push(term.into());
        self
    }

    /// Add a tag term
    pub fn tag(mut self, term: impl Into<String>) -> Self {
        self.tags.push(term.into());
        self
    }
}

/// Search results grouped by query category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Keys matched by key substring terms
    pub key_matches: Vec<String>,

    /// Keys of documents carrying one of the queried tags
    pub tag_matches: Vec<String>,
}

/// One of the independent writes issued by a document put
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WriteStep {
    /// Primary payload write
    Payload,

    /// Forward and reverse tag index writes
    Tags,

    /// Document catalog append
    Catalog,
}

impl fmt::Display for WriteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteStep::Payload => "payload",
            WriteStep::Tags => "tags",
            WriteStep::Catalog => "catalog",
        };
        f.write_str(name)
    }
}
