//! Service Module
//!
//! Compound document operations built from backend primitives.
//!
//! ## Responsibilities
//! - Enforce the body size limit before any write
//! - Issue independent sub-operations concurrently and join them fail-fast
//! - Report partial writes instead of pretending they were atomic
//! - Allocate fresh keys for documents stored without one

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;

use crate::backend::{open_backend, Backend, Capabilities};
use crate::config::Config;
use crate::document::{Document, SearchQuery, SearchResults, TagWeight, WriteStep};
use crate::error::{Result, StashError};
use crate::join::{join_all, try_join2};
use crate::keys::{KeyAllocator, KeyGenerator, RandomKeyGenerator};

type WriteTask<'a> = Box<dyn FnOnce() -> Result<()> + Send + 'a>;
type LookupTask<'a> = Box<dyn FnOnce() -> Result<Vec<String>> + Send + 'a>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchCategory {
    Key,
    Tag,
}

/// The document store as seen by a boundary layer
///
/// ## Put Consistency
/// A put runs its payload, tag and catalog writes concurrently with no
/// rollback. If any of them fails the caller gets an error, but the writes
/// that did complete stay in place. `PartialWriteFailure` names both sets so
/// the caller knows what drifted.
///
/// ## Duplicate Keys
/// Putting to an occupied key is rejected with `DuplicateKey`. The check is
/// a probe, not a lock: two concurrent puts of the same new key can both
/// pass it, after which the payload is last-write-wins and the tag lists
/// hold both sets of entries.
pub struct DocumentService {
    /// Shared backend handle
    backend: Arc<dyn Backend>,

    /// Source of fresh keys for `create`
    allocator: KeyAllocator,

    /// Maximum body length in bytes
    max_length: Option<usize>,
}

impl DocumentService {
    /// Create a service over an already opened backend
    pub fn new(config: &Config, backend: Arc<dyn Backend>) -> Self {
        Self::with_key_generator(config, backend, Arc::new(RandomKeyGenerator::new()))
    }

    /// Create a service with a custom key generator
    pub fn with_key_generator(
        config: &Config,
        backend: Arc<dyn Backend>,
        generator: Arc<dyn KeyGenerator>,
    ) -> Self {
        Self {
            backend,
            allocator: KeyAllocator::new(generator, config.key_length, config.key_attempts),
            max_length: config.max_length,
        }
    }

    /// Validate `config`, open its backend and wrap it in a service
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let backend = open_backend(&config.backend)?;
        Ok(Self::new(config, backend))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Store `body` under `key` with `tags`
    ///
    /// Steps:
    /// 1. Reject oversized bodies (no write happens)
    /// 2. Reject keys reserved by the backend's index (no write happens)
    /// 3. Reject tags the backend cannot index (no write happens)
    /// 4. Reject occupied keys
    /// 5. Run payload, tag and catalog writes concurrently and join them
    pub fn put(&self, key: &str, body: impl Into<Bytes>, tags: &[String]) -> Result<String> {
        let body = body.into();
        self.check_length(body.len())?;
        self.backend.check_key(key).map_err(|e| {
            tracing::warn!(key, "key is reserved by the index");
            e
        })?;

        let capabilities = self.backend.capabilities();
        if !capabilities.tag_index && !tags.is_empty() {
            return Err(self.backend.unsupported("put_tags"));
        }

        if self.backend.exists(key)? {
            tracing::warn!(key, "document already exists");
            return Err(StashError::DuplicateKey(key.to_string()));
        }

        let backend = &self.backend;
        let body_ref = &body;
        let mut steps = vec![WriteStep::Payload];
        let mut tasks: Vec<WriteTask<'_>> = vec![Box::new(move || backend.put(key, body_ref))];
        if capabilities.tag_index {
            steps.push(WriteStep::Tags);
            tasks.push(Box::new(move || backend.put_tags(key, tags)));
            steps.push(WriteStep::Catalog);
            tasks.push(Box::new(move || backend.put_catalog_entry(key)));
        }

        let joined = join_all(tasks);
        if joined.is_ok() {
            tracing::debug!(key, tags = tags.len(), "added document");
            return Ok(key.to_string());
        }

        let (results, failure_order) = joined.into_parts();
        let mut completed = Vec::new();
        let mut failed = Vec::new();
        let mut errors: Vec<Option<StashError>> = Vec::with_capacity(results.len());
        for (step, result) in steps.iter().zip(results) {
            match result {
                Ok(()) => {
                    completed.push(*step);
                    errors.push(None);
                }
                Err(e) => {
                    failed.push(*step);
                    errors.push(Some(e));
                }
            }
        }

        let first = failure_order
            .first()
            .and_then(|&index| errors.get_mut(index).and_then(Option::take))
            .unwrap_or_else(|| StashError::Store("write failed without an error".to_string()));

        tracing::warn!(key, ?completed, ?failed, error = %first, "error adding document");
        if completed.is_empty() {
            return Err(first);
        }
        Err(StashError::PartialWriteFailure {
            key: key.to_string(),
            completed,
            failed,
            source: Box::new(first),
        })
    }

    /// Store `body` under a freshly allocated key and return the key
    pub fn create(&self, body: impl Into<Bytes>, tags: &[String]) -> Result<String> {
        let body = body.into();
        // Size first so an oversized body never costs a key probe
        self.check_length(body.len())?;
        let key = self.allocator.allocate(self.backend.as_ref())?;
        self.put(&key, body, tags)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fetch a document and its tags
    ///
    /// Payload and tags are fetched concurrently. A missing payload is
    /// `NotFound`; any other failure keeps its own error. Backends without a
    /// tag index return an empty tag list.
    pub fn get(&self, key: &str) -> Result<Document> {
        let backend = &self.backend;

        let (body, tags) = if backend.capabilities().tag_index {
            try_join2(|| backend.get(key, false), || backend.get_tags(key))?
        } else {
            (backend.get(key, false)?, Vec::new())
        };

        tracing::debug!(key, "retrieved document");
        Ok(Document {
            key: key.to_string(),
            body,
            tags,
        })
    }

    /// Fetch only the payload of `key`
    pub fn get_raw(&self, key: &str, skip_expire: bool) -> Result<Bytes> {
        self.backend.get(key, skip_expire).map_err(|e| {
            if e.is_not_found() {
                tracing::warn!(key, "raw document not found");
            }
            e
        })
    }

    /// Look up key substrings and tags concurrently
    ///
    /// Empty key terms are ignored. A term without matches contributes
    /// nothing; the first lookup failure fails the whole search. Matches are
    /// de-duplicated per category, keeping first-seen order.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResults> {
        let backend = &self.backend;
        let mut categories = Vec::new();
        let mut tasks: Vec<LookupTask<'_>> = Vec::new();

        for term in query.keys.iter().filter(|term| !term.is_empty()) {
            categories.push(SearchCategory::Key);
            tasks.push(Box::new(move || backend.search_keys(term)));
        }
        for term in &query.tags {
            categories.push(SearchCategory::Tag);
            tasks.push(Box::new(move || backend.search_tag(term)));
        }

        if tasks.is_empty() {
            return Ok(SearchResults::default());
        }

        let lookups = join_all(tasks).into_result().map_err(|e| {
            tracing::warn!(error = %e, "search failed");
            e
        })?;

        let mut results = SearchResults::default();
        let mut seen_keys = HashSet::new();
        let mut seen_tags = HashSet::new();
        for (category, matches) in categories.into_iter().zip(lookups) {
            let (target, seen) = match category {
                SearchCategory::Key => (&mut results.key_matches, &mut seen_keys),
                SearchCategory::Tag => (&mut results.tag_matches, &mut seen_tags),
            };
            for key in matches {
                if seen.insert(key.clone()) {
                    target.push(key);
                }
            }
        }

        tracing::debug!(
            key_matches = results.key_matches.len(),
            tag_matches = results.tag_matches.len(),
            "retrieved search results"
        );
        Ok(results)
    }

    /// Every known tag name
    pub fn get_all_tags(&self) -> Result<Vec<String>> {
        self.backend.get_all_tags()
    }

    /// Every known tag with its document count
    pub fn get_all_cloud_tags(&self) -> Result<Vec<TagWeight>> {
        self.backend.get_all_tag_weights()
    }

    /// The most recently stored document keys (bounded view)
    pub fn recent(&self) -> Result<Vec<String>> {
        self.backend.get_catalog()
    }

    // =========================================================================
    // Lifecycle & Accessors
    // =========================================================================

    /// Close the backend's store connection
    pub fn shutdown(&self) -> Result<()> {
        self.backend.shutdown()
    }

    /// Get the backend handle
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Capability flags of the active backend
    pub fn capabilities(&self) -> Capabilities {
        self.backend.capabilities()
    }

    /// Get the configured maximum body length
    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    fn check_length(&self, size: usize) -> Result<()> {
        match self.max_length {
            Some(max) if size > max => {
                tracing::warn!(size, max_length = max, "document >maxLength");
                Err(StashError::PayloadTooLarge { size, max })
            }
            _ => Ok(()),
        }
    }
}
