//! Indexed backend
//!
//! Payload, tag index and document catalog kept in a [`ListStore`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;

use crate::config::IndexedConfig;
use crate::document::TagWeight;
use crate::error::{Result, StashError};
use crate::store::pattern::{contains_pattern, escape_glob};
use crate::store::ListStore;
use super::{Backend, Capabilities, CATALOG_VIEW_LEN};

/// Full-capability backend over an external key/list store
///
/// ## Consistency
/// Tag writes are two independent list pushes per tag (forward, then
/// reverse). A failure between them leaves the forward index ahead of the
/// reverse one; nothing repairs it.
pub struct IndexedBackend {
    /// Shared store handle
    store: Arc<dyn ListStore>,

    /// Seconds of TTL re-armed on normal reads
    expire: Option<u64>,

    /// Directory for plain-key audit copies of payloads
    mirror_path: Option<PathBuf>,

    /// `tag` in `tag:<name>` and `<key>:tag`
    tag_prefix: String,

    /// List key of the document catalog
    catalog_key: String,
}

impl IndexedBackend {
    pub fn new(store: Arc<dyn ListStore>, config: &IndexedConfig) -> Self {
        Self {
            store,
            expire: config.expire,
            mirror_path: config.mirror_path.clone(),
            tag_prefix: config.tag_prefix.clone(),
            catalog_key: config.catalog_key.clone(),
        }
    }

    /// List key of the documents carrying `tag`
    pub fn forward_key(&self, tag: &str) -> String {
        format!("{}:{}", self.tag_prefix, tag)
    }

    /// List key of the tags attached to `key`
    pub fn reverse_key(&self, key: &str) -> String {
        format!("{}:{}", key, self.tag_prefix)
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn ListStore> {
        &self.store
    }

    /// Mirror file path for `key`, if mirroring is on and the key is a safe file name
    pub fn mirror_file(&self, key: &str) -> Option<PathBuf> {
        let dir = self.mirror_path.as_ref()?;
        let safe = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\', '\0']);
        safe.then(|| dir.join(key))
    }

    /// Best-effort audit copy under the plain key; never fails the caller
    fn mirror(&self, key: &str, body: &[u8]) {
        let Some(path) = self.mirror_file(key) else {
            if self.mirror_path.is_some() {
                tracing::warn!(key, "key is not a valid file name, audit copy skipped");
            }
            return;
        };

        match write_mirror(&path, body) {
            Ok(()) => tracing::debug!(key, "wrote audit copy"),
            Err(e) => tracing::warn!(key, error = %e, "audit copy failed"),
        }
    }

    /// Re-arm the TTL of `key`; failures are logged only
    fn arm_expiration(&self, key: &str) {
        let Some(seconds) = self.expire else {
            return;
        };
        if let Err(e) = self.store.expire(key, seconds) {
            tracing::warn!(key, error = %e, "failed to set expiry on key");
        }
    }

    fn decode_strings(items: Vec<Vec<u8>>) -> Result<Vec<String>> {
        items
            .into_iter()
            .map(|bytes| {
                String::from_utf8(bytes)
                    .map_err(|e| StashError::Protocol(format!("non UTF-8 index entry: {}", e)))
            })
            .collect()
    }

    /// Every tag with its document count, sorted by name
    ///
    /// A `tag:*` key holding something other than a list is not a tag and
    /// is skipped.
    fn tag_entries(&self) -> Result<Vec<TagWeight>> {
        let prefix = format!("{}:", self.tag_prefix);
        let pattern = format!("{}*", escape_glob(&prefix));

        let mut tags = Vec::new();
        for key in self.store.keys(&pattern)? {
            let Some(name) = key.strip_prefix(&prefix) else {
                continue;
            };
            match self.store.llen(&key) {
                Ok(weight) => tags.push(TagWeight {
                    name: name.to_string(),
                    weight,
                }),
                Err(StashError::Store(message)) if message.starts_with("WRONGTYPE") => {
                    tracing::warn!(key = %key, "tag key does not hold a list, skipped");
                }
                Err(e) => return Err(e),
            }
        }
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }
}

fn write_mirror(path: &Path, body: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(dir)?;
    }
    fs::write(path, body)
}

impl Backend for IndexedBackend {
    fn name(&self) -> &'static str {
        "indexed"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            tag_index: true,
            expiration: true,
        }
    }

    /// Colon keys belong to the tag index; the catalog key is a list
    fn check_key(&self, key: &str) -> Result<()> {
        if key.contains(':') || key == self.catalog_key {
            return Err(StashError::InvalidKey(key.to_string()));
        }
        Ok(())
    }

    fn put(&self, key: &str, body: &[u8]) -> Result<()> {
        self.check_key(key)?;
        self.store.set(key, body)?;
        tracing::debug!(key, bytes = body.len(), "stored document");
        self.mirror(key, body);
        Ok(())
    }

    fn get(&self, key: &str, skip_expire: bool) -> Result<Bytes> {
        let body = self
            .store
            .get(key)?
            .ok_or_else(|| StashError::NotFound(key.to_string()))?;

        if !skip_expire {
            self.arm_expiration(key);
        }
        Ok(Bytes::from(body))
    }

    fn put_tags(&self, key: &str, tags: &[String]) -> Result<()> {
        let reverse = self.reverse_key(key);
        for tag in tags {
            self.store.lpush(&self.forward_key(tag), key.as_bytes())?;
            self.store.lpush(&reverse, tag.as_bytes())?;
        }
        tracing::debug!(key, count = tags.len(), "indexed tags");
        Ok(())
    }

    fn get_tags(&self, key: &str) -> Result<Vec<String>> {
        Self::decode_strings(self.store.list_all(&self.reverse_key(key))?)
    }

    fn put_catalog_entry(&self, key: &str) -> Result<()> {
        self.store.lpush(&self.catalog_key, key.as_bytes())?;
        tracing::debug!(key, "added document to catalog");
        Ok(())
    }

    fn get_catalog(&self) -> Result<Vec<String>> {
        let stop = CATALOG_VIEW_LEN as i64 - 1;
        Self::decode_strings(self.store.lrange(&self.catalog_key, 0, stop)?)
    }

    fn search_keys(&self, substring: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .store
            .keys(&contains_pattern(substring))?
            .into_iter()
            // Colon keys are index bookkeeping, the catalog list is too
            .filter(|key| !key.contains(':') && *key != self.catalog_key)
            .filter(|key| key.contains(substring))
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn search_tag(&self, tag: &str) -> Result<Vec<String>> {
        Self::decode_strings(self.store.list_all(&self.forward_key(tag))?)
    }

    fn get_all_tags(&self) -> Result<Vec<String>> {
        Ok(self.tag_entries()?.into_iter().map(|tag| tag.name).collect())
    }

    fn get_all_tag_weights(&self) -> Result<Vec<TagWeight>> {
        self.tag_entries()
    }

    fn shutdown(&self) -> Result<()> {
        self.store.shutdown()
    }
}
