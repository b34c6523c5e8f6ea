//! File backend
//!
//! One file per document, named by the SHA-256 of its key, under a base
//! directory created on demand. No tag index, no catalog, no expiration.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::config::FileConfig;
use crate::error::{Result, StashError};
use super::{Backend, Capabilities};

/// Payload-only backend on the local filesystem
pub struct FileBackend {
    /// Directory holding the document files
    base_path: PathBuf,

    /// Requested TTL; only ever reported as unsupported
    expire: Option<u64>,
}

impl FileBackend {
    pub fn new(config: &FileConfig) -> Self {
        Self {
            base_path: config.path.clone(),
            expire: config.expire,
        }
    }

    /// Open a backend rooted at `path` with no expiration
    pub fn open_path(path: &Path) -> Self {
        Self {
            base_path: path.to_path_buf(),
            expire: None,
        }
    }

    /// File name for `key`: hex SHA-256 of the key, never of the content
    pub fn hash_key(key: &str) -> String {
        hex::encode(Sha256::digest(key.as_bytes()))
    }

    /// Full path of the file that holds `key`
    pub fn document_path(&self, key: &str) -> PathBuf {
        self.base_path.join(Self::hash_key(key))
    }

    /// Get the base directory
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn ensure_base_dir(&self) -> Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(&self.base_path)?;
        Ok(())
    }
}

impl Backend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            tag_index: false,
            expiration: false,
        }
    }

    fn put(&self, key: &str, body: &[u8]) -> Result<()> {
        self.ensure_base_dir()?;
        fs::write(self.document_path(key), body)?;
        tracing::debug!(key, bytes = body.len(), "stored document file");
        Ok(())
    }

    fn get(&self, key: &str, skip_expire: bool) -> Result<Bytes> {
        let data = match fs::read(self.document_path(key)) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StashError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        if self.expire.is_some() && !skip_expire {
            tracing::warn!("file store cannot set expirations on keys");
        }
        Ok(Bytes::from(data))
    }

    fn exists(&self, key: &str) -> Result<bool> {
        match fs::metadata(self.document_path(key)) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
