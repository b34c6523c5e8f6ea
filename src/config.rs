//! Configuration for docstash
//!
//! Centralized configuration with sensible defaults. Every field can come
//! from a JSON file, the builder, or both (builder calls override the file).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StashError};

/// Default length of generated document keys
pub const DEFAULT_KEY_LENGTH: usize = 10;

/// Default number of candidate keys tried before giving up
pub const DEFAULT_KEY_ATTEMPTS: u32 = 32;

/// Main configuration for a document service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Key Configuration
    // -------------------------------------------------------------------------
    /// Length of generated keys
    pub key_length: usize,

    /// Allocator retry ceiling
    pub key_attempts: u32,

    // -------------------------------------------------------------------------
    // Document Configuration
    // -------------------------------------------------------------------------
    /// Maximum body length in bytes (None = unbounded)
    pub max_length: Option<usize>,

    // -------------------------------------------------------------------------
    // Backend Configuration
    // -------------------------------------------------------------------------
    /// Which storage backend to open, with its settings
    pub backend: BackendConfig,
}

/// Backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Payload-only storage in a directory
    File(FileConfig),

    /// Payload + tag index + catalog in a Redis-protocol store
    Indexed(IndexedConfig),
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::File(FileConfig::default())
    }
}

/// Settings for the file backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Base directory, created on demand
    pub path: PathBuf,

    /// Requested time-to-live in seconds. The file backend cannot honor it.
    pub expire: Option<u64>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data"),
            expire: None,
        }
    }
}

/// Settings for the indexed backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexedConfig {
    // -------------------------------------------------------------------------
    // Connection
    // -------------------------------------------------------------------------
    pub host: String,
    pub port: u16,

    /// Logical database index selected after connecting
    pub db: u32,

    /// Sent with AUTH when set
    pub password: Option<String>,

    /// Read timeout in milliseconds (0 = none)
    pub read_timeout_ms: u64,

    /// Write timeout in milliseconds (0 = none)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Storage Layout
    // -------------------------------------------------------------------------
    /// Time-to-live in seconds, re-armed on every normal read
    pub expire: Option<u64>,

    /// Directory for the plain-key audit copy of each payload (None = off)
    pub mirror_path: Option<PathBuf>,

    /// Tag index key component: forward `tag:<name>`, reverse `<key>:tag`
    pub tag_prefix: String,

    /// List key holding the document catalog
    pub catalog_key: String,
}

impl Default for IndexedConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: 0,
            password: None,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
            expire: None,
            mirror_path: Some(PathBuf::from("./data")),
            tag_prefix: "tag".to_string(),
            catalog_key: "documents".to_string(),
        }
    }
}

impl IndexedConfig {
    /// `host:port` string used to dial the store
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_length: DEFAULT_KEY_LENGTH,
            key_attempts: DEFAULT_KEY_ATTEMPTS,
            max_length: None,
            backend: BackendConfig::default(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a config from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)
            .map_err(|e| StashError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no service could run with
    pub fn validate(&self) -> Result<()> {
        if self.key_length == 0 {
            return Err(StashError::Config("key_length must be at least 1".to_string()));
        }
        if self.key_attempts == 0 {
            return Err(StashError::Config("key_attempts must be at least 1".to_string()));
        }
        if let BackendConfig::Indexed(indexed) = &self.backend {
            if indexed.tag_prefix.is_empty() || indexed.tag_prefix.contains(':') {
                return Err(StashError::Config(format!(
                    "invalid tag_prefix '{}'",
                    indexed.tag_prefix
                )));
            }
            if indexed.catalog_key.is_empty() {
                return Err(StashError::Config("catalog_key must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from an existing config (e.g. one loaded from a file)
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Set the generated key length
    pub fn key_length(mut self, length: usize) -> Self {
        self.config.key_length = length;
        self
    }

    /// Set the allocator retry ceiling
    pub fn key_attempts(mut self, attempts: u32) -> Self {
        self.config.key_attempts = attempts;
        self
    }

    /// Set the maximum body length (in bytes)
    pub fn max_length(mut self, max: usize) -> Self {
        self.config.max_length = Some(max);
        self
    }

    /// Use the file backend
    pub fn file_backend(mut self, file: FileConfig) -> Self {
        self.config.backend = BackendConfig::File(file);
        self
    }

    /// Use the indexed backend
    pub fn indexed_backend(mut self, indexed: IndexedConfig) -> Self {
        self.config.backend = BackendConfig::Indexed(indexed);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
