//! Engine configuration.

use revgraph_common::utils::error::Error;
use revgraph_core::index::IndexDefinition;
use std::path::PathBuf;
use thiserror::Error;

/// When indices catch up with store writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexConsistency {
    /// Re-index each vertex right after it is written.
    #[default]
    Immediate,
    /// Re-index the vertices a transaction touched when it ends.
    ///
    /// Until then index-backed queries may miss the transaction's new
    /// values; they never return values that no longer hold.
    Deferred,
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the snapshot files (None for in-memory only).
    pub path: Option<PathBuf>,

    /// Vertices read per lock acquisition during store scans.
    pub scan_batch_size: usize,

    /// When indices are brought up to date after writes.
    pub index_consistency: IndexConsistency,

    /// Indices created at startup unless they already exist.
    pub indices: Vec<IndexDefinition>,

    /// Whether to log every plan context handed out.
    pub query_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: None,
            scan_batch_size: 256,
            index_consistency: IndexConsistency::default(),
            indices: Vec::new(),
            query_logging: false,
        }
    }
}

impl Config {
    /// Creates a configuration that keeps everything in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Creates a configuration that persists snapshots under `path`.
    #[must_use]
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Sets the scan batch size.
    #[must_use]
    pub fn with_scan_batch_size(mut self, size: usize) -> Self {
        self.scan_batch_size = size;
        self
    }

    /// Sets the index consistency mode.
    #[must_use]
    pub fn with_index_consistency(mut self, consistency: IndexConsistency) -> Self {
        self.index_consistency = consistency;
        self
    }

    /// Declares an index to create at startup.
    #[must_use]
    pub fn with_index(mut self, definition: IndexDefinition) -> Self {
        self.indices.push(definition);
        self
    }

    /// Enables query logging.
    #[must_use]
    pub fn with_query_logging(mut self) -> Self {
        self.query_logging = true;
        self
    }

    /// Checks the configuration for values startup cannot work with.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_batch_size == 0 {
            return Err(ConfigError::ZeroScanBatchSize);
        }
        if let Some(path) = &self.path
            && path.is_file()
        {
            return Err(ConfigError::PathIsFile(path.clone()));
        }
        for (i, definition) in self.indices.iter().enumerate() {
            if self.indices[..i].iter().any(|d| d.name == definition.name) {
                return Err(ConfigError::DuplicateIndex(definition.name.clone()));
            }
        }
        Ok(())
    }
}

/// A configuration value startup cannot work with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Scans need to read at least one vertex per batch.
    #[error("scan batch size must be greater than zero")]
    ZeroScanBatchSize,
    /// The data path exists but is not a directory.
    #[error("data path {} is a file", .0.display())]
    PathIsFile(PathBuf),
    /// Two declared indices share a name.
    #[error("index {0} declared twice")]
    DuplicateIndex(String),
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
