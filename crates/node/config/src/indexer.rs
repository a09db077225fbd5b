//! Indexer storage configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default capacity of the indexing queue.
pub const DEFAULT_QUEUE_SIZE: usize = 256;

/// Where indexed transactions are stored.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexerBackend {
    /// Process memory; lost on restart.
    #[default]
    Memory,
    /// SQLite database at `db_path`.
    Sqlite,
}

/// Indexer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexerConfig {
    /// Storage backend.
    #[serde(default)]
    pub backend: IndexerBackend,

    /// Database file for the sqlite backend.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Capacity of the indexing queue.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self { backend: IndexerBackend::default(), db_path: None, queue_size: DEFAULT_QUEUE_SIZE }
    }
}

const fn default_queue_size() -> usize {
    DEFAULT_QUEUE_SIZE
}
