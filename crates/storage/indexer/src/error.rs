//! Error types for the indexer.

use thiserror::Error;

/// Errors that can occur during indexing operations.
///
/// Absence is never an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// The backing store could not be read or written.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A delivery outcome is inconsistent with the block it belongs to.
    #[error("data integrity violation at height {height}, tx {tx_index}: {reason}")]
    DataIntegrity {
        /// Height of the offending block.
        height: u64,
        /// Raw position of the offending transaction.
        tx_index: u32,
        /// What was wrong.
        reason: String,
    },

    /// The index was built from blocks the source does not have.
    #[error("index does not match block source at height {height}: {reason}")]
    SourceMismatch {
        /// Indexed height that disagrees with the source.
        height: u64,
        /// What was wrong.
        reason: String,
    },

    /// The indexing queue has shut down.
    #[error("indexer service stopped")]
    ServiceStopped,
}

impl IndexerError {
    pub(crate) fn integrity(height: u64, tx_index: usize, reason: impl Into<String>) -> Self {
        Self::DataIntegrity {
            height,
            tx_index: u32::try_from(tx_index).unwrap_or(u32::MAX),
            reason: reason.into(),
        }
    }
}

impl From<rusqlite::Error> for IndexerError {
    fn from(err: rusqlite::Error) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

impl From<r2d2::Error> for IndexerError {
    fn from(err: r2d2::Error) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}
