//! EVM transaction indexer for mixed native/EVM blocks.

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/refcell/ethgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod error;
pub use error::IndexerError;

mod extract;
pub use extract::extract;

mod memory;
pub use memory::MemoryTxIndex;

mod service;
pub use service::{DEFAULT_QUEUE_SIZE, IndexerHandle, IndexerService, verify_source};

mod sqlite;
pub use sqlite::SqliteTxIndex;

mod traits;
pub use traits::{BlockSource, EvmTxIndexer};

mod types;
pub use types::{IndexedTx, TxResult};

#[cfg(test)]
mod fixtures;
