//! Indexer and block source abstractions.

use std::sync::Arc;

use alloy_primitives::B256;
use ethgate_domain::{Block, DeliveryOutcome};

use crate::{IndexerError, TxResult};

/// Durable index of EVM transaction results.
///
/// All methods are synchronous; implementations guard their own state and
/// are shared across the indexing task and RPC handlers.
pub trait EvmTxIndexer: Send + Sync {
    /// Highest indexed height, or `-1` when nothing has been indexed.
    fn last_indexed_block(&self) -> Result<i64, IndexerError>;

    /// Index every EVM transaction of a committed block.
    ///
    /// Re-indexing a height replaces its previous records. A transaction
    /// already indexed at another height is a data integrity error and leaves
    /// the store untouched.
    fn index_block(&self, block: &Block, outcomes: &[DeliveryOutcome])
    -> Result<(), IndexerError>;

    /// Look up a transaction result by EVM hash.
    fn get_by_tx_hash(&self, hash: B256) -> Result<Option<TxResult>, IndexerError>;

    /// Look up a transaction result by height and EVM-only index.
    fn get_by_block_and_index(
        &self,
        height: i64,
        eth_tx_index: i32,
    ) -> Result<Option<TxResult>, IndexerError>;

    /// Total number of indexed transactions.
    fn indexed_count(&self) -> Result<u64, IndexerError>;

    /// Hash of the block indexed at `height`.
    fn indexed_block_hash(&self, height: u64) -> Result<Option<B256>, IndexerError>;
}

impl<T: EvmTxIndexer + ?Sized> EvmTxIndexer for Arc<T> {
    fn last_indexed_block(&self) -> Result<i64, IndexerError> {
        (**self).last_indexed_block()
    }

    fn index_block(
        &self,
        block: &Block,
        outcomes: &[DeliveryOutcome],
    ) -> Result<(), IndexerError> {
        (**self).index_block(block, outcomes)
    }

    fn get_by_tx_hash(&self, hash: B256) -> Result<Option<TxResult>, IndexerError> {
        (**self).get_by_tx_hash(hash)
    }

    fn get_by_block_and_index(
        &self,
        height: i64,
        eth_tx_index: i32,
    ) -> Result<Option<TxResult>, IndexerError> {
        (**self).get_by_block_and_index(height, eth_tx_index)
    }

    fn indexed_count(&self) -> Result<u64, IndexerError> {
        (**self).indexed_count()
    }

    fn indexed_block_hash(&self, height: u64) -> Result<Option<B256>, IndexerError> {
        (**self).indexed_block_hash(height)
    }
}

/// Source of committed blocks used to catch the indexer up on start-up.
pub trait BlockSource: Send + Sync {
    /// Height of the latest committed block, `None` before genesis.
    fn latest_height(&self) -> Option<u64>;

    /// The block at `height` and its delivery outcomes.
    fn block_with_outcomes(&self, height: u64) -> Option<(Block, Vec<DeliveryOutcome>)>;
}

impl<T: BlockSource + ?Sized> BlockSource for Arc<T> {
    fn latest_height(&self) -> Option<u64> {
        (**self).latest_height()
    }

    fn block_with_outcomes(&self, height: u64) -> Option<(Block, Vec<DeliveryOutcome>)> {
        (**self).block_with_outcomes(height)
    }
}
