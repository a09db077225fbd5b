//! In-memory transaction index.

use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicI64, Ordering},
};

use alloy_primitives::B256;
use ethgate_domain::{Block, DeliveryOutcome};
use parking_lot::RwLock;

use crate::{EvmTxIndexer, IndexerError, TxResult, extract};

#[derive(Debug, Default)]
struct Tables {
    by_hash: HashMap<B256, TxResult>,
    by_block: BTreeMap<(i64, i32), B256>,
    block_hashes: HashMap<u64, B256>,
}

/// In-memory [`EvmTxIndexer`].
///
/// Both lookup tables live behind one lock so a block's records appear to
/// readers all at once.
#[derive(Debug)]
pub struct MemoryTxIndex {
    tables: RwLock<Tables>,
    last_indexed: AtomicI64,
}

impl MemoryTxIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self { tables: RwLock::new(Tables::default()), last_indexed: AtomicI64::new(-1) }
    }

    /// Number of indexed transactions.
    pub fn len(&self) -> usize {
        self.tables.read().by_hash.len()
    }

    /// Returns true if nothing has been indexed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryTxIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl EvmTxIndexer for MemoryTxIndex {
    fn last_indexed_block(&self) -> Result<i64, IndexerError> {
        Ok(self.last_indexed.load(Ordering::Acquire))
    }

    fn index_block(
        &self,
        block: &Block,
        outcomes: &[DeliveryOutcome],
    ) -> Result<(), IndexerError> {
        let indexed = extract(block, outcomes)?;
        let height = block.height() as i64;

        {
            let mut tables = self.tables.write();
            for tx in &indexed {
                if let Some(existing) = tables.by_hash.get(&tx.hash)
                    && existing.height != height
                {
                    return Err(IndexerError::integrity(
                        block.height(),
                        tx.result.tx_index as usize,
                        format!(
                            "transaction {} already indexed at height {}",
                            tx.hash, existing.height
                        ),
                    ));
                }
            }

            let stale: Vec<(i64, i32)> =
                tables.by_block.range((height, 0)..=(height, i32::MAX)).map(|(k, _)| *k).collect();
            for key in stale {
                if let Some(hash) = tables.by_block.remove(&key) {
                    tables.by_hash.remove(&hash);
                }
            }

            for tx in &indexed {
                tables.by_block.insert((height, tx.result.eth_tx_index), tx.hash);
                tables.by_hash.insert(tx.hash, tx.result);
            }
            tables.block_hashes.insert(block.height(), block.hash());
            self.last_indexed.fetch_max(height, Ordering::AcqRel);
        }

        tracing::debug!(height, txs = indexed.len(), "indexed block in memory");
        Ok(())
    }

    fn get_by_tx_hash(&self, hash: B256) -> Result<Option<TxResult>, IndexerError> {
        Ok(self.tables.read().by_hash.get(&hash).copied())
    }

    fn get_by_block_and_index(
        &self,
        height: i64,
        eth_tx_index: i32,
    ) -> Result<Option<TxResult>, IndexerError> {
        let tables = self.tables.read();
        Ok(tables
            .by_block
            .get(&(height, eth_tx_index))
            .and_then(|hash| tables.by_hash.get(hash))
            .copied())
    }

    fn indexed_count(&self) -> Result<u64, IndexerError> {
        Ok(self.len() as u64)
    }

    fn indexed_block_hash(&self, height: u64) -> Result<Option<B256>, IndexerError> {
        Ok(self.tables.read().block_hashes.get(&height).copied())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alloy_primitives::keccak256;

    use super::*;
    use crate::fixtures::{self, evm_tx, ok_outcome, wrap};

    #[test]
    fn empty_index_reports_minus_one() {
        let index = MemoryTxIndex::new();
        assert_eq!(index.last_indexed_block().unwrap(), -1);
        assert!(index.is_empty());
        assert_eq!(index.get_by_tx_hash(B256::ZERO).unwrap(), None);
        assert_eq!(index.get_by_block_and_index(0, 0).unwrap(), None);
    }

    #[test]
    fn index_and_lookup() {
        let index = MemoryTxIndex::new();
        let (block, outcomes) = fixtures::mixed_block(3);
        index.index_block(&block, &outcomes).unwrap();

        assert_eq!(index.last_indexed_block().unwrap(), 3);
        assert_eq!(index.len(), 2);
        for eth_index in 0..2 {
            let by_index = index.get_by_block_and_index(3, eth_index).unwrap().unwrap();
            assert_eq!(by_index.eth_tx_index, eth_index);
        }
        assert_eq!(index.get_by_block_and_index(3, 2).unwrap(), None);
        assert_eq!(index.get_by_block_and_index(2, 0).unwrap(), None);
    }

    #[test]
    fn reindexing_is_idempotent() {
        let index = MemoryTxIndex::new();
        let (block, outcomes) = fixtures::mixed_block(5);
        index.index_block(&block, &outcomes).unwrap();
        let first = index.get_by_block_and_index(5, 1).unwrap();
        index.index_block(&block, &outcomes).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.get_by_block_and_index(5, 1).unwrap(), first);
        assert_eq!(index.last_indexed_block().unwrap(), 5);
    }

    #[test]
    fn reindexing_replaces_stale_records() {
        let index = MemoryTxIndex::new();
        let (block, outcomes) = fixtures::mixed_block(6);
        index.index_block(&block, &outcomes).unwrap();

        let raw = evm_tx(99, 0);
        let outcome = ok_outcome(&[(&raw, 21_000, false)]);
        let (replacement, outcomes) = fixtures::block_of(6, vec![(wrap(raw.clone()), outcome)]);
        index.index_block(&replacement, &outcomes).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.get_by_block_and_index(6, 1).unwrap(), None);
    }

    #[test]
    fn watermark_never_regresses() {
        let index = MemoryTxIndex::new();
        let (later, outcomes) = fixtures::mixed_block(8);
        index.index_block(&later, &outcomes).unwrap();
        let (earlier, outcomes) = fixtures::mixed_block(4);
        index.index_block(&earlier, &outcomes).unwrap();
        assert_eq!(index.last_indexed_block().unwrap(), 8);
    }

    #[test]
    fn failed_extraction_leaves_index_untouched() {
        let index = MemoryTxIndex::new();
        let (block, mut outcomes) = fixtures::mixed_block(2);
        outcomes.truncate(1);
        assert!(index.index_block(&block, &outcomes).is_err());
        assert_eq!(index.last_indexed_block().unwrap(), -1);
        assert!(index.is_empty());
    }

    #[test]
    fn hash_at_another_height_is_rejected() {
        let index = MemoryTxIndex::new();
        let first = evm_tx(40, 0);
        let gapped = evm_tx(40, 5);
        let (block, outcomes) = fixtures::block_of(
            1,
            vec![
                (wrap(first.clone()), ok_outcome(&[(&first, 21_000, false)])),
                (wrap(gapped.clone()), fixtures::gas_exceeded()),
            ],
        );
        index.index_block(&block, &outcomes).unwrap();

        let outcome = ok_outcome(&[(&gapped, 21_000, false)]);
        let (later, outcomes) = fixtures::block_of(6, vec![(wrap(gapped.clone()), outcome)]);
        let err = index.index_block(&later, &outcomes).unwrap_err();
        assert!(matches!(err, IndexerError::DataIntegrity { height: 6, tx_index: 0, .. }));

        let kept = index.get_by_block_and_index(1, 1).unwrap().unwrap();
        assert_eq!(kept.height, 1);
        assert_eq!(index.get_by_tx_hash(keccak256(&gapped)).unwrap(), Some(kept));
        assert_eq!(index.last_indexed_block().unwrap(), 1);
        assert_eq!(index.indexed_block_hash(6).unwrap(), None);
    }

    #[test]
    fn records_block_hash_per_height() {
        let index = MemoryTxIndex::new();
        let (block, outcomes) = fixtures::mixed_block(3);
        index.index_block(&block, &outcomes).unwrap();
        assert_eq!(index.indexed_block_hash(3).unwrap(), Some(block.hash()));
        assert_eq!(index.indexed_block_hash(4).unwrap(), None);
    }

    #[test]
    fn concurrent_readers_see_whole_blocks() {
        fixtures::assert_whole_block_visibility(Arc::new(MemoryTxIndex::new()));
    }
}
