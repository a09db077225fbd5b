//! Background indexing service.
//!
//! Committed blocks are handed to the service through a bounded queue and
//! indexed strictly in arrival order. After each block the watermark is
//! published on a watch channel, which is the only signal readers should use
//! to decide whether a height is queryable.

use std::sync::Arc;

use ethgate_domain::{Block, DeliveryOutcome};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info};

use crate::{BlockSource, EvmTxIndexer, IndexerError};

/// Default capacity of the indexing queue.
pub const DEFAULT_QUEUE_SIZE: usize = 256;

type Job = (Block, Vec<DeliveryOutcome>);

/// Serial indexing loop over an [`EvmTxIndexer`].
#[derive(Debug)]
pub struct IndexerService<I> {
    indexer: Arc<I>,
    jobs: mpsc::Receiver<Job>,
    watermark: watch::Sender<i64>,
}

/// Cloneable handle used to feed and observe an [`IndexerService`].
#[derive(Clone, Debug)]
pub struct IndexerHandle {
    jobs: mpsc::Sender<Job>,
    watermark: watch::Receiver<i64>,
}

impl<I: EvmTxIndexer + 'static> IndexerService<I> {
    /// Create a service and its handle.
    ///
    /// The published watermark starts at the indexer's persisted value.
    pub fn new(indexer: Arc<I>, queue_size: usize) -> Result<(Self, IndexerHandle), IndexerError> {
        let last = indexer.last_indexed_block()?;
        let (jobs_tx, jobs_rx) = mpsc::channel(queue_size.max(1));
        let (watermark_tx, watermark_rx) = watch::channel(last);
        let service = Self { indexer, jobs: jobs_rx, watermark: watermark_tx };
        Ok((service, IndexerHandle { jobs: jobs_tx, watermark: watermark_rx }))
    }

    /// Index every block the source has committed beyond the watermark.
    ///
    /// Fails with [`IndexerError::SourceMismatch`] when the index was built
    /// from another chain. Returns the number of blocks indexed.
    pub fn catch_up(&self, source: &impl BlockSource) -> Result<u64, IndexerError> {
        verify_source(&*self.indexer, source)?;
        let Some(tip) = source.latest_height() else {
            return Ok(0);
        };
        let start = u64::try_from(self.indexer.last_indexed_block()? + 1).unwrap_or(0);
        if start > tip {
            return Ok(0);
        }

        info!(from = start, to = tip, "catching up indexer");
        let mut indexed = 0;
        for height in start..=tip {
            let Some((block, outcomes)) = source.block_with_outcomes(height) else {
                return Err(IndexerError::StorageUnavailable(format!(
                    "block {height} missing from source"
                )));
            };
            self.indexer.index_block(&block, &outcomes)?;
            indexed += 1;
        }
        self.publish()?;
        Ok(indexed)
    }

    fn publish(&self) -> Result<(), IndexerError> {
        let last = self.indexer.last_indexed_block()?;
        self.watermark.send_replace(last);
        Ok(())
    }

    /// Process queued blocks until every handle is dropped.
    ///
    /// The first indexing failure stops the loop and is returned.
    pub async fn run(mut self) -> Result<(), IndexerError> {
        while let Some((block, outcomes)) = self.jobs.recv().await {
            let height = block.height();
            let indexer = Arc::clone(&self.indexer);
            let result = tokio::task::spawn_blocking(move || indexer.index_block(&block, &outcomes))
                .await
                .map_err(|_| IndexerError::ServiceStopped)
                .and_then(|r| r);

            if let Err(err) = result {
                error!(height, %err, "failed to index block");
                return Err(err);
            }
            self.publish()?;
            debug!(height, "published index watermark");
        }
        info!("indexer queue closed");
        Ok(())
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn spawn(self) -> JoinHandle<Result<(), IndexerError>> {
        tokio::spawn(self.run())
    }
}

/// Check that the block at the watermark is the one the source holds.
///
/// An empty index matches any source.
pub fn verify_source(
    indexer: &impl EvmTxIndexer,
    source: &impl BlockSource,
) -> Result<(), IndexerError> {
    let Ok(height) = u64::try_from(indexer.last_indexed_block()?) else {
        return Ok(());
    };
    let tip = source.latest_height();
    if tip.is_none_or(|tip| tip < height) {
        let tip = tip.map_or_else(|| "empty".to_string(), |tip| tip.to_string());
        return Err(IndexerError::SourceMismatch {
            height,
            reason: format!("indexed past the source tip ({tip})"),
        });
    }

    let Some((block, _)) = source.block_with_outcomes(height) else {
        return Err(IndexerError::SourceMismatch {
            height,
            reason: "block missing from source".to_string(),
        });
    };
    match indexer.indexed_block_hash(height)? {
        Some(indexed) if indexed != block.hash() => Err(IndexerError::SourceMismatch {
            height,
            reason: format!("indexed block {indexed}, source has {}", block.hash()),
        }),
        _ => Ok(()),
    }
}

impl IndexerHandle {
    /// Queue a committed block for indexing.
    pub async fn enqueue(
        &self,
        block: Block,
        outcomes: Vec<DeliveryOutcome>,
    ) -> Result<(), IndexerError> {
        self.jobs.send((block, outcomes)).await.map_err(|_| IndexerError::ServiceStopped)
    }

    /// The last published watermark.
    pub fn last_indexed(&self) -> i64 {
        *self.watermark.borrow()
    }

    /// Wait until `height` has been indexed.
    pub async fn wait_for(&self, height: u64) -> Result<(), IndexerError> {
        let target = height as i64;
        let mut watermark = self.watermark.clone();
        watermark
            .wait_for(|last| *last >= target)
            .await
            .map(|_| ())
            .map_err(|_| IndexerError::ServiceStopped)
    }

    /// Subscribe to watermark updates.
    pub fn subscribe(&self) -> watch::Receiver<i64> {
        self.watermark.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{MemoryTxIndex, fixtures};

    struct VecSource(BTreeMap<u64, Job>);

    impl BlockSource for VecSource {
        fn latest_height(&self) -> Option<u64> {
            self.0.keys().next_back().copied()
        }

        fn block_with_outcomes(&self, height: u64) -> Option<Job> {
            self.0.get(&height).cloned()
        }
    }

    #[tokio::test]
    async fn enqueued_blocks_publish_watermark() {
        let index = Arc::new(MemoryTxIndex::new());
        let (service, handle) = IndexerService::new(Arc::clone(&index), 4).unwrap();
        assert_eq!(handle.last_indexed(), -1);
        let task = service.spawn();

        for height in 0..3 {
            let (block, outcomes) = fixtures::mixed_block(height);
            handle.enqueue(block, outcomes).await.unwrap();
        }
        handle.wait_for(2).await.unwrap();

        assert_eq!(handle.last_indexed(), 2);
        assert_eq!(index.len(), 6);

        drop(handle);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn integrity_error_stops_service() {
        let index = Arc::new(MemoryTxIndex::new());
        let (service, handle) = IndexerService::new(index, 4).unwrap();
        let task = service.spawn();

        let (block, mut outcomes) = fixtures::mixed_block(1);
        outcomes.pop();
        handle.enqueue(block, outcomes).await.unwrap();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, IndexerError::DataIntegrity { height: 1, .. }));
        assert!(matches!(handle.wait_for(1).await, Err(IndexerError::ServiceStopped)));
        let (block, outcomes) = fixtures::mixed_block(2);
        assert!(matches!(handle.enqueue(block, outcomes).await, Err(IndexerError::ServiceStopped)));
    }

    #[tokio::test]
    async fn catch_up_resumes_after_watermark() {
        let index = Arc::new(MemoryTxIndex::new());
        let (block, outcomes) = fixtures::mixed_block(0);
        index.index_block(&block, &outcomes).unwrap();

        let source = VecSource((0..5).map(|h| (h, fixtures::mixed_block(h))).collect());
        let (service, handle) = IndexerService::new(Arc::clone(&index), 4).unwrap();
        assert_eq!(handle.last_indexed(), 0);

        assert_eq!(service.catch_up(&source).unwrap(), 4);
        assert_eq!(handle.last_indexed(), 4);
        assert_eq!(service.catch_up(&source).unwrap(), 0);
        assert_eq!(index.len(), 10);
    }

    #[tokio::test]
    async fn catch_up_rejects_index_ahead_of_source() {
        let index = Arc::new(MemoryTxIndex::new());
        for height in 0..3 {
            let (block, outcomes) = fixtures::mixed_block(height);
            index.index_block(&block, &outcomes).unwrap();
        }

        let source = VecSource(BTreeMap::from([(0, fixtures::mixed_block(0))]));
        let (service, handle) = IndexerService::new(Arc::clone(&index), 4).unwrap();
        let err = service.catch_up(&source).unwrap_err();
        assert!(matches!(err, IndexerError::SourceMismatch { height: 2, .. }));
        assert_eq!(handle.last_indexed(), 2);
        assert!(verify_source(&*index, &VecSource(BTreeMap::new())).is_err());
    }

    #[tokio::test]
    async fn catch_up_rejects_index_of_another_chain() {
        let index = Arc::new(MemoryTxIndex::new());
        let (block, outcomes) = fixtures::mixed_block(1);
        index.index_block(&block, &outcomes).unwrap();

        let (other, other_outcomes) = fixtures::block_of(1, Vec::new());
        let source = VecSource(BTreeMap::from([
            (0, fixtures::block_of(0, Vec::new())),
            (1, (other, other_outcomes)),
            (2, fixtures::mixed_block(2)),
        ]));
        let (service, _handle) = IndexerService::new(Arc::clone(&index), 4).unwrap();
        let err = service.catch_up(&source).unwrap_err();
        assert!(matches!(err, IndexerError::SourceMismatch { height: 1, .. }));
        assert_eq!(index.last_indexed_block().unwrap(), 1);
        assert_eq!(index.indexed_block_hash(2).unwrap(), None);
    }

    #[tokio::test]
    async fn catch_up_with_empty_source_is_noop() {
        let index = Arc::new(MemoryTxIndex::new());
        let (service, handle) = IndexerService::new(index, 1).unwrap();
        assert_eq!(service.catch_up(&VecSource(BTreeMap::new())).unwrap(), 0);
        assert_eq!(handle.last_indexed(), -1);
    }
}
