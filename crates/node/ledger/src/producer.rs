//! Timed block production feeding the indexer.

use std::time::Duration;

use ethgate_indexer::{IndexerError, IndexerHandle};
use ethgate_rpc::NodeState;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, error};

use crate::Ledger;

/// Default interval between blocks.
pub const DEFAULT_BLOCK_TIME: Duration = Duration::from_secs(1);

/// Commits a block every tick and hands it to the indexer.
#[derive(Debug)]
pub struct BlockProducer {
    ledger: Ledger,
    indexer: IndexerHandle,
    block_time: Duration,
    skip_empty: bool,
    state: Option<NodeState>,
}

impl BlockProducer {
    /// Create a producer committing to `ledger` and feeding `indexer`.
    pub const fn new(ledger: Ledger, indexer: IndexerHandle) -> Self {
        Self { ledger, indexer, block_time: DEFAULT_BLOCK_TIME, skip_empty: false, state: None }
    }

    /// Set the interval between blocks.
    #[must_use]
    pub const fn with_block_time(mut self, block_time: Duration) -> Self {
        self.block_time = block_time;
        self
    }

    /// Only commit blocks when transactions are pending.
    #[must_use]
    pub const fn with_skip_empty(mut self, skip_empty: bool) -> Self {
        self.skip_empty = skip_empty;
        self
    }

    /// Report committed heights to the node status.
    #[must_use]
    pub fn with_node_state(mut self, state: NodeState) -> Self {
        self.state = Some(state);
        self
    }

    /// Commit one block and enqueue it for indexing.
    ///
    /// Returns the committed height.
    pub async fn step(&self) -> Result<u64, IndexerError> {
        let (block, outcomes) = self.ledger.produce_block();
        let height = block.height();
        if let Some(state) = &self.state {
            state.set_latest_height(height);
        }
        self.indexer.enqueue(block, outcomes).await?;
        Ok(height)
    }

    /// Produce blocks until the indexer stops.
    pub async fn run(self) -> Result<(), IndexerError> {
        let mut ticker = tokio::time::interval(self.block_time);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if self.skip_empty && self.ledger.pending() == 0 {
                continue;
            }
            match self.step().await {
                Ok(height) => debug!(height, "produced block"),
                Err(err) => {
                    error!(error = %err, "block producer stopped");
                    return Err(err);
                }
            }
        }
    }

    /// Spawn the producer on the current runtime.
    pub fn spawn(self) -> JoinHandle<Result<(), IndexerError>> {
        tokio::spawn(self.run())
    }
}
