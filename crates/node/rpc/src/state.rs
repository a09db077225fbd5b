//! Node state management for RPC endpoints.

use std::{
    sync::{
        Arc,
        atomic::{AtomicI64, AtomicU64, Ordering},
    },
    time::Instant,
};

use serde::{Deserialize, Serialize};

/// Shared node state updated by the block producer and the indexer.
#[derive(Debug, Clone)]
pub struct NodeState {
    inner: Arc<NodeStateInner>,
}

#[derive(Debug)]
struct NodeStateInner {
    chain_id: u64,
    started_at: Instant,
    latest_height: AtomicU64,
    last_indexed: AtomicI64,
    indexed_txs: AtomicU64,
    submitted_txs: AtomicU64,
}

impl NodeState {
    /// Create a new node state.
    #[must_use]
    pub fn new(chain_id: u64) -> Self {
        Self {
            inner: Arc::new(NodeStateInner {
                chain_id,
                started_at: Instant::now(),
                latest_height: AtomicU64::new(0),
                last_indexed: AtomicI64::new(-1),
                indexed_txs: AtomicU64::new(0),
                submitted_txs: AtomicU64::new(0),
            }),
        }
    }

    /// Update the latest committed height.
    pub fn set_latest_height(&self, height: u64) {
        self.inner.latest_height.fetch_max(height, Ordering::Relaxed);
    }

    /// Update the indexer progress.
    pub fn set_indexed(&self, last_indexed: i64, indexed_txs: u64) {
        self.inner.last_indexed.fetch_max(last_indexed, Ordering::Relaxed);
        self.inner.indexed_txs.store(indexed_txs, Ordering::Relaxed);
    }

    /// Increment the accepted submission count.
    pub fn inc_submitted(&self) {
        self.inner.submitted_txs.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current node status.
    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            chain_id: self.inner.chain_id,
            uptime_secs: self.inner.started_at.elapsed().as_secs(),
            latest_height: self.inner.latest_height.load(Ordering::Relaxed),
            last_indexed: self.inner.last_indexed.load(Ordering::Relaxed),
            indexed_txs: self.inner.indexed_txs.load(Ordering::Relaxed),
            submitted_txs: self.inner.submitted_txs.load(Ordering::Relaxed),
        }
    }
}

/// Serializable node status for RPC responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    /// Chain ID.
    pub chain_id: u64,
    /// Seconds since node started.
    pub uptime_secs: u64,
    /// Latest committed height.
    pub latest_height: u64,
    /// Last indexed height, `-1` before the first block.
    pub last_indexed: i64,
    /// Number of indexed EVM transactions.
    pub indexed_txs: u64,
    /// Number of transactions accepted for broadcast.
    pub submitted_txs: u64,
}
