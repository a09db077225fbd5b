//! In-memory mempool implementation.

use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};

use ethgate_domain::{Tx, TxId};
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct MempoolInner {
    queue: VecDeque<Tx>,
    ids: HashSet<TxId>,
}

/// Simple in-memory mempool that preserves arrival order.
#[derive(Debug, Clone, Default)]
pub struct Mempool {
    inner: Arc<RwLock<MempoolInner>>,
}

impl Mempool {
    /// Create a new empty mempool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a transaction. Returns false if it is already pending.
    pub fn insert(&self, tx: Tx) -> bool {
        let mut inner = self.inner.write();
        if !inner.ids.insert(tx.id()) {
            return false;
        }
        inner.queue.push_back(tx);
        true
    }

    /// The oldest `max_txs` pending transactions.
    pub fn build(&self, max_txs: usize) -> Vec<Tx> {
        self.inner.read().queue.iter().take(max_txs).cloned().collect()
    }

    /// Remove included transactions.
    pub fn prune(&self, tx_ids: &[TxId]) {
        let mut inner = self.inner.write();
        for id in tx_ids {
            inner.ids.remove(id);
        }
        let MempoolInner { queue, ids } = &mut *inner;
        queue.retain(|tx| ids.contains(&tx.id()));
    }

    /// Number of pending transactions.
    pub fn len(&self) -> usize {
        self.inner.read().queue.len()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
