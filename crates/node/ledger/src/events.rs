//! Ledger events.

use std::sync::Arc;

use alloy_primitives::B256;
use ethgate_domain::TxId;
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use parking_lot::Mutex;

/// Events emitted by the development ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    /// A transaction entered the mempool.
    TransactionSubmitted(TxId),
    /// A block was committed.
    BlockCommitted {
        /// Block height.
        height: u64,
        /// Block hash.
        hash: B256,
    },
}

/// Pub-sub registry for ledger events.
#[derive(Clone, Debug, Default)]
pub struct LedgerEvents {
    listeners: Arc<Mutex<Vec<UnboundedSender<LedgerEvent>>>>,
}

impl LedgerEvents {
    /// Create a new, empty event registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event to all current subscribers, dropping closed channels.
    pub fn publish(&self, event: LedgerEvent) {
        let mut guard = self.listeners.lock();
        guard.retain(|sender| sender.unbounded_send(event.clone()).is_ok());
    }

    /// Subscribe to ledger events.
    pub fn subscribe(&self) -> UnboundedReceiver<LedgerEvent> {
        let (sender, receiver) = unbounded();
        self.listeners.lock().push(sender);
        receiver
    }
}
