//! In-process node used by e2e tests.

use std::sync::Arc;

use ethgate_indexer::{EvmTxIndexer, IndexerHandle, IndexerService};
use ethgate_ledger::{BlockProducer, Ledger, LedgerConfig};
use ethgate_rpc::{
    EthApiImpl, Keyring, NodeState, RpcServer, RpcServerConfig, RpcServerHandle, Submitter,
};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{HarnessError, TestConfig, TestSetup};

/// A single ethgate node: ledger, indexer service and Ethereum API.
pub struct TestNode<I> {
    ledger: Ledger,
    index: Arc<I>,
    indexer: IndexerHandle,
    producer: BlockProducer,
    state: NodeState,
    keyring: Arc<Keyring>,
    service: JoinHandle<Result<(), ethgate_indexer::IndexerError>>,
}

impl<I> std::fmt::Debug for TestNode<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestNode")
            .field("ledger", &self.ledger)
            .field("last_indexed", &self.indexer.last_indexed())
            .finish_non_exhaustive()
    }
}

impl<I: EvmTxIndexer + 'static> TestNode<I> {
    /// Start a node over `index`, catching it up on the genesis block.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &TestConfig, setup: &TestSetup, index: I) -> Result<Self, HarnessError> {
        let chain = Arc::new(config.chain());
        let ledger = Ledger::new(
            LedgerConfig::new(chain)
                .with_block_gas_limit(config.gas_limit)
                .with_genesis(setup.genesis_alloc.clone()),
        )?;

        let index = Arc::new(index);
        let (service, indexer) = IndexerService::new(Arc::clone(&index), config.queue_size)?;
        let caught_up = service.catch_up(&ledger)?;
        debug!(caught_up, "indexer caught up");
        let service = service.spawn();

        let mut keyring = Keyring::new();
        for key in &setup.signers {
            keyring.insert(key.clone());
        }

        let state = NodeState::new(config.chain_id);
        let producer =
            BlockProducer::new(ledger.clone(), indexer.clone()).with_node_state(state.clone());
        info!(chain_id = config.chain_id, accounts = keyring.len(), "started test node");

        Ok(Self { ledger, index, indexer, producer, state, keyring: Arc::new(keyring), service })
    }

    /// The node's ledger.
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The node's transaction index.
    pub const fn index(&self) -> &Arc<I> {
        &self.index
    }

    /// The node's status counters.
    pub const fn state(&self) -> &NodeState {
        &self.state
    }

    /// A fresh Ethereum API bound to this node.
    pub fn api(&self) -> EthApiImpl<Arc<I>, Ledger> {
        let chain = Arc::clone(self.ledger.chain());
        let submitter = Submitter::new(Arc::clone(&chain)).with_broadcast(self.ledger.broadcast());
        EthApiImpl::new(chain, Arc::clone(&self.index), self.ledger.clone())
            .with_submitter(submitter)
            .with_keyring(Arc::clone(&self.keyring))
            .with_node_state(self.state.clone())
    }

    /// Commit one block and wait until it is indexed.
    pub async fn commit(&self) -> Result<u64, HarnessError> {
        let height = self.producer.step().await?;
        self.indexer.wait_for(height).await?;
        self.state.set_indexed(self.indexer.last_indexed(), self.index.indexed_count()?);
        Ok(height)
    }

    /// Serve the node's JSON-RPC and status endpoints on ephemeral ports.
    pub async fn serve(&self) -> Result<RpcServerHandle, HarnessError> {
        let server = RpcServer::new(RpcServerConfig::ephemeral(), self.state.clone(), self.api());
        Ok(server.start().await?)
    }

    /// Stop the indexing service.
    pub fn shutdown(self) {
        self.service.abort();
    }
}
