//! Single-node development ledger.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use ethgate_domain::{Block, BlockHeader, ChainConfig, DeliveryOutcome, Tx, TxId};
use ethgate_indexer::BlockSource;
use ethgate_rpc::{ChainReader, RpcError, TxSubmitCallback};
use futures::channel::mpsc::UnboundedReceiver;
use parking_lot::Mutex;
use tracing::info;

use crate::{
    Account, AccountState, BlockExecutor, LedgerError, LedgerEvent, LedgerEvents, Mempool,
};

/// Default per-block gas limit.
pub const DEFAULT_BLOCK_GAS_LIMIT: u64 = 30_000_000;

/// Default cap on transactions per block.
pub const DEFAULT_MAX_BLOCK_TXS: usize = 1024;

/// Settings for a [`Ledger`].
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Chain parameters.
    pub chain: Arc<ChainConfig>,
    /// Per-block gas limit.
    pub block_gas_limit: u64,
    /// Maximum transactions taken from the mempool per block.
    pub max_block_txs: usize,
    /// Address recorded as every block's proposer.
    pub proposer: Address,
    /// Initial balances.
    pub genesis: Vec<(Address, U256)>,
}

impl LedgerConfig {
    /// Create a config for `chain` with default limits and no allocation.
    pub const fn new(chain: Arc<ChainConfig>) -> Self {
        Self {
            chain,
            block_gas_limit: DEFAULT_BLOCK_GAS_LIMIT,
            max_block_txs: DEFAULT_MAX_BLOCK_TXS,
            proposer: Address::ZERO,
            genesis: Vec::new(),
        }
    }

    /// Set the per-block gas limit.
    #[must_use]
    pub const fn with_block_gas_limit(mut self, limit: u64) -> Self {
        self.block_gas_limit = limit;
        self
    }

    /// Set the per-block transaction cap.
    #[must_use]
    pub const fn with_max_block_txs(mut self, max: usize) -> Self {
        self.max_block_txs = max;
        self
    }

    /// Set the proposer address.
    #[must_use]
    pub const fn with_proposer(mut self, proposer: Address) -> Self {
        self.proposer = proposer;
        self
    }

    /// Set the genesis allocation.
    #[must_use]
    pub fn with_genesis(mut self, genesis: Vec<(Address, U256)>) -> Self {
        self.genesis = genesis;
        self
    }
}

struct LedgerState {
    blocks: Vec<(Block, Vec<DeliveryOutcome>)>,
    snapshots: Vec<AccountState>,
    by_hash: HashMap<B256, u64>,
}

impl LedgerState {
    fn tip(&self) -> &(Block, Vec<DeliveryOutcome>) {
        // Genesis is pushed on construction and blocks are never removed.
        &self.blocks[self.blocks.len() - 1]
    }
}

/// Committed blocks, their outcomes and per-height account state.
///
/// Blocks are produced locally from the mempool, so every committed block is
/// final as soon as [`Ledger::produce_block`] returns.
#[derive(Clone)]
pub struct Ledger {
    inner: Arc<Mutex<LedgerState>>,
    config: LedgerConfig,
    executor: BlockExecutor,
    mempool: Mempool,
    events: LedgerEvents,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("chain_id", &self.config.chain.chain_id)
            .field("latest_height", &self.latest_height())
            .field("pending", &self.mempool.len())
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Initialize a ledger with its genesis block at height 0.
    pub fn new(config: LedgerConfig) -> Result<Self, LedgerError> {
        let mut seen = HashSet::with_capacity(config.genesis.len());
        for (address, _) in &config.genesis {
            if !seen.insert(*address) {
                return Err(LedgerError::InvalidGenesis(format!(
                    "duplicate allocation for {address}"
                )));
            }
        }

        let genesis_state = AccountState::from_alloc(config.genesis.iter().copied());
        let genesis = Block::new(
            BlockHeader {
                gas_limit: config.block_gas_limit,
                base_fee: config.chain.base_fee,
                proposer: config.proposer,
                ..Default::default()
            },
            Vec::new(),
        );
        let by_hash = HashMap::from([(genesis.hash(), 0)]);
        info!(hash = %genesis.hash(), accounts = genesis_state.len(), "initialized ledger");

        Ok(Self {
            inner: Arc::new(Mutex::new(LedgerState {
                blocks: vec![(genesis, Vec::new())],
                snapshots: vec![genesis_state],
                by_hash,
            })),
            executor: BlockExecutor::new(config.chain.clone(), config.block_gas_limit),
            config,
            mempool: Mempool::new(),
            events: LedgerEvents::new(),
        })
    }

    /// Chain parameters.
    pub fn chain(&self) -> &Arc<ChainConfig> {
        &self.config.chain
    }

    /// Submit a transaction into the mempool.
    pub fn submit_tx(&self, tx: Tx) -> bool {
        let tx_id = tx.id();
        let inserted = self.mempool.insert(tx);
        if inserted {
            self.events.publish(LedgerEvent::TransactionSubmitted(tx_id));
        }
        inserted
    }

    /// Broadcast callback feeding this ledger's mempool.
    pub fn broadcast(&self) -> TxSubmitCallback {
        let ledger = self.clone();
        Arc::new(move |bytes| ledger.submit_tx(Tx::new(bytes)))
    }

    /// Number of pending transactions.
    pub fn pending(&self) -> usize {
        self.mempool.len()
    }

    /// Subscribe to ledger events.
    pub fn subscribe(&self) -> UnboundedReceiver<LedgerEvent> {
        self.events.subscribe()
    }

    /// Commit a block stamped with the current wall clock.
    pub fn produce_block(&self) -> (Block, Vec<DeliveryOutcome>) {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
        self.produce_block_at(now)
    }

    /// Commit a block of pending transactions with the given timestamp.
    pub fn produce_block_at(&self, timestamp: u64) -> (Block, Vec<DeliveryOutcome>) {
        let committed = {
            let mut inner = self.inner.lock();
            let txs = self.mempool.build(self.config.max_block_txs);
            let mut state = inner.snapshots.last().cloned().unwrap_or_default();
            let outcomes = self.executor.execute(&mut state, &txs);

            let parent = &inner.tip().0.header;
            let header = BlockHeader {
                parent: parent.id(),
                height: parent.height + 1,
                timestamp: timestamp.max(parent.timestamp),
                proposer: self.config.proposer,
                gas_limit: self.config.block_gas_limit,
                base_fee: self.config.chain.base_fee,
                tx_root: B256::ZERO,
            };
            let block = Block::new(header, txs);

            let ids: Vec<TxId> = block.txs.iter().map(Tx::id).collect();
            self.mempool.prune(&ids);

            inner.by_hash.insert(block.hash(), block.height());
            inner.snapshots.push(state);
            inner.blocks.push((block.clone(), outcomes.clone()));
            (block, outcomes)
        };

        let (block, outcomes) = &committed;
        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        info!(
            height = block.height(),
            hash = %block.hash(),
            txs = block.txs.len(),
            failed,
            "committed block"
        );
        self.events
            .publish(LedgerEvent::BlockCommitted { height: block.height(), hash: block.hash() });
        committed
    }

    /// Height of the latest committed block.
    pub fn latest_height(&self) -> u64 {
        self.inner.lock().tip().0.height()
    }

    /// Header of the block at `height`.
    pub fn header(&self, height: u64) -> Option<BlockHeader> {
        let inner = self.inner.lock();
        inner.blocks.get(usize::try_from(height).ok()?).map(|(block, _)| block.header.clone())
    }

    /// Block and delivery outcomes at `height`.
    pub fn block(&self, height: u64) -> Option<(Block, Vec<DeliveryOutcome>)> {
        let inner = self.inner.lock();
        inner.blocks.get(usize::try_from(height).ok()?).cloned()
    }

    /// Account state after the block at `height`.
    pub fn account(&self, address: &Address, height: u64) -> Result<Account, LedgerError> {
        let inner = self.inner.lock();
        usize::try_from(height)
            .ok()
            .and_then(|h| inner.snapshots.get(h))
            .map(|state| state.account(address))
            .ok_or(LedgerError::UnknownHeight(height))
    }
}

#[async_trait]
impl ChainReader for Ledger {
    async fn latest_height(&self) -> Result<u64, RpcError> {
        Ok(Self::latest_height(self))
    }

    async fn header_by_height(&self, height: u64) -> Result<Option<BlockHeader>, RpcError> {
        Ok(self.header(height))
    }

    async fn header_by_hash(&self, hash: B256) -> Result<Option<BlockHeader>, RpcError> {
        let height = self.inner.lock().by_hash.get(&hash).copied();
        Ok(height.and_then(|h| self.header(h)))
    }

    async fn block_txs(&self, height: u64) -> Result<Option<Vec<Tx>>, RpcError> {
        Ok(self.block(height).map(|(block, _)| block.txs))
    }

    async fn block_outcomes(&self, height: u64) -> Result<Option<Vec<DeliveryOutcome>>, RpcError> {
        Ok(self.block(height).map(|(_, outcomes)| outcomes))
    }

    async fn nonce(&self, address: Address, height: u64) -> Result<u64, RpcError> {
        Ok(self.account(&address, height)?.nonce)
    }

    async fn balance(&self, address: Address, height: u64) -> Result<U256, RpcError> {
        Ok(self.account(&address, height)?.balance)
    }
}

impl BlockSource for Ledger {
    fn latest_height(&self) -> Option<u64> {
        Some(Self::latest_height(self))
    }

    fn block_with_outcomes(&self, height: u64) -> Option<(Block, Vec<DeliveryOutcome>)> {
        self.block(height)
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Bytes, keccak256};
    use ethgate_domain::{Fee, NativeTx, evm::Evm};
    use ethgate_indexer::{EvmTxIndexer, IndexerService, MemoryTxIndex};
    use ethgate_rpc::{BlockNumberOrTag, Submitter};
    use futures::StreamExt as _;
    use k256::ecdsa::SigningKey;

    use super::*;

    const FUNDS: u64 = 1_000_000_000_000_000_000;

    fn key(seed: u8) -> SigningKey {
        SigningKey::from_slice(&[seed; 32]).unwrap()
    }

    fn ledger(seeds: &[u8]) -> Ledger {
        let genesis =
            seeds.iter().map(|s| (Evm::address_from_key(&key(*s)), U256::from(FUNDS))).collect();
        Ledger::new(LedgerConfig::new(Arc::new(ChainConfig::default())).with_genesis(genesis))
            .unwrap()
    }

    fn transfer(seed: u8, nonce: u64) -> Bytes {
        let chain = ChainConfig::default();
        Evm::sign_eip1559_transfer(
            &key(seed),
            chain.chain_id,
            Address::repeat_byte(0x42),
            U256::from(1u64),
            nonce,
            21_000,
            u128::from(chain.base_fee),
        )
        .unwrap()
    }

    #[test]
    fn genesis_is_height_zero() {
        let ledger = ledger(&[1]);
        assert_eq!(ledger.latest_height(), 0);
        let (genesis, outcomes) = ledger.block(0).unwrap();
        assert!(genesis.txs.is_empty());
        assert!(outcomes.is_empty());
        let funded = ledger.account(&Evm::address_from_key(&key(1)), 0).unwrap();
        assert_eq!(funded.balance, U256::from(FUNDS));
    }

    #[test]
    fn duplicate_genesis_allocation_is_rejected() {
        let config = LedgerConfig::new(Arc::new(ChainConfig::default()))
            .with_genesis(vec![(Address::ZERO, U256::ONE), (Address::ZERO, U256::ONE)]);
        assert!(matches!(Ledger::new(config), Err(LedgerError::InvalidGenesis(_))));
    }

    #[test]
    fn blocks_chain_to_their_parent() {
        let ledger = ledger(&[]);
        let (first, _) = ledger.produce_block_at(10);
        let (second, _) = ledger.produce_block_at(5);
        assert_eq!(first.header.parent, ledger.header(0).unwrap().id());
        assert_eq!(second.header.parent, first.header.id());
        assert_eq!(second.header.timestamp, 10);
        assert_eq!(ledger.latest_height(), 2);
    }

    #[test]
    fn submitted_transactions_are_included_once() {
        let ledger = ledger(&[1]);
        let tx = NativeTx::ethereum(transfer(1, 0), Fee::default()).to_tx();
        assert!(ledger.submit_tx(tx.clone()));
        assert!(!ledger.submit_tx(tx.clone()));

        let (block, outcomes) = ledger.produce_block_at(1);
        assert_eq!(block.txs, vec![tx]);
        assert!(outcomes[0].is_ok());
        assert_eq!(ledger.pending(), 0);

        let (next, _) = ledger.produce_block_at(2);
        assert!(next.txs.is_empty());
    }

    #[test]
    fn max_block_txs_caps_inclusion() {
        let config = LedgerConfig::new(Arc::new(ChainConfig::default())).with_max_block_txs(1);
        let ledger = Ledger::new(config).unwrap();
        ledger.submit_tx(Tx::new(Bytes::from_static(&[1])));
        ledger.submit_tx(Tx::new(Bytes::from_static(&[2])));
        assert_eq!(ledger.produce_block_at(1).0.txs.len(), 1);
        assert_eq!(ledger.pending(), 1);
    }

    #[tokio::test]
    async fn reader_serves_historical_state() {
        let ledger = ledger(&[1]);
        let sender = Evm::address_from_key(&key(1));
        let submitter = Submitter::new(ledger.chain().clone()).with_broadcast(ledger.broadcast());
        submitter.submit_raw(&transfer(1, 0)).unwrap();
        let (block, _) = ledger.produce_block_at(1);

        assert_eq!(ChainReader::nonce(&ledger, sender, 0).await.unwrap(), 0);
        assert_eq!(ChainReader::nonce(&ledger, sender, 1).await.unwrap(), 1);
        let latest = ledger.resolve_number(BlockNumberOrTag::Latest).await.unwrap();
        assert_eq!(latest, 1);
        let header = ledger.header_by_hash(block.hash()).await.unwrap().unwrap();
        assert_eq!(header.height, 1);
        let missing = ChainReader::balance(&ledger, sender, 9).await;
        assert!(matches!(missing, Err(RpcError::BlockNotFound)));
    }

    #[tokio::test]
    async fn commits_are_published() {
        let ledger = ledger(&[]);
        let mut events = ledger.subscribe();
        ledger.submit_tx(Tx::new(Bytes::from_static(&[7])));
        let (block, _) = ledger.produce_block_at(1);

        assert!(matches!(events.next().await, Some(LedgerEvent::TransactionSubmitted(_))));
        assert_eq!(
            events.next().await,
            Some(LedgerEvent::BlockCommitted { height: 1, hash: block.hash() })
        );
    }

    #[tokio::test]
    async fn committed_blocks_are_indexable() {
        let ledger = Arc::new(ledger(&[1, 2]));
        let first = transfer(1, 0);
        let native = NativeTx::ethereum(first.clone(), Fee::default()).to_tx();
        ledger.submit_tx(native);
        ledger.submit_tx(NativeTx::ethereum(transfer(2, 0), Fee::default()).to_tx());
        ledger.produce_block_at(1);
        let bad = transfer(1, 5);
        ledger.submit_tx(NativeTx::ethereum(bad.clone(), Fee::default()).to_tx());
        ledger.produce_block_at(2);

        let index = Arc::new(MemoryTxIndex::new());
        let (service, handle) = IndexerService::new(index.clone(), 8).unwrap();
        assert_eq!(service.catch_up(&ledger).unwrap(), 3);
        assert_eq!(handle.last_indexed(), 2);

        let result = index.get_by_tx_hash(keccak256(&first)).unwrap().unwrap();
        assert_eq!((result.height, result.eth_tx_index), (1, 0));
        assert!(!result.failed);
        assert_eq!(index.indexed_count().unwrap(), 2);
        assert!(index.get_by_tx_hash(keccak256(&bad)).unwrap().is_none());
    }
}
