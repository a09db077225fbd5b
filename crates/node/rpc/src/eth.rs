//! Ethereum JSON-RPC API implementation.

use std::sync::Arc;

use alloy_consensus::{TxEip1559, TxEip2930, TxEnvelope, TxLegacy};
use alloy_primitives::{Address, B256, Bytes, TxKind, U64, U256, keccak256};
use ethgate_domain::ChainConfig;
use ethgate_indexer::{EvmTxIndexer, TxResult};
use jsonrpsee::{core::RpcResult, proc_macros::rpc};
use tracing::{debug, warn};

use crate::{
    accessor::ChainReader,
    error::{RpcError, SubmitError},
    keyring::Keyring,
    state::NodeState,
    submit::Submitter,
    translate::{build_receipt, build_transaction},
    types::{
        BlockNumberOrHash, BlockNumberOrTag, RpcTransaction, RpcTransactionReceipt,
        TransactionArgs,
    },
};

/// Gas limit used by `eth_sendTransaction` for calls that give none.
pub const DEFAULT_TX_GAS: u64 = 21_000;

/// Ethereum JSON-RPC API trait.
#[rpc(server, namespace = "eth")]
pub trait EthApi {
    /// Returns the chain ID.
    #[method(name = "chainId")]
    async fn chain_id(&self) -> RpcResult<U64>;

    /// Returns the current block number.
    #[method(name = "blockNumber")]
    async fn block_number(&self) -> RpcResult<U64>;

    /// Returns the balance of an account.
    #[method(name = "getBalance")]
    async fn get_balance(
        &self,
        address: Address,
        block: Option<BlockNumberOrHash>,
    ) -> RpcResult<U256>;

    /// Returns the nonce (transaction count) of an account.
    #[method(name = "getTransactionCount")]
    async fn get_transaction_count(
        &self,
        address: Address,
        block: Option<BlockNumberOrHash>,
    ) -> RpcResult<U64>;

    /// Returns a transaction by hash.
    #[method(name = "getTransactionByHash")]
    async fn get_transaction_by_hash(&self, hash: B256) -> RpcResult<Option<RpcTransaction>>;

    /// Returns the transaction at an EVM-only index of a block given by number.
    #[method(name = "getTransactionByBlockNumberAndIndex")]
    async fn get_transaction_by_block_number_and_index(
        &self,
        block: BlockNumberOrTag,
        index: U64,
    ) -> RpcResult<Option<RpcTransaction>>;

    /// Returns the transaction at an EVM-only index of a block given by hash.
    #[method(name = "getTransactionByBlockHashAndIndex")]
    async fn get_transaction_by_block_hash_and_index(
        &self,
        hash: B256,
        index: U64,
    ) -> RpcResult<Option<RpcTransaction>>;

    /// Returns a transaction receipt by hash.
    #[method(name = "getTransactionReceipt")]
    async fn get_transaction_receipt(&self, hash: B256) -> RpcResult<Option<RpcTransactionReceipt>>;

    /// Submits a raw signed transaction.
    #[method(name = "sendRawTransaction")]
    async fn send_raw_transaction(&self, data: Bytes) -> RpcResult<B256>;

    /// Signs a transaction with a local key and submits it.
    #[method(name = "sendTransaction")]
    async fn send_transaction(&self, args: TransactionArgs) -> RpcResult<B256>;

    /// Returns the addresses of the local keyring.
    #[method(name = "accounts")]
    async fn accounts(&self) -> RpcResult<Vec<Address>>;

    /// Returns the current gas price.
    #[method(name = "gasPrice")]
    async fn gas_price(&self) -> RpcResult<U256>;

    /// Returns syncing status.
    #[method(name = "syncing")]
    async fn syncing(&self) -> RpcResult<bool>;
}

/// Net namespace API.
#[rpc(server, namespace = "net")]
pub trait NetApi {
    /// Returns the network ID.
    #[method(name = "version")]
    fn version(&self) -> RpcResult<String>;

    /// Returns true if the client is listening for connections.
    #[method(name = "listening")]
    fn listening(&self) -> RpcResult<bool>;
}

/// Web3 namespace API.
#[rpc(server, namespace = "web3")]
pub trait Web3Api {
    /// Returns the client version.
    #[method(name = "clientVersion")]
    fn client_version(&self) -> RpcResult<String>;

    /// Returns the Keccak-256 hash of the given data.
    #[method(name = "sha3")]
    fn sha3(&self, data: Bytes) -> RpcResult<B256>;
}

/// Ethereum API implementation over an indexer and a chain reader.
pub struct EthApiImpl<I, C> {
    chain: Arc<ChainConfig>,
    indexer: I,
    reader: C,
    submitter: Submitter,
    keyring: Arc<Keyring>,
    state: Option<NodeState>,
}

impl<I, C> std::fmt::Debug for EthApiImpl<I, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EthApiImpl")
            .field("chain_id", &self.chain.chain_id)
            .field("submitter", &self.submitter)
            .field("keyring", &self.keyring)
            .finish_non_exhaustive()
    }
}

impl<I: EvmTxIndexer, C: ChainReader> EthApiImpl<I, C> {
    /// Create a new Ethereum API implementation.
    ///
    /// Submissions are validated but not broadcast until a submitter with a
    /// broadcast callback is set.
    pub fn new(chain: Arc<ChainConfig>, indexer: I, reader: C) -> Self {
        Self {
            submitter: Submitter::new(Arc::clone(&chain)),
            chain,
            indexer,
            reader,
            keyring: Arc::new(Keyring::new()),
            state: None,
        }
    }

    /// Set the submission path.
    #[must_use]
    pub fn with_submitter(mut self, submitter: Submitter) -> Self {
        self.submitter = submitter;
        self
    }

    /// Set the keyring used by `eth_sendTransaction` and `eth_accounts`.
    #[must_use]
    pub fn with_keyring(mut self, keyring: Arc<Keyring>) -> Self {
        self.keyring = keyring;
        self
    }

    /// Record accepted submissions in `state`.
    #[must_use]
    pub fn with_node_state(mut self, state: NodeState) -> Self {
        self.state = Some(state);
        self
    }

    async fn transaction_view(&self, result: TxResult) -> Result<Option<RpcTransaction>, RpcError> {
        let Ok(height) = u64::try_from(result.height) else { return Ok(None) };
        let Some(header) = self.reader.header_by_height(height).await? else { return Ok(None) };
        let Some(txs) = self.reader.block_txs(height).await? else { return Ok(None) };
        build_transaction(&result, &header, &txs, self.chain.chain_id).map(Some)
    }

    async fn transaction_at(
        &self,
        height: u64,
        index: U64,
    ) -> Result<Option<RpcTransaction>, RpcError> {
        let (Ok(height), Ok(eth_tx_index)) =
            (i64::try_from(height), i32::try_from(index.to::<u64>()))
        else {
            return Ok(None);
        };
        match self.indexer.get_by_block_and_index(height, eth_tx_index)? {
            Some(result) => self.transaction_view(result).await,
            None => Ok(None),
        }
    }

    async fn receipt(&self, hash: B256) -> Result<Option<RpcTransactionReceipt>, RpcError> {
        let Some(result) = self.indexer.get_by_tx_hash(hash)? else { return Ok(None) };
        let Ok(height) = u64::try_from(result.height) else { return Ok(None) };
        let Some(header) = self.reader.header_by_height(height).await? else { return Ok(None) };
        let Some(txs) = self.reader.block_txs(height).await? else { return Ok(None) };
        let Some(outcomes) = self.reader.block_outcomes(height).await? else { return Ok(None) };
        build_receipt(&result, &header, &txs, &outcomes, self.chain.chain_id).map(Some)
    }

    /// Fill in and sign the transaction described by `args`.
    async fn sign_args(&self, args: TransactionArgs) -> Result<TxEnvelope, RpcError> {
        let from = args.from.ok_or_else(|| SubmitError::InvalidArgs("missing from".into()))?;
        if !self.keyring.contains(&from) {
            return Err(SubmitError::KeyNotFound(from).into());
        }

        let chain_id = self.chain.chain_id;
        if let Some(got) = args.chain_id.map(|id| id.to::<u64>())
            && got != chain_id
        {
            return Err(SubmitError::ChainIdMismatch { got, expected: chain_id }.into());
        }

        let nonce = match args.nonce {
            Some(nonce) => nonce.to::<u64>(),
            None => {
                let latest = self.reader.latest_height().await?;
                self.reader.nonce(from, latest).await?
            }
        };
        let to = args.to.map_or(TxKind::Create, TxKind::Call);
        let gas_limit = match (args.gas, to) {
            (Some(gas), _) => gas.to::<u64>(),
            (None, TxKind::Call(_)) => DEFAULT_TX_GAS,
            (None, TxKind::Create) => {
                return Err(
                    SubmitError::InvalidArgs("gas is required for contract creation".into()).into()
                );
            }
        };
        let value = args.value.unwrap_or_default();
        let input = args.input_data();

        let envelope = match (args.max_fee_per_gas, args.gas_price) {
            (Some(max_fee), _) => {
                let max_fee_per_gas = fee_u128(max_fee, "maxFeePerGas")?;
                let priority = args.max_priority_fee_per_gas.unwrap_or_default();
                self.keyring.sign(
                    from,
                    TxEip1559 {
                        chain_id,
                        nonce,
                        gas_limit,
                        max_fee_per_gas,
                        max_priority_fee_per_gas: fee_u128(priority, "maxPriorityFeePerGas")?
                            .min(max_fee_per_gas),
                        to,
                        value,
                        access_list: args.access_list.unwrap_or_default(),
                        input,
                    },
                )?
            }
            (None, Some(gas_price)) => {
                let gas_price = fee_u128(gas_price, "gasPrice")?;
                match args.access_list {
                    Some(access_list) => self.keyring.sign(
                        from,
                        TxEip2930 {
                            chain_id,
                            nonce,
                            gas_price,
                            gas_limit,
                            to,
                            value,
                            access_list,
                            input,
                        },
                    )?,
                    None => self.keyring.sign(
                        from,
                        TxLegacy {
                            chain_id: Some(chain_id),
                            nonce,
                            gas_price,
                            gas_limit,
                            to,
                            value,
                            input,
                        },
                    )?,
                }
            }
            (None, None) => self.keyring.sign(
                from,
                TxEip1559 {
                    chain_id,
                    nonce,
                    gas_limit,
                    max_fee_per_gas: u128::from(self.chain.base_fee),
                    max_priority_fee_per_gas: 0,
                    to,
                    value,
                    access_list: args.access_list.unwrap_or_default(),
                    input,
                },
            )?,
        };
        debug!(%from, nonce, gas_limit, "signed transaction with local key");
        Ok(envelope)
    }

    fn accepted(&self, hash: B256) -> B256 {
        if let Some(state) = &self.state {
            state.inc_submitted();
        }
        hash
    }
}

fn fee_u128(value: U256, field: &str) -> Result<u128, SubmitError> {
    u128::try_from(value).map_err(|_| SubmitError::InvalidArgs(format!("{field} exceeds 128 bits")))
}

#[jsonrpsee::core::async_trait]
impl<I, C> EthApiServer for EthApiImpl<I, C>
where
    I: EvmTxIndexer + 'static,
    C: ChainReader + 'static,
{
    async fn chain_id(&self) -> RpcResult<U64> {
        Ok(U64::from(self.chain.chain_id))
    }

    async fn block_number(&self) -> RpcResult<U64> {
        Ok(U64::from(self.reader.latest_height().await?))
    }

    async fn get_balance(
        &self,
        address: Address,
        block: Option<BlockNumberOrHash>,
    ) -> RpcResult<U256> {
        let height = self.reader.resolve_block(block.unwrap_or_default()).await?;
        Ok(self.reader.balance(address, height).await?)
    }

    async fn get_transaction_count(
        &self,
        address: Address,
        block: Option<BlockNumberOrHash>,
    ) -> RpcResult<U64> {
        let height = self.reader.resolve_block(block.unwrap_or_default()).await?;
        Ok(U64::from(self.reader.nonce(address, height).await?))
    }

    async fn get_transaction_by_hash(&self, hash: B256) -> RpcResult<Option<RpcTransaction>> {
        let Some(result) = self.indexer.get_by_tx_hash(hash).map_err(RpcError::from)? else {
            return Ok(None);
        };
        Ok(self.transaction_view(result).await?)
    }

    async fn get_transaction_by_block_number_and_index(
        &self,
        block: BlockNumberOrTag,
        index: U64,
    ) -> RpcResult<Option<RpcTransaction>> {
        let height = match self.reader.resolve_number(block).await {
            Ok(height) => height,
            Err(RpcError::BlockNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(self.transaction_at(height, index).await?)
    }

    async fn get_transaction_by_block_hash_and_index(
        &self,
        hash: B256,
        index: U64,
    ) -> RpcResult<Option<RpcTransaction>> {
        let Some(header) = self.reader.header_by_hash(hash).await? else { return Ok(None) };
        Ok(self.transaction_at(header.height, index).await?)
    }

    async fn get_transaction_receipt(
        &self,
        hash: B256,
    ) -> RpcResult<Option<RpcTransactionReceipt>> {
        Ok(self.receipt(hash).await?)
    }

    async fn send_raw_transaction(&self, data: Bytes) -> RpcResult<B256> {
        match self.submitter.submit_raw(&data) {
            Ok(hash) => Ok(self.accepted(hash)),
            Err(e) => {
                warn!(error = %e, len = data.len(), "rejected raw transaction");
                Err(e.into())
            }
        }
    }

    async fn send_transaction(&self, args: TransactionArgs) -> RpcResult<B256> {
        let envelope = self.sign_args(args).await?;
        let hash = self.submitter.submit_envelope(&envelope)?;
        Ok(self.accepted(hash))
    }

    async fn accounts(&self) -> RpcResult<Vec<Address>> {
        Ok(self.keyring.accounts())
    }

    async fn gas_price(&self) -> RpcResult<U256> {
        Ok(U256::from(self.chain.base_fee))
    }

    async fn syncing(&self) -> RpcResult<bool> {
        Ok(false)
    }
}

/// Net API implementation.
#[derive(Clone, Debug)]
pub struct NetApiImpl {
    chain_id: u64,
}

impl NetApiImpl {
    /// Create a new Net API implementation.
    pub const fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }
}

impl NetApiServer for NetApiImpl {
    fn version(&self) -> RpcResult<String> {
        Ok(self.chain_id.to_string())
    }

    fn listening(&self) -> RpcResult<bool> {
        Ok(true)
    }
}

/// Web3 API implementation.
#[derive(Clone, Debug, Default)]
pub struct Web3ApiImpl;

impl Web3ApiImpl {
    /// Create a new Web3 API implementation.
    pub const fn new() -> Self {
        Self
    }
}

impl Web3ApiServer for Web3ApiImpl {
    fn client_version(&self) -> RpcResult<String> {
        Ok(format!("ethgate/{}", env!("CARGO_PKG_VERSION")))
    }

    fn sha3(&self, data: Bytes) -> RpcResult<B256> {
        Ok(keccak256(&data))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use alloy_consensus::Transaction as _;
    use alloy_eips::{Typed2718 as _, eip2718::Decodable2718 as _};
    use async_trait::async_trait;
    use ethgate_domain::{
        Block, BlockHeader, DeliveryOutcome, Event, Fee, Msg, NativeTx, Tx, events, evm::Evm,
    };
    use ethgate_indexer::MemoryTxIndex;
    use k256::ecdsa::SigningKey;
    use parking_lot::Mutex;
    use rstest::rstest;

    use super::*;
    use crate::{error::codes, submit::TxSubmitCallback, types::BlockTag};

    const CHAIN_ID: u64 = 1337;

    fn key(seed: u8) -> SigningKey {
        SigningKey::from_slice(&[seed; 32]).unwrap()
    }

    fn number(height: u64) -> BlockNumberOrTag {
        BlockNumberOrTag::Number(U64::from(height))
    }

    fn submitter(callback: TxSubmitCallback) -> Submitter {
        Submitter::new(Arc::new(ChainConfig::new(CHAIN_ID))).with_broadcast(callback)
    }

    fn transfer(seed: u8, nonce: u64) -> Bytes {
        Evm::sign_eip1559_transfer(
            &key(seed),
            CHAIN_ID,
            Address::repeat_byte(0x44),
            U256::from(1u64),
            nonce,
            21_000,
            1_000_000_000,
        )
        .unwrap()
    }

    fn executed(raws: &[&Bytes]) -> DeliveryOutcome {
        let mut events = Vec::new();
        for raw in raws {
            events.push(
                Event::new(events::ETHEREUM_TX)
                    .with_attribute(events::ATTR_ETH_HASH, keccak256(raw).to_string())
                    .with_attribute(events::ATTR_GAS_USED, "21000"),
            );
            events.push(Event::new(events::TX_LOG));
        }
        DeliveryOutcome { events, ..Default::default() }
    }

    #[derive(Default)]
    struct MockChain {
        blocks: Vec<(Block, Vec<DeliveryOutcome>)>,
        nonces: HashMap<Address, u64>,
    }

    impl MockChain {
        fn block(&self, height: u64) -> Option<&(Block, Vec<DeliveryOutcome>)> {
            self.blocks.iter().find(|(block, _)| block.height() == height)
        }
    }

    #[async_trait]
    impl ChainReader for MockChain {
        async fn latest_height(&self) -> Result<u64, RpcError> {
            Ok(self.blocks.last().map_or(0, |(block, _)| block.height()))
        }

        async fn header_by_height(&self, height: u64) -> Result<Option<BlockHeader>, RpcError> {
            Ok(self.block(height).map(|(block, _)| block.header.clone()))
        }

        async fn header_by_hash(&self, hash: B256) -> Result<Option<BlockHeader>, RpcError> {
            Ok(self
                .blocks
                .iter()
                .find(|(block, _)| block.hash() == hash)
                .map(|(block, _)| block.header.clone()))
        }

        async fn block_txs(&self, height: u64) -> Result<Option<Vec<Tx>>, RpcError> {
            Ok(self.block(height).map(|(block, _)| block.txs.clone()))
        }

        async fn block_outcomes(
            &self,
            height: u64,
        ) -> Result<Option<Vec<DeliveryOutcome>>, RpcError> {
            Ok(self.block(height).map(|(_, outcomes)| outcomes.clone()))
        }

        async fn nonce(&self, address: Address, _height: u64) -> Result<u64, RpcError> {
            Ok(self.nonces.get(&address).copied().unwrap_or_default())
        }

        async fn balance(&self, _address: Address, _height: u64) -> Result<U256, RpcError> {
            Ok(U256::ZERO)
        }
    }

    struct Fixture {
        api: EthApiImpl<Arc<MemoryTxIndex>, MockChain>,
        block_hash: B256,
        evm: Vec<Bytes>,
    }

    /// Height 1 holds `[transfer, evm, multi(evm, transfer, evm)]`.
    fn fixture() -> Fixture {
        let first = transfer(1, 0);
        let second = transfer(2, 0);
        let third = transfer(3, 0);
        let native = NativeTx {
            msgs: vec![Msg::Transfer {
                from: Address::repeat_byte(1),
                to: Address::repeat_byte(2),
                amount: U256::from(3u64),
            }],
            fee: Fee::default(),
            memo: String::new(),
        };
        let multi = NativeTx {
            msgs: vec![
                Msg::Ethereum(second.clone()),
                Msg::Transfer { from: Address::ZERO, to: Address::ZERO, amount: U256::ZERO },
                Msg::Ethereum(third.clone()),
            ],
            fee: Fee::default(),
            memo: String::new(),
        };
        let block = Block::new(
            BlockHeader { height: 1, base_fee: 1_000_000_000, ..Default::default() },
            vec![
                native.to_tx(),
                NativeTx::ethereum(first.clone(), Fee::default()).to_tx(),
                multi.to_tx(),
            ],
        );
        let outcomes =
            vec![DeliveryOutcome::default(), executed(&[&first]), executed(&[&second, &third])];

        let index = Arc::new(MemoryTxIndex::new());
        index.index_block(&block, &outcomes).unwrap();
        let block_hash = block.hash();
        let chain = MockChain { blocks: vec![(block, outcomes)], nonces: HashMap::new() };
        let api = EthApiImpl::new(Arc::new(ChainConfig::new(CHAIN_ID)), index, chain);
        Fixture { api, block_hash, evm: vec![first, second, third] }
    }

    fn capture() -> (TxSubmitCallback, Arc<Mutex<Vec<Bytes>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (
            Arc::new(move |bytes| {
                sink.lock().push(bytes);
                true
            }),
            seen,
        )
    }

    #[tokio::test]
    async fn eth_chain_id_and_gas_price() {
        let Fixture { api, .. } = fixture();
        assert_eq!(api.chain_id().await.unwrap(), U64::from(CHAIN_ID));
        assert_eq!(api.gas_price().await.unwrap(), U256::from(1_000_000_000u64));
        assert_eq!(api.block_number().await.unwrap(), U64::from(1));
        assert!(!api.syncing().await.unwrap());
    }

    #[tokio::test]
    async fn lookups_agree_for_every_evm_transaction() {
        let Fixture { api, block_hash, evm } = fixture();
        for (i, raw) in evm.iter().enumerate() {
            let index = U64::from(i);
            let by_hash = api.get_transaction_by_hash(keccak256(raw)).await.unwrap().unwrap();
            let by_number = api
                .get_transaction_by_block_number_and_index(number(1), index)
                .await
                .unwrap()
                .unwrap();
            let by_block_hash = api
                .get_transaction_by_block_hash_and_index(block_hash, index)
                .await
                .unwrap()
                .unwrap();

            assert_eq!(by_hash, by_number);
            assert_eq!(by_hash, by_block_hash);
            assert_eq!(by_hash.transaction_index, Some(index));
            assert_eq!(by_hash.from, Evm::address_from_key(&key(i as u8 + 1)));
        }
    }

    #[rstest]
    #[case::past_end(3)]
    #[case::beyond_i32(u64::from(u32::MAX) + 1)]
    #[tokio::test]
    async fn out_of_range_index_is_null(#[case] index: u64) {
        let Fixture { api, block_hash, .. } = fixture();
        let index = U64::from(index);
        let by_number =
            api.get_transaction_by_block_number_and_index(number(1), index).await.unwrap();
        assert!(by_number.is_none());
        let by_hash = api.get_transaction_by_block_hash_and_index(block_hash, index).await.unwrap();
        assert!(by_hash.is_none());
    }

    #[tokio::test]
    async fn unknown_blocks_and_hashes_are_null() {
        let Fixture { api, .. } = fixture();
        let zero = U64::ZERO;
        assert!(
            api.get_transaction_by_block_number_and_index(number(9), zero)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            api.get_transaction_by_block_hash_and_index(B256::repeat_byte(9), zero)
                .await
                .unwrap()
                .is_none()
        );
        assert!(api.get_transaction_by_hash(B256::repeat_byte(9)).await.unwrap().is_none());
        assert!(api.get_transaction_receipt(B256::repeat_byte(9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn latest_tag_resolves_to_tip() {
        let Fixture { api, evm, .. } = fixture();
        let tx = api
            .get_transaction_by_block_number_and_index(
                BlockNumberOrTag::Tag(BlockTag::Latest),
                U64::ZERO,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.hash, keccak256(&evm[0]));
    }

    #[tokio::test]
    async fn receipts_carry_cumulative_gas() {
        let Fixture { api, evm, .. } = fixture();
        let receipt = api.get_transaction_receipt(keccak256(&evm[2])).await.unwrap().unwrap();
        assert_eq!(receipt.transaction_index, U64::from(2));
        assert_eq!(receipt.gas_used, U64::from(21_000));
        assert_eq!(receipt.cumulative_gas_used, U64::from(63_000));
        assert_eq!(receipt.status, U64::from(1));
        assert!(receipt.logs.is_empty());
        assert_eq!(receipt.logs_bloom.len(), 256);
    }

    #[tokio::test]
    async fn transaction_count_reads_reader_state() {
        let Fixture { mut api, .. } = fixture();
        let sender = Address::repeat_byte(0x10);
        api.reader.nonces.insert(sender, 4);
        assert_eq!(api.get_transaction_count(sender, None).await.unwrap(), U64::from(4));
        let latest = Some(BlockNumberOrHash::default());
        let unknown = api.get_transaction_count(Address::repeat_byte(0x11), latest).await.unwrap();
        assert_eq!(unknown, U64::ZERO);
        let err = api
            .get_transaction_count(sender, Some(BlockNumberOrTag::Number(U64::from(50)).into()))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "header not found");
    }

    #[tokio::test]
    async fn empty_raw_transaction_is_too_short() {
        let state = NodeState::new(CHAIN_ID);
        let (callback, seen) = capture();
        let Fixture { api, .. } = fixture();
        let api = api
            .with_submitter(submitter(callback))
            .with_node_state(state.clone());

        let err = api.send_raw_transaction(Bytes::new()).await.unwrap_err();
        assert!(err.message().contains("too short"));
        assert!(seen.lock().is_empty());
        assert_eq!(state.status().submitted_txs, 0);

        let raw = transfer(7, 0);
        assert_eq!(api.send_raw_transaction(raw.clone()).await.unwrap(), keccak256(&raw));
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(state.status().submitted_txs, 1);
    }

    #[tokio::test]
    async fn send_transaction_requires_local_key() {
        let Fixture { api, .. } = fixture();
        let args = TransactionArgs { from: Some(Address::repeat_byte(1)), ..Default::default() };
        let err = api.send_transaction(args).await.unwrap_err();
        assert_eq!(err.message(), "no key for given address or file");
    }

    #[rstest]
    #[case::default_fee(None, None, false, 2)]
    #[case::dynamic_fee(Some(3_000_000_000u64), None, false, 2)]
    #[case::legacy(None, Some(2_000_000_000u64), false, 0)]
    #[case::access_list(None, Some(2_000_000_000u64), true, 1)]
    #[tokio::test]
    async fn send_transaction_picks_fee_shape(
        #[case] max_fee: Option<u64>,
        #[case] gas_price: Option<u64>,
        #[case] with_access_list: bool,
        #[case] expected_type: u8,
    ) {
        let mut keyring = Keyring::new();
        let from = keyring.insert(key(9));
        let (callback, seen) = capture();
        let Fixture { mut api, .. } = fixture();
        api.reader.nonces.insert(from, 6);
        let api = api
            .with_keyring(Arc::new(keyring))
            .with_submitter(submitter(callback));

        let args = TransactionArgs {
            from: Some(from),
            to: Some(Address::repeat_byte(0x22)),
            value: Some(U256::from(5u64)),
            max_fee_per_gas: max_fee.map(U256::from),
            gas_price: gas_price.map(U256::from),
            access_list: with_access_list.then(Default::default),
            ..Default::default()
        };
        let hash = api.send_transaction(args).await.unwrap();

        let seen = seen.lock();
        let native = NativeTx::decode(&seen[0]).unwrap();
        let raw = native.msgs[0].as_ethereum().unwrap();
        assert_eq!(keccak256(raw), hash);
        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref()).unwrap();
        assert_eq!(envelope.ty(), expected_type);
        assert_eq!(envelope.nonce(), 6);
        assert_eq!(envelope.gas_limit(), DEFAULT_TX_GAS);
        assert_eq!(envelope.chain_id(), Some(CHAIN_ID));
        assert_eq!(Evm::recover_sender(&envelope).unwrap(), from);
    }

    #[tokio::test]
    async fn send_transaction_creation_requires_gas() {
        let mut keyring = Keyring::new();
        let from = keyring.insert(key(10));
        let (callback, seen) = capture();
        let Fixture { api, .. } = fixture();
        let api = api.with_keyring(Arc::new(keyring)).with_submitter(submitter(callback));

        let create = TransactionArgs {
            from: Some(from),
            input: Some(Bytes::from_static(&[0x60, 0x00])),
            ..Default::default()
        };
        let err = api.send_transaction(create.clone()).await.unwrap_err();
        assert_eq!(err.code(), codes::INVALID_PARAMS);
        assert!(err.message().contains("gas is required for contract creation"));
        assert!(seen.lock().is_empty());

        let with_gas = TransactionArgs { gas: Some(U64::from(100_000u64)), ..create };
        api.send_transaction(with_gas).await.unwrap();
        let seen = seen.lock();
        let native = NativeTx::decode(&seen[0]).unwrap();
        let raw = native.msgs[0].as_ethereum().unwrap();
        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref()).unwrap();
        assert!(envelope.is_create());
        assert_eq!(envelope.gas_limit(), 100_000);
    }

    #[tokio::test]
    async fn accounts_lists_keyring() {
        let mut keyring = Keyring::new();
        let address = keyring.insert(key(4));
        let Fixture { api, .. } = fixture();
        let api = api.with_keyring(Arc::new(keyring));
        assert_eq!(api.accounts().await.unwrap(), vec![address]);
    }

    #[test]
    fn web3_client_version() {
        let version = Web3ApiServer::client_version(&Web3ApiImpl::new()).unwrap();
        assert!(version.starts_with("ethgate/"));
    }

    #[test]
    fn web3_sha3() {
        let hash = Web3ApiServer::sha3(&Web3ApiImpl::new(), Bytes::from_static(b"hello")).unwrap();
        assert_eq!(hash, keccak256(b"hello"));
    }

    #[test]
    fn net_version() {
        assert_eq!(NetApiServer::version(&NetApiImpl::new(CHAIN_ID)).unwrap(), "1337");
        assert!(NetApiServer::listening(&NetApiImpl::new(CHAIN_ID)).unwrap());
    }
}
