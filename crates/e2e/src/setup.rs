//! Test configuration and setup utilities.

use std::time::Duration;

use alloy_primitives::{Address, Bytes, U256};
use ethgate_domain::{ChainConfig, evm::Evm};
use k256::ecdsa::SigningKey;

/// Gas limit of a plain transfer.
const TRANSFER_GAS: u64 = 21_000;

/// Configuration for an e2e test run.
#[derive(Clone, Debug)]
pub struct TestConfig {
    /// Chain ID for EVM execution.
    pub chain_id: u64,
    /// Base fee per gas.
    pub base_fee: u64,
    /// Block gas limit.
    pub gas_limit: u64,
    /// Maximum blocks to commit while waiting for receipts.
    pub max_blocks: u64,
    /// Capacity of the indexing queue.
    pub queue_size: usize,
    /// Test timeout.
    pub timeout: Duration,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            chain_id: 1337,
            base_fee: 1_000_000_000,
            gas_limit: 30_000_000,
            max_blocks: 5,
            queue_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TestConfig {
    /// Set the chain id.
    #[must_use]
    pub const fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Set the block gas limit.
    #[must_use]
    pub const fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Set maximum blocks to commit before giving up.
    #[must_use]
    pub const fn with_max_blocks(mut self, blocks: u64) -> Self {
        self.max_blocks = blocks;
        self
    }

    /// Set test timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Chain parameters for this run.
    pub fn chain(&self) -> ChainConfig {
        ChainConfig::new(self.chain_id).with_base_fee(self.base_fee)
    }

    /// Fee paid by a plain transfer.
    pub fn transfer_fee(&self) -> U256 {
        U256::from(TRANSFER_GAS) * U256::from(self.base_fee)
    }
}

/// Deterministic test key derived from `seed`.
pub(crate) fn test_key(seed: u8) -> SigningKey {
    SigningKey::from_slice(&[seed; 32]).expect("valid key")
}

/// Test scenario setup with genesis state and transactions.
#[derive(Debug, Clone)]
pub struct TestSetup {
    /// Genesis account allocations.
    pub genesis_alloc: Vec<(Address, U256)>,
    /// Raw signed transactions submitted before the first block.
    pub bootstrap_txs: Vec<Bytes>,
    /// Keys loaded into the node's keyring.
    pub signers: Vec<SigningKey>,
    /// Expected balances after every transaction is included.
    pub expected_balances: Vec<(Address, U256)>,
}

impl TestSetup {
    /// Create an empty test setup.
    pub const fn empty() -> Self {
        Self {
            genesis_alloc: Vec::new(),
            bootstrap_txs: Vec::new(),
            signers: Vec::new(),
            expected_balances: Vec::new(),
        }
    }

    fn transfer(
        config: &TestConfig,
        key: &SigningKey,
        to: Address,
        value: U256,
        nonce: u64,
    ) -> Bytes {
        Evm::sign_eip1559_transfer(
            key,
            config.chain_id,
            to,
            value,
            nonce,
            TRANSFER_GAS,
            u128::from(config.base_fee),
        )
        .expect("sign test transfer")
    }

    fn initial_balance() -> U256 {
        U256::from(10u64).pow(U256::from(18u64))
    }

    /// Create a simple transfer test setup.
    pub fn simple_transfer(config: &TestConfig) -> Self {
        Self::multi_transfer(config, 1)
    }

    /// Create a multi-transfer test setup with multiple senders.
    pub fn multi_transfer(config: &TestConfig, count: usize) -> Self {
        let mut setup = Self::empty();
        let initial_balance = Self::initial_balance();
        let transfer_amount = U256::from(100u64);

        for i in 0..count {
            let sender_key = test_key((i + 1) as u8);
            let receiver = Address::with_last_byte((i + 100) as u8);
            let sender = Evm::address_from_key(&sender_key);

            setup.genesis_alloc.push((sender, initial_balance));
            let tx = Self::transfer(config, &sender_key, receiver, transfer_amount, 0);
            setup.bootstrap_txs.push(tx);
            setup.expected_balances.push((
                sender,
                initial_balance - transfer_amount - config.transfer_fee(),
            ));
            setup.expected_balances.push((receiver, transfer_amount));
            setup.signers.push(sender_key);
        }

        setup
    }

    /// Create a sequential nonce test (multiple txs from same sender).
    pub fn sequential_nonces(config: &TestConfig, tx_count: usize) -> Self {
        let sender_key = test_key(1);
        let sender = Evm::address_from_key(&sender_key);
        let receiver = Address::with_last_byte(0xbb);
        let initial_balance = Self::initial_balance();
        let transfer_amount = U256::from(100u64);

        let bootstrap_txs = (0..tx_count as u64)
            .map(|nonce| Self::transfer(config, &sender_key, receiver, transfer_amount, nonce))
            .collect();

        let count = U256::from(tx_count);
        let total_transferred = transfer_amount * count;

        Self {
            genesis_alloc: vec![(sender, initial_balance)],
            bootstrap_txs,
            signers: vec![sender_key],
            expected_balances: vec![
                (sender, initial_balance - total_transferred - config.transfer_fee() * count),
                (receiver, total_transferred),
            ],
        }
    }
}
