//! Test harness for driving scenarios through a node.

use alloy_primitives::{Address, B256, U256};
use ethgate_indexer::{IndexerError, MemoryTxIndex};
use ethgate_ledger::LedgerError;
use ethgate_rpc::{EthApiServer as _, RpcTransactionReceipt, ServerError};
use thiserror::Error;
use tracing::{debug, info};

use crate::{TestConfig, TestNode, TestSetup};

/// Errors from test harness execution.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Indexer failure.
    #[error("indexer error: {0}")]
    Indexer(#[from] IndexerError),
    /// Ledger setup failure.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    /// Server failed to start.
    #[error("server error: {0}")]
    Server(#[from] ServerError),
    /// A JSON-RPC call failed.
    #[error("rpc error: {0}")]
    Rpc(String),
    /// Transactions were still pending after the block budget.
    #[error("inclusion timeout: {pending} transactions pending after {blocks} blocks")]
    InclusionTimeout {
        /// Blocks committed.
        blocks: u64,
        /// Transactions without a receipt.
        pending: usize,
    },
    /// The run exceeded its wall-clock budget.
    #[error("test timed out")]
    Timeout,
    /// Balance mismatch.
    #[error("balance mismatch for {address}: expected {expected}, got {actual}")]
    BalanceMismatch {
        /// The address with the mismatch.
        address: Address,
        /// Expected balance.
        expected: U256,
        /// Actual balance.
        actual: U256,
    },
}

/// Outcome of a successful test run.
#[derive(Debug, Clone)]
pub struct TestOutcome {
    /// Number of blocks committed after genesis.
    pub blocks_committed: u64,
    /// Hashes returned by `eth_sendRawTransaction`, in submission order.
    pub tx_hashes: Vec<B256>,
    /// Receipts of the submitted transactions, in submission order.
    pub receipts: Vec<RpcTransactionReceipt>,
    /// Indexer watermark at the end of the run.
    pub last_indexed: i64,
}

/// Test harness for running e2e scenarios.
#[derive(Debug)]
pub struct TestHarness;

impl TestHarness {
    /// Run a scenario against a node backed by an in-memory index.
    pub async fn run(config: TestConfig, setup: TestSetup) -> Result<TestOutcome, HarnessError> {
        let timeout = config.timeout;
        tokio::time::timeout(timeout, Self::run_inner(config, setup))
            .await
            .map_err(|_| HarnessError::Timeout)?
    }

    async fn run_inner(config: TestConfig, setup: TestSetup) -> Result<TestOutcome, HarnessError> {
        info!(
            chain_id = config.chain_id,
            txs = setup.bootstrap_txs.len(),
            max_blocks = config.max_blocks,
            "starting e2e scenario"
        );

        let node = TestNode::start(&config, &setup, MemoryTxIndex::new())?;
        let api = node.api();

        let mut tx_hashes = Vec::with_capacity(setup.bootstrap_txs.len());
        for raw in &setup.bootstrap_txs {
            let hash = api
                .send_raw_transaction(raw.clone())
                .await
                .map_err(|e| HarnessError::Rpc(e.to_string()))?;
            tx_hashes.push(hash);
        }

        let mut blocks_committed = 0;
        let receipts = loop {
            if blocks_committed >= config.max_blocks {
                let pending = node.ledger().pending();
                return Err(HarnessError::InclusionTimeout { blocks: blocks_committed, pending });
            }
            let height = node.commit().await?;
            blocks_committed += 1;

            let mut receipts = Vec::with_capacity(tx_hashes.len());
            for hash in &tx_hashes {
                match api
                    .get_transaction_receipt(*hash)
                    .await
                    .map_err(|e| HarnessError::Rpc(e.to_string()))?
                {
                    Some(receipt) => receipts.push(receipt),
                    None => break,
                }
            }
            debug!(height, found = receipts.len(), "checked receipts");
            if receipts.len() == tx_hashes.len() {
                break receipts;
            }
        };

        let latest = node.ledger().latest_height();
        for (address, expected) in &setup.expected_balances {
            let actual = node.ledger().account(address, latest)?.balance;
            if actual != *expected {
                return Err(HarnessError::BalanceMismatch {
                    address: *address,
                    expected: *expected,
                    actual,
                });
            }
        }

        let last_indexed = node.state().status().last_indexed;
        node.shutdown();
        info!(blocks_committed, last_indexed, "e2e scenario passed");
        Ok(TestOutcome { blocks_committed, tx_hashes, receipts, last_indexed })
    }
}
