//! Deterministic delivery of native envelopes against account state.

use std::sync::Arc;

use alloy_consensus::{Transaction as _, TxEnvelope};
use alloy_eips::{eip2718::Decodable2718 as _, eip2930::AccessList};
use alloy_primitives::{Address, B256, Bytes, TxKind, U256, keccak256};
use ethgate_domain::{
    BLOCK_GAS_LIMIT_EXCEEDED_LOG, CODE_EXECUTION, ChainConfig, DeliveryOutcome, Event, EvmLog,
    Msg, NativeTx, Tx, events, evm::Evm,
};
use tracing::{debug, trace};

use crate::{AccountState, ExecutionError};

/// Base gas cost for a transaction.
pub const TX_BASE_GAS: u64 = 21_000;

/// Gas cost for contract creation.
pub const TX_CREATE_GAS: u64 = 32_000;

/// Gas cost per byte of calldata (zero byte).
pub const TX_DATA_ZERO_GAS: u64 = 4;

/// Gas cost per byte of calldata (non-zero byte).
pub const TX_DATA_NON_ZERO_GAS: u64 = 16;

/// Gas cost per access list address.
pub const ACCESS_LIST_ADDRESS_GAS: u64 = 2_400;

/// Gas cost per access list storage key.
pub const ACCESS_LIST_STORAGE_KEY_GAS: u64 = 1_900;

/// Init code starting with this opcode reverts.
pub const INVALID_OPCODE: u8 = 0xfe;

/// Failure reason recorded for reverted EVM transactions.
pub const REVERT_REASON: &str = "invalid opcode: INVALID";

/// Topic of the log emitted by every successful contract creation.
pub fn constructor_topic() -> B256 {
    keccak256("ConstructorCall()")
}

/// Intrinsic gas of a transaction.
pub fn intrinsic_gas(input: &[u8], is_create: bool, access_list: Option<&AccessList>) -> u64 {
    let mut gas = TX_BASE_GAS;
    if is_create {
        gas = gas.saturating_add(TX_CREATE_GAS);
    }
    for byte in input {
        let cost = if *byte == 0 { TX_DATA_ZERO_GAS } else { TX_DATA_NON_ZERO_GAS };
        gas = gas.saturating_add(cost);
    }
    if let Some(access_list) = access_list {
        for item in access_list.iter() {
            gas = gas.saturating_add(ACCESS_LIST_ADDRESS_GAS);
            gas = gas.saturating_add(
                ACCESS_LIST_STORAGE_KEY_GAS.saturating_mul(item.storage_keys.len() as u64),
            );
        }
    }
    gas
}

/// Block-scoped counters.
#[derive(Clone, Copy, Debug, Default)]
struct BlockMeter {
    gas_used: u64,
    eth_tx_index: u64,
}

/// Result of applying one EVM message.
struct Applied {
    gas_used: u64,
    events: Vec<Event>,
}

/// Executes block transactions and produces their delivery outcomes.
#[derive(Clone, Debug)]
pub struct BlockExecutor {
    chain: Arc<ChainConfig>,
    block_gas_limit: u64,
}

impl BlockExecutor {
    /// Create an executor for `chain` enforcing `block_gas_limit`.
    pub const fn new(chain: Arc<ChainConfig>, block_gas_limit: u64) -> Self {
        Self { chain, block_gas_limit }
    }

    /// Block gas limit.
    pub const fn block_gas_limit(&self) -> u64 {
        self.block_gas_limit
    }

    /// Deliver `txs` in order, returning one outcome per transaction.
    ///
    /// Failed transactions leave `state` untouched, except for block gas
    /// overflows of otherwise authorized transactions, which still consume
    /// the sender's nonce and gas.
    pub fn execute(&self, state: &mut AccountState, txs: &[Tx]) -> Vec<DeliveryOutcome> {
        let mut meter = BlockMeter::default();
        txs.iter().map(|tx| self.deliver(state, &mut meter, tx)).collect()
    }

    fn deliver(
        &self,
        state: &mut AccountState,
        meter: &mut BlockMeter,
        tx: &Tx,
    ) -> DeliveryOutcome {
        let native = match NativeTx::decode(tx.as_bytes()) {
            Ok(native) => native,
            Err(e) => {
                trace!(error = %e, "undecodable transaction");
                let err = ExecutionError::TxDecode(e.to_string());
                return DeliveryOutcome {
                    code: err.code(),
                    log: err.to_string(),
                    ..Default::default()
                };
            }
        };

        let envelopes: Vec<Option<TxEnvelope>> = native
            .ethereum_msgs()
            .map(|(_, raw)| TxEnvelope::decode_2718(&mut raw.as_ref()).ok())
            .collect();
        let gas_wanted: u64 = envelopes.iter().flatten().map(|e| e.gas_limit()).sum();

        if meter.gas_used.saturating_add(gas_wanted) > self.block_gas_limit {
            debug!(gas_wanted, block_gas = meter.gas_used, "block gas limit exceeded");
            if let Err(err) = self.consume_slots(state, &envelopes) {
                debug!(error = %err, "overflowing transaction failed validation");
                return DeliveryOutcome {
                    code: err.code(),
                    log: err.to_string(),
                    gas_wanted,
                    ..Default::default()
                };
            }
            meter.gas_used = self.block_gas_limit;
            meter.eth_tx_index += envelopes.len() as u64;
            return DeliveryOutcome {
                code: CODE_EXECUTION,
                log: BLOCK_GAS_LIMIT_EXCEEDED_LOG.to_string(),
                gas_wanted,
                gas_used: gas_wanted,
                events: Vec::new(),
            };
        }

        let mut working = state.clone();
        let mut events = Vec::new();
        let mut gas_used = 0u64;
        let mut eth_tx_index = meter.eth_tx_index;

        for msg in &native.msgs {
            let result = match msg {
                Msg::Transfer { from, to, amount } => {
                    working.transfer(*from, *to, *amount).map(|()| {
                        events.push(transfer_event(*from, *to, *amount));
                    })
                }
                Msg::Ethereum(raw) => {
                    self.apply_evm(&mut working, raw, eth_tx_index).map(|applied| {
                        gas_used = gas_used.saturating_add(applied.gas_used);
                        eth_tx_index += 1;
                        events.extend(applied.events);
                    })
                }
            };
            if let Err(err) = result {
                debug!(error = %err, "transaction failed delivery");
                return DeliveryOutcome {
                    code: err.code(),
                    log: err.to_string(),
                    gas_wanted,
                    gas_used,
                    events: Vec::new(),
                };
            }
        }

        *state = working;
        meter.gas_used = meter.gas_used.saturating_add(gas_used);
        meter.eth_tx_index = eth_tx_index;
        DeliveryOutcome { gas_wanted, gas_used, events, ..Default::default() }
    }

    /// Charge the senders of a transaction that did not fit in the block.
    ///
    /// Every EVM message must decode, recover a sender and carry that
    /// sender's next nonce. Otherwise `state` is left untouched.
    fn consume_slots(
        &self,
        state: &mut AccountState,
        envelopes: &[Option<TxEnvelope>],
    ) -> Result<(), ExecutionError> {
        let mut working = state.clone();
        for envelope in envelopes {
            let envelope = envelope
                .as_ref()
                .ok_or_else(|| ExecutionError::TxDecode("undecodable ethereum message".into()))?;
            let sender = self.authorize(&working, envelope)?;
            let price = envelope.effective_gas_price(Some(self.chain.base_fee));
            let fee = U256::from(envelope.gas_limit()) * U256::from(price);
            let charged = fee.min(working.balance(&sender));
            working.debit(sender, charged)?;
            working.bump_nonce(sender);
        }
        *state = working;
        Ok(())
    }

    /// Recover the sender and check chain id and nonce.
    fn authorize(
        &self,
        state: &AccountState,
        envelope: &TxEnvelope,
    ) -> Result<Address, ExecutionError> {
        let sender = Evm::recover_sender(envelope)
            .map_err(|e| ExecutionError::InvalidTx(format!("failed to recover signer: {e}")))?;

        if let Some(chain_id) = envelope.chain_id()
            && chain_id != self.chain.chain_id
        {
            return Err(ExecutionError::InvalidTx(format!(
                "chain ID mismatch: expected {}, got {chain_id}",
                self.chain.chain_id
            )));
        }

        let expected = state.nonce(&sender);
        if envelope.nonce() != expected {
            return Err(ExecutionError::InvalidTx(format!(
                "nonce mismatch: expected {expected}, got {}",
                envelope.nonce()
            )));
        }
        Ok(sender)
    }

    fn validate(
        &self,
        state: &AccountState,
        envelope: &TxEnvelope,
    ) -> Result<(Address, u64), ExecutionError> {
        let sender = self.authorize(state, envelope)?;

        let intrinsic =
            intrinsic_gas(envelope.input(), envelope.is_create(), envelope.access_list());
        if envelope.gas_limit() < intrinsic {
            return Err(ExecutionError::InvalidTx(format!(
                "gas limit {} below intrinsic gas {intrinsic}",
                envelope.gas_limit()
            )));
        }

        if envelope.max_fee_per_gas() < u128::from(self.chain.base_fee) {
            return Err(ExecutionError::InvalidTx(format!(
                "max fee {} below base fee {}",
                envelope.max_fee_per_gas(),
                self.chain.base_fee
            )));
        }

        let needs = U256::from(envelope.gas_limit()) * U256::from(envelope.max_fee_per_gas())
            + envelope.value();
        let has = state.balance(&sender);
        if has < needs {
            return Err(ExecutionError::InsufficientFunds { address: sender, has, needs });
        }

        Ok((sender, intrinsic))
    }

    fn apply_evm(
        &self,
        state: &mut AccountState,
        raw: &Bytes,
        eth_tx_index: u64,
    ) -> Result<Applied, ExecutionError> {
        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref())
            .map_err(|e| ExecutionError::TxDecode(e.to_string()))?;
        let (sender, intrinsic) = self.validate(state, &envelope)?;
        let hash = keccak256(raw);
        let value = envelope.value();

        let mut logs = Vec::new();
        let mut gas_used = intrinsic;
        let mut failure = None;
        match envelope.kind() {
            TxKind::Create if envelope.input().first() == Some(&INVALID_OPCODE) => {
                gas_used = envelope.gas_limit();
                failure = Some(REVERT_REASON);
            }
            TxKind::Create => {
                let created = sender.create(envelope.nonce());
                state.transfer(sender, created, value)?;
                logs.push(EvmLog {
                    address: created,
                    topics: vec![constructor_topic()],
                    data: Bytes::new(),
                });
            }
            TxKind::Call(to) => state.transfer(sender, to, value)?,
        }

        let price = envelope.effective_gas_price(Some(self.chain.base_fee));
        state.debit(sender, U256::from(gas_used) * U256::from(price))?;
        state.bump_nonce(sender);

        let mut summary = Event::new(events::ETHEREUM_TX)
            .with_attribute(events::ATTR_ETH_HASH, hash.to_string())
            .with_attribute(events::ATTR_TX_INDEX, eth_tx_index.to_string())
            .with_attribute(events::ATTR_GAS_USED, gas_used.to_string());
        if let Some(reason) = failure {
            summary = summary.with_attribute(events::ATTR_FAILED, reason);
        }

        let mut tx_log = Event::new(events::TX_LOG);
        for log in &logs {
            tx_log = tx_log.with_attribute(events::ATTR_TX_LOG, serde_json::to_string(log)?);
        }

        let mut emitted = vec![summary, tx_log];
        if failure.is_none() && !value.is_zero() {
            let to = envelope.to().unwrap_or_else(|| sender.create(envelope.nonce()));
            emitted.push(transfer_event(sender, to, value));
        }

        trace!(%hash, %sender, gas_used, failed = failure.is_some(), "applied evm transaction");
        Ok(Applied { gas_used, events: emitted })
    }
}

fn transfer_event(from: Address, to: Address, amount: U256) -> Event {
    Event::new(events::TRANSFER)
        .with_attribute(events::ATTR_SENDER, from.to_string())
        .with_attribute(events::ATTR_RECIPIENT, to.to_string())
        .with_attribute(events::ATTR_AMOUNT, amount.to_string())
}
