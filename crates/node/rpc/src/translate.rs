//! Rebuilds Ethereum transaction and receipt views from indexed results.
//!
//! A [`TxResult`] only records where a transaction sits and how it executed.
//! The payload is recovered by decoding the original bytes out of the block,
//! and logs come from the block's delivery outcomes.

use alloy_consensus::{Transaction as _, TxEnvelope};
use alloy_eips::{Typed2718 as _, eip2718::Decodable2718 as _};
use alloy_primitives::{Bloom, Bytes, U64, U256, keccak256};
use ethgate_domain::{BlockHeader, DeliveryOutcome, EvmLog, NativeTx, Tx, events, evm::Evm};
use ethgate_indexer::TxResult;

use crate::{
    error::RpcError,
    types::{FeeFields, RpcLog, RpcTransaction, RpcTransactionReceipt},
};

/// An EVM message located inside its block.
struct Located {
    raw: Bytes,
    envelope: TxEnvelope,
    /// Position among the EVM messages of the native envelope.
    ordinal: usize,
}

fn integrity(result: &TxResult, reason: impl std::fmt::Display) -> RpcError {
    RpcError::DataIntegrity(format!(
        "height {} tx {} msg {}: {reason}",
        result.height, result.tx_index, result.msg_index
    ))
}

fn locate(result: &TxResult, txs: &[Tx]) -> Result<Located, RpcError> {
    let tx = txs
        .get(result.tx_index as usize)
        .ok_or_else(|| integrity(result, "transaction index out of range"))?;
    let native = NativeTx::decode(tx.as_bytes()).map_err(|e| integrity(result, e))?;
    let msg_index = result.msg_index as usize;
    let raw = native
        .msgs
        .get(msg_index)
        .and_then(|msg| msg.as_ethereum())
        .cloned()
        .ok_or_else(|| integrity(result, "message is not an evm transaction"))?;
    let ordinal = native.ethereum_msgs().take_while(|(i, _)| *i < msg_index).count();
    let envelope = TxEnvelope::decode_2718(&mut raw.as_ref()).map_err(|e| integrity(result, e))?;
    Ok(Located { raw, envelope, ordinal })
}

fn fee_fields(envelope: &TxEnvelope, base_fee: u64) -> FeeFields {
    if envelope.is_dynamic_fee() {
        FeeFields::Dynamic {
            gas_price: U256::from(envelope.effective_gas_price(Some(base_fee))),
            max_fee_per_gas: U256::from(envelope.max_fee_per_gas()),
            max_priority_fee_per_gas: U256::from(
                envelope.max_priority_fee_per_gas().unwrap_or_default(),
            ),
        }
    } else {
        FeeFields::Legacy { gas_price: U256::from(envelope.gas_price().unwrap_or_default()) }
    }
}

fn transaction_view(
    result: &TxResult,
    header: &BlockHeader,
    located: &Located,
    chain_id: u64,
) -> Result<RpcTransaction, RpcError> {
    let envelope = &located.envelope;
    let from = Evm::recover_sender(envelope).map_err(|e| integrity(result, e))?;
    let signature = envelope.signature();
    let parity = u64::from(signature.v());

    let (v, y_parity, tx_chain_id) = if envelope.is_legacy() {
        let v = match envelope.chain_id() {
            Some(id) => 35 + 2 * id + parity,
            None => 27 + parity,
        };
        (v, None, envelope.chain_id())
    } else {
        (parity, Some(U64::from(parity)), Some(envelope.chain_id().unwrap_or(chain_id)))
    };

    Ok(RpcTransaction {
        hash: keccak256(&located.raw),
        nonce: U64::from(envelope.nonce()),
        block_hash: Some(header.hash()),
        block_number: Some(U64::from(header.height)),
        transaction_index: Some(U64::from(result.eth_tx_index as u64)),
        from,
        to: envelope.to(),
        value: envelope.value(),
        gas: U64::from(envelope.gas_limit()),
        fee: fee_fields(envelope, header.base_fee),
        input: envelope.input().clone(),
        tx_type: U64::from(envelope.ty()),
        access_list: envelope.access_list().cloned(),
        chain_id: tx_chain_id.map(U64::from),
        v: U64::from(v),
        r: signature.r(),
        s: signature.s(),
        y_parity,
    })
}

/// Build the Ethereum transaction view of an indexed result.
///
/// `txs` is the full ordered transaction list of the block at
/// `result.height`, whose header is `header`.
pub fn build_transaction(
    result: &TxResult,
    header: &BlockHeader,
    txs: &[Tx],
    chain_id: u64,
) -> Result<RpcTransaction, RpcError> {
    let located = locate(result, txs)?;
    transaction_view(result, header, &located, chain_id)
}

/// Decode the logs carried by a `tx_log` event.
fn decode_logs(
    result: &TxResult,
    outcome: &DeliveryOutcome,
    ordinal: usize,
) -> Result<Vec<EvmLog>, RpcError> {
    let Some(event) = outcome.events_of(events::TX_LOG).nth(ordinal) else {
        return Ok(Vec::new());
    };
    event
        .attributes_of(events::ATTR_TX_LOG)
        .map(|json| serde_json::from_str(json).map_err(|e| integrity(result, e)))
        .collect()
}

/// Number of logs emitted in the block before the located message.
fn logs_before(outcomes: &[DeliveryOutcome], tx_index: usize, ordinal: usize) -> usize {
    let count = |outcome: &DeliveryOutcome, take: usize| {
        outcome
            .events_of(events::TX_LOG)
            .take(take)
            .map(|event| event.attributes_of(events::ATTR_TX_LOG).count())
            .sum::<usize>()
    };
    let earlier: usize = outcomes[..tx_index].iter().map(|o| count(o, usize::MAX)).sum();
    earlier + outcomes.get(tx_index).map_or(0, |o| count(o, ordinal))
}

/// Build the Ethereum receipt view of an indexed result.
///
/// `outcomes` are the delivery outcomes of the block, one per entry of `txs`.
pub fn build_receipt(
    result: &TxResult,
    header: &BlockHeader,
    txs: &[Tx],
    outcomes: &[DeliveryOutcome],
    chain_id: u64,
) -> Result<RpcTransactionReceipt, RpcError> {
    let located = locate(result, txs)?;
    let tx = transaction_view(result, header, &located, chain_id)?;
    let tx_index = result.tx_index as usize;
    let outcome =
        outcomes.get(tx_index).ok_or_else(|| integrity(result, "missing delivery outcome"))?;

    let first_log_index = logs_before(outcomes, tx_index, located.ordinal);
    let mut bloom = Bloom::default();
    let logs = decode_logs(result, outcome, located.ordinal)?
        .into_iter()
        .enumerate()
        .map(|(i, log)| {
            bloom.accrue_raw_log(log.address, &log.topics);
            RpcLog {
                address: log.address,
                topics: log.topics,
                data: log.data,
                block_number: U64::from(header.height),
                transaction_hash: tx.hash,
                transaction_index: U64::from(result.eth_tx_index as u64),
                block_hash: header.hash(),
                log_index: U64::from((first_log_index + i) as u64),
                removed: false,
            }
        })
        .collect();

    let contract_address =
        (tx.to.is_none() && !result.failed).then(|| tx.from.create(tx.nonce.to::<u64>()));

    Ok(RpcTransactionReceipt {
        transaction_hash: tx.hash,
        transaction_index: U64::from(result.eth_tx_index as u64),
        block_hash: header.hash(),
        block_number: U64::from(header.height),
        from: tx.from,
        to: tx.to,
        cumulative_gas_used: U64::from(result.cumulative_gas_used),
        gas_used: U64::from(result.gas_used),
        contract_address,
        logs,
        logs_bloom: bloom,
        tx_type: tx.tx_type,
        status: U64::from(u64::from(!result.failed)),
        effective_gas_price: U256::from(
            located.envelope.effective_gas_price(Some(header.base_fee)),
        ),
    })
}
