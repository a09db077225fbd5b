//! Extraction of EVM transaction results from delivered blocks.

use std::collections::HashSet;

use alloy_consensus::{Transaction as _, TxEnvelope};
use alloy_eips::eip2718::Decodable2718 as _;
use alloy_primitives::{Bytes, keccak256};
use ethgate_domain::{Block, DeliveryOutcome, NativeTx, events, evm::Evm};
use tracing::{debug, trace};

use crate::{IndexedTx, IndexerError, TxResult};

/// Derive the ordered EVM transaction results of a committed block.
///
/// Raw positions that carry no EVM message, fail to decode, or were rejected
/// at delivery consume a `tx_index` but no `eth_tx_index`. Results are
/// returned in raw-position order.
pub fn extract(
    block: &Block,
    outcomes: &[DeliveryOutcome],
) -> Result<Vec<IndexedTx>, IndexerError> {
    let height = block.height();
    if outcomes.len() != block.txs.len() {
        return Err(IndexerError::DataIntegrity {
            height,
            tx_index: 0,
            reason: format!("{} outcomes for {} transactions", outcomes.len(), block.txs.len()),
        });
    }

    let mut indexed = Vec::new();
    let mut seen = HashSet::new();
    let mut eth_tx_index: i32 = 0;
    let mut cumulative_gas_used: u64 = 0;

    for (tx_index, (tx, outcome)) in block.txs.iter().zip(outcomes).enumerate() {
        let Ok(native) = NativeTx::decode(tx.as_bytes()) else {
            trace!(height, tx_index, "skipping undecodable transaction");
            continue;
        };
        if !native.has_ethereum_msg() {
            continue;
        }

        let exceeded = outcome.exceeded_block_gas_limit();
        if !outcome.is_ok() && !exceeded {
            debug!(height, tx_index, code = outcome.code, "skipping rejected delivery");
            continue;
        }

        let gas_limits = if exceeded {
            let Some(limits) = overflow_gas_limits(&native) else {
                debug!(height, tx_index, "skipping unauthorized block gas overflow");
                continue;
            };
            Some(limits)
        } else {
            None
        };

        for (position, (msg_index, raw)) in native.ethereum_msgs().enumerate() {
            let hash = keccak256(raw);
            if !seen.insert(hash) {
                return Err(IndexerError::integrity(
                    height,
                    tx_index,
                    format!("transaction {hash} appears twice in block"),
                ));
            }
            let (failed, gas_used) = match &gas_limits {
                Some(limits) => (true, limits[position]),
                None => {
                    let event = outcome.ethereum_tx_event(&hash).ok_or_else(|| {
                        IndexerError::integrity(
                            height,
                            tx_index,
                            format!("missing {} event for {hash}", events::ETHEREUM_TX),
                        )
                    })?;
                    let gas_used = event
                        .attribute(events::ATTR_GAS_USED)
                        .and_then(|v| v.parse::<u64>().ok())
                        .ok_or_else(|| {
                            IndexerError::integrity(height, tx_index, "invalid gas used attribute")
                        })?;
                    (event.attribute(events::ATTR_FAILED).is_some(), gas_used)
                }
            };

            cumulative_gas_used = cumulative_gas_used.saturating_add(gas_used);
            indexed.push(IndexedTx {
                hash,
                result: TxResult {
                    height: height as i64,
                    tx_index: tx_index as u32,
                    msg_index: msg_index as u32,
                    eth_tx_index,
                    failed,
                    gas_used,
                    cumulative_gas_used,
                },
            });
            eth_tx_index += 1;
        }
    }

    Ok(indexed)
}

/// Gas limits of an envelope that overflowed the block gas meter.
///
/// `None` when any EVM message fails to decode or recover a sender, since
/// such a transaction never claimed a nonce.
fn overflow_gas_limits(native: &NativeTx) -> Option<Vec<u64>> {
    native.ethereum_msgs().map(|(_, raw)| authorized_gas_limit(raw)).collect()
}

fn authorized_gas_limit(raw: &Bytes) -> Option<u64> {
    let envelope = TxEnvelope::decode_2718(&mut raw.as_ref()).ok()?;
    Evm::recover_sender(&envelope).ok()?;
    Some(envelope.gas_limit())
}
