//! Types for indexed EVM transactions.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// Execution metadata for one indexed EVM transaction.
///
/// Carries only result data. Payload fields (value, gas price, signature, ...)
/// are recovered by decoding the original transaction bytes from the block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxResult {
    /// Height of the containing block.
    pub height: i64,
    /// Position among all transactions of the block.
    pub tx_index: u32,
    /// Position of the EVM message inside its native envelope.
    pub msg_index: u32,
    /// Position among the EVM transactions of the block only.
    pub eth_tx_index: i32,
    /// Whether the top-level call failed.
    pub failed: bool,
    /// Gas used by this transaction.
    pub gas_used: u64,
    /// Gas used by this and every earlier EVM transaction of the block.
    pub cumulative_gas_used: u64,
}

/// A [`TxResult`] together with the hash it is stored under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexedTx {
    /// Keccak-256 of the EIP-2718 encoded transaction.
    pub hash: B256,
    /// Execution metadata.
    pub result: TxResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_result_json_is_camel_case() {
        let result = TxResult {
            height: 5,
            tx_index: 2,
            msg_index: 0,
            eth_tx_index: 1,
            failed: false,
            gas_used: 21_000,
            cumulative_gas_used: 42_000,
        };
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["ethTxIndex"], 1);
        assert_eq!(json["cumulativeGasUsed"], 42_000);
        assert_eq!(serde_json::from_value::<TxResult>(json).unwrap(), result);
    }
}
