//! RPC types for Ethereum JSON-RPC API requests and responses.

use alloy_eips::eip2930::AccessList;
use alloy_primitives::{Address, B256, Bloom, Bytes, U64, U256};
use serde::{Deserialize, Deserializer, Serialize};

/// Block number or tag for RPC queries.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BlockNumberOrTag {
    /// Block number.
    Number(U64),
    /// Block tag.
    Tag(BlockTag),
    /// Default to latest.
    #[default]
    #[serde(skip)]
    Latest,
}

/// Block tags for RPC queries.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockTag {
    /// Earliest block (genesis).
    Earliest,
    /// Finalized block.
    Finalized,
    /// Safe block.
    Safe,
    /// Latest block.
    #[default]
    Latest,
    /// Pending block.
    Pending,
}

impl BlockNumberOrTag {
    /// Returns true if this is a pending block reference.
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Tag(BlockTag::Pending))
    }

    /// Returns true if this is the latest block reference.
    pub const fn is_latest(&self) -> bool {
        matches!(self, Self::Tag(BlockTag::Latest) | Self::Latest)
    }
}

/// Block reference accepted by state queries.
///
/// Deserializes from a block number, a tag, a 32-byte block hash, or an
/// EIP-1898 object (`{"blockHash": .., "requireCanonical": ..}` or
/// `{"blockNumber": ..}`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockNumberOrHash {
    /// Number or tag.
    Number(BlockNumberOrTag),
    /// Block hash.
    Hash {
        /// Block hash.
        hash: B256,
        /// Whether the block must be canonical.
        require_canonical: bool,
    },
}

impl Default for BlockNumberOrHash {
    fn default() -> Self {
        Self::Number(BlockNumberOrTag::Latest)
    }
}

impl From<BlockNumberOrTag> for BlockNumberOrHash {
    fn from(block: BlockNumberOrTag) -> Self {
        Self::Number(block)
    }
}

impl<'de> Deserialize<'de> for BlockNumberOrHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Eip1898 {
            block_hash: Option<B256>,
            block_number: Option<BlockNumberOrTag>,
            #[serde(default)]
            require_canonical: bool,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Hash(B256),
            Number(BlockNumberOrTag),
            Object(Eip1898),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Hash(hash) => Ok(Self::Hash { hash, require_canonical: false }),
            Raw::Number(number) => Ok(Self::Number(number)),
            Raw::Object(Eip1898 {
                block_hash: Some(hash),
                block_number: None,
                require_canonical,
            }) => Ok(Self::Hash { hash, require_canonical }),
            Raw::Object(Eip1898 { block_hash: None, block_number: Some(number), .. }) => {
                Ok(Self::Number(number))
            }
            Raw::Object(_) => Err(serde::de::Error::custom(
                "expected exactly one of blockHash or blockNumber",
            )),
        }
    }
}

/// Fee fields of a transaction, one shape per fee market.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum FeeFields {
    /// EIP-1559 fees plus the effective price paid.
    Dynamic {
        /// Effective gas price.
        gas_price: U256,
        /// Max fee per gas.
        max_fee_per_gas: U256,
        /// Max priority fee per gas.
        max_priority_fee_per_gas: U256,
    },
    /// Single gas price (legacy and access-list transactions).
    Legacy {
        /// Gas price.
        gas_price: U256,
    },
}

impl FeeFields {
    /// The gas price field exposed for every shape.
    pub const fn gas_price(&self) -> U256 {
        match self {
            Self::Dynamic { gas_price, .. } | Self::Legacy { gas_price } => *gas_price,
        }
    }
}

/// Transaction object for JSON-RPC responses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    /// Transaction hash.
    pub hash: B256,
    /// Nonce.
    pub nonce: U64,
    /// Block hash.
    pub block_hash: Option<B256>,
    /// Block number.
    pub block_number: Option<U64>,
    /// Position among the block's EVM transactions.
    pub transaction_index: Option<U64>,
    /// Sender address.
    pub from: Address,
    /// Recipient address (`null` for contract creation).
    pub to: Option<Address>,
    /// Value transferred.
    pub value: U256,
    /// Gas limit.
    pub gas: U64,
    /// Fee fields.
    #[serde(flatten)]
    pub fee: FeeFields,
    /// Input data.
    pub input: Bytes,
    /// Transaction type.
    #[serde(rename = "type")]
    pub tx_type: U64,
    /// Access list (typed transactions only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_list: Option<AccessList>,
    /// Chain ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<U64>,
    /// V component of signature.
    pub v: U64,
    /// R component of signature.
    pub r: U256,
    /// S component of signature.
    pub s: U256,
    /// Signature parity (typed transactions only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_parity: Option<U64>,
}

/// Transaction receipt for JSON-RPC responses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransactionReceipt {
    /// Transaction hash.
    pub transaction_hash: B256,
    /// Position among the block's EVM transactions.
    pub transaction_index: U64,
    /// Block hash.
    pub block_hash: B256,
    /// Block number.
    pub block_number: U64,
    /// Sender address.
    pub from: Address,
    /// Recipient address.
    pub to: Option<Address>,
    /// Cumulative gas used.
    pub cumulative_gas_used: U64,
    /// Gas used by this transaction.
    pub gas_used: U64,
    /// Contract address created (if any).
    pub contract_address: Option<Address>,
    /// Logs generated.
    pub logs: Vec<RpcLog>,
    /// Logs bloom filter.
    pub logs_bloom: Bloom,
    /// Transaction type.
    #[serde(rename = "type")]
    pub tx_type: U64,
    /// Status (1 = success, 0 = failure).
    pub status: U64,
    /// Effective gas price.
    pub effective_gas_price: U256,
}

/// Log entry for JSON-RPC responses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    /// Contract address.
    pub address: Address,
    /// Log topics.
    pub topics: Vec<B256>,
    /// Log data.
    pub data: Bytes,
    /// Block number.
    pub block_number: U64,
    /// Transaction hash.
    pub transaction_hash: B256,
    /// Transaction index.
    pub transaction_index: U64,
    /// Block hash.
    pub block_hash: B256,
    /// Log index in block.
    pub log_index: U64,
    /// Whether this log was removed due to reorg.
    pub removed: bool,
}

/// Transaction arguments for `eth_sendTransaction`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionArgs {
    /// Sender address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// Recipient address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    /// Gas limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<U64>,
    /// Gas price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    /// Max fee per gas (EIP-1559).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    /// Max priority fee per gas (EIP-1559).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    /// Value to transfer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    /// Input data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Bytes>,
    /// Legacy data field (alias for input).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    /// Nonce.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U64>,
    /// Chain ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<U64>,
    /// Access list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_list: Option<AccessList>,
}

impl TransactionArgs {
    /// Get the input data, preferring `input` over `data`.
    pub fn input_data(&self) -> Bytes {
        self.input.clone().or_else(|| self.data.clone()).unwrap_or_default()
    }
}
