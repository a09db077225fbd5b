//! JSON-RPC error types following Ethereum error code conventions.

use alloy_primitives::Address;
use ethgate_indexer::IndexerError;
use jsonrpsee::types::ErrorObjectOwned;
use thiserror::Error;

/// JSON-RPC error codes following Ethereum conventions.
pub mod codes {
    /// Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;

    /// Server error (reserved range: -32000 to -32099).
    pub const SERVER_ERROR: i32 = -32000;
    /// Resource not found.
    pub const RESOURCE_NOT_FOUND: i32 = -32001;
    /// Transaction rejected.
    pub const TRANSACTION_REJECTED: i32 = -32003;
}

/// Errors raised while accepting a transaction for broadcast.
///
/// Messages are stable: clients match on them.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Input is empty or only carries a type byte.
    #[error("typed transaction too short")]
    TypedTxTooShort,

    /// An RLP string where a legacy transaction list was expected.
    #[error("rlp: expected input list for legacy transaction")]
    LegacyRlpShape,

    /// The payload is not valid RLP for its type.
    #[error("rlp: {0}")]
    Rlp(String),

    /// The type byte is not a supported EVM transaction type.
    #[error("transaction type not supported")]
    UnsupportedTxType,

    /// Signature values are out of range or do not recover a sender.
    #[error(
        "couldn't retrieve sender address from the ethereum transaction: \
         invalid transaction v, r, s values"
    )]
    InvalidSignature,

    /// Transaction signed for another chain.
    #[error("invalid chain id for signer: have {got} want {expected}")]
    ChainIdMismatch {
        /// Chain id carried by the transaction.
        got: u64,
        /// Chain id of this node.
        expected: u64,
    },

    /// Legacy transaction without EIP-155 replay protection.
    #[error("only replay-protected (EIP-155) transactions allowed over RPC")]
    Unprotected,

    /// No local key for the requested sender.
    #[error("no key for given address or file")]
    KeyNotFound(Address),

    /// Transaction arguments could not be turned into a transaction.
    #[error("invalid transaction arguments: {0}")]
    InvalidArgs(String),

    /// Local signing failed.
    #[error("failed to sign transaction: {0}")]
    Signing(String),

    /// The broadcast collaborator refused the transaction.
    #[error("transaction rejected")]
    Rejected,
}

/// RPC-specific errors that can occur during request handling.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Block not found.
    #[error("header not found")]
    BlockNotFound,

    /// Invalid block number.
    #[error("invalid block number: {0}")]
    InvalidBlockNumber(String),

    /// Index store or block source could not be read.
    #[error("storage unavailable: {0}")]
    Storage(String),

    /// Indexed data disagrees with block data.
    #[error("data integrity violation: {0}")]
    DataIntegrity(String),

    /// Transaction submission failed.
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<IndexerError> for RpcError {
    fn from(err: IndexerError) -> Self {
        match err {
            IndexerError::DataIntegrity { .. } | IndexerError::SourceMismatch { .. } => {
                Self::DataIntegrity(err.to_string())
            }
            IndexerError::StorageUnavailable(_) | IndexerError::ServiceStopped => {
                Self::Storage(err.to_string())
            }
        }
    }
}

impl From<RpcError> for ErrorObjectOwned {
    fn from(err: RpcError) -> Self {
        let code = match &err {
            RpcError::BlockNotFound => codes::RESOURCE_NOT_FOUND,
            RpcError::InvalidBlockNumber(_) => codes::INVALID_PARAMS,
            RpcError::Storage(_) | RpcError::DataIntegrity(_) | RpcError::Internal(_) => {
                codes::INTERNAL_ERROR
            }
            RpcError::Submit(SubmitError::Rejected) => codes::TRANSACTION_REJECTED,
            RpcError::Submit(SubmitError::KeyNotFound(_) | SubmitError::Signing(_)) => {
                codes::SERVER_ERROR
            }
            RpcError::Submit(_) => codes::INVALID_PARAMS,
        };
        ErrorObjectOwned::owned(code, err.to_string(), None::<()>)
    }
}

impl From<SubmitError> for ErrorObjectOwned {
    fn from(err: SubmitError) -> Self {
        RpcError::Submit(err).into()
    }
}
