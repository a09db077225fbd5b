//! Ledger error types.

use alloy_primitives::{Address, U256};
use ethgate_domain::{CODE_EXECUTION, CODE_TX_DECODE};
use ethgate_rpc::RpcError;
use thiserror::Error;

/// Errors surfaced by ledger queries and setup.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No block has been committed at the height.
    #[error("unknown height {0}")]
    UnknownHeight(u64),

    /// The genesis allocation is malformed.
    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),
}

impl From<LedgerError> for RpcError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UnknownHeight(_) => Self::BlockNotFound,
            LedgerError::InvalidGenesis(_) => Self::Internal(err.to_string()),
        }
    }
}

/// Reasons a transaction fails delivery.
///
/// The display string becomes the delivery outcome log.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Transaction bytes could not be decoded.
    #[error("tx parse error: {0}")]
    TxDecode(String),

    /// Transaction failed validation.
    #[error("invalid transaction: {0}")]
    InvalidTx(String),

    /// Account cannot cover a debit.
    #[error("insufficient funds for {address}: has {has}, needs {needs}")]
    InsufficientFunds {
        /// Debited account.
        address: Address,
        /// Current balance.
        has: U256,
        /// Required balance.
        needs: U256,
    },

    /// Event payload could not be encoded.
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ExecutionError {
    /// Delivery outcome code for this failure.
    pub const fn code(&self) -> u32 {
        match self {
            Self::TxDecode(_) => CODE_TX_DECODE,
            _ => CODE_EXECUTION,
        }
    }
}
