//! Core domain types used across ethgate crates.
#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/refcell/ethgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod block;
pub use block::{Block, BlockCfg, BlockHeader};

mod chain;
pub use chain::{ChainConfig, DEFAULT_BASE_DENOM, DEFAULT_BASE_FEE, DEFAULT_CHAIN_ID};

mod envelope;
pub use envelope::{Fee, Msg, NATIVE_TX_TAG, NativeTx, NativeTxCfg};

mod idents;
pub use idents::{BlockId, Idents, TxId};

mod outcome;
pub use outcome::{
    BLOCK_GAS_LIMIT_EXCEEDED_LOG, CODE_EXECUTION, CODE_OK, CODE_TX_DECODE, DeliveryOutcome,
    Event, EventAttribute, EvmLog, events,
};

mod tx;
pub use tx::{Tx, TxCfg};

#[cfg(feature = "evm")]
pub mod evm;
