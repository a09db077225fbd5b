//! In-process development ledger for ethgate nodes.

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/refcell/ethgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod accounts;
pub use accounts::{Account, AccountState};

mod error;
pub use error::{ExecutionError, LedgerError};

mod events;
pub use events::{LedgerEvent, LedgerEvents};

mod execute;
pub use execute::{
    ACCESS_LIST_ADDRESS_GAS, ACCESS_LIST_STORAGE_KEY_GAS, BlockExecutor, INVALID_OPCODE,
    REVERT_REASON, TX_BASE_GAS, TX_CREATE_GAS, TX_DATA_NON_ZERO_GAS, TX_DATA_ZERO_GAS,
    constructor_topic, intrinsic_gas,
};

mod ledger;
pub use ledger::{DEFAULT_BLOCK_GAS_LIMIT, DEFAULT_MAX_BLOCK_TXS, Ledger, LedgerConfig};

mod mempool;
pub use mempool::Mempool;

mod producer;
pub use producer::{BlockProducer, DEFAULT_BLOCK_TIME};
