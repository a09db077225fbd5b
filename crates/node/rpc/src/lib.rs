//! Ethereum JSON-RPC translation layer for ethgate.

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/refcell/ethgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod accessor;
pub use accessor::ChainReader;

mod config;
pub use config::{CorsConfig, DEFAULT_HTTP_PORT, DEFAULT_JSONRPC_PORT, RpcServerConfig};

mod error;
pub use error::{RpcError, SubmitError, codes as error_codes};

mod eth;
pub use eth::{
    DEFAULT_TX_GAS, EthApiImpl, EthApiServer, NetApiImpl, NetApiServer, Web3ApiImpl,
    Web3ApiServer,
};

mod keyring;
pub use keyring::{Keyring, KeyringError};

mod server;
pub use server::{RpcServer, RpcServerHandle, ServerError};

mod state;
pub use state::{NodeState, NodeStatus};

mod status;
pub use status::{NodeApiImpl, NodeApiServer};

mod submit;
pub use submit::{Submitter, TxSubmitCallback, decode_raw_transaction};

mod translate;
pub use translate::{build_receipt, build_transaction};

mod types;
pub use types::{
    BlockNumberOrHash, BlockNumberOrTag, BlockTag, FeeFields, RpcLog, RpcTransaction,
    RpcTransactionReceipt, TransactionArgs,
};
