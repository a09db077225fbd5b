//! Configuration types for ethgate nodes.
#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/refcell/ethgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod chain;
pub use chain::ChainSettings;

mod devnet;
pub use devnet::{
    DEFAULT_BLOCK_GAS_LIMIT, DEFAULT_BLOCK_TIME_MS, DEFAULT_MAX_BLOCK_TXS, DevnetConfig,
    GenesisAccount,
};

mod error;
pub use error::ConfigError;

mod indexer;
pub use indexer::{DEFAULT_QUEUE_SIZE, IndexerBackend, IndexerConfig};

mod keyring;
pub use keyring::KeyringConfig;

mod node;
pub use node::{ALLOW_UNPROTECTED_TXS_ENV, NodeConfig, parse_flag};

mod rpc;
pub use rpc::{DEFAULT_HTTP_ADDR, DEFAULT_JSONRPC_ADDR, DEFAULT_MAX_CONNECTIONS, RpcConfig};
