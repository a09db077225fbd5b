//! RPC configuration.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Default address of the status HTTP server.
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8080";

/// Default address of the JSON-RPC server.
pub const DEFAULT_JSONRPC_ADDR: &str = "127.0.0.1:8545";

/// Default cap on concurrent HTTP connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 1000;

/// RPC server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcConfig {
    /// Status server bind address.
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,

    /// JSON-RPC server bind address.
    #[serde(default = "default_jsonrpc_addr")]
    pub jsonrpc_addr: SocketAddr,

    /// Maximum concurrent connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Allowed CORS origins; empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Accept legacy transactions without replay protection.
    #[serde(default)]
    pub allow_unprotected_txs: bool,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            jsonrpc_addr: default_jsonrpc_addr(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            cors_origins: Vec::new(),
            allow_unprotected_txs: false,
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_jsonrpc_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8545))
}

const fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}
