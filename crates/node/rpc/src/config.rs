//! RPC server configuration.

use std::net::{Ipv4Addr, SocketAddr};

/// Default JSON-RPC port.
pub const DEFAULT_JSONRPC_PORT: u16 = 8545;

/// Default status endpoint port.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Configuration for the RPC server.
#[derive(Clone, Debug)]
pub struct RpcServerConfig {
    /// Address for the HTTP status endpoints.
    pub http_addr: SocketAddr,
    /// Address for the JSON-RPC server.
    pub jsonrpc_addr: SocketAddr,
    /// CORS configuration.
    pub cors: CorsConfig,
    /// Maximum number of concurrent connections.
    pub max_connections: u32,
}

impl RpcServerConfig {
    /// Create a new RPC configuration with default CORS.
    pub fn new(http_addr: SocketAddr, jsonrpc_addr: SocketAddr) -> Self {
        Self { http_addr, jsonrpc_addr, cors: CorsConfig::default(), max_connections: 100 }
    }

    /// Bind both servers to ephemeral localhost ports.
    pub fn ephemeral() -> Self {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
        Self::new(addr, addr)
    }

    /// Set CORS allowed origins.
    #[must_use]
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors.allowed_origins = origins;
        self
    }

    /// Set maximum connections.
    #[must_use]
    pub const fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self::new(
            SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_HTTP_PORT)),
            SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_JSONRPC_PORT)),
        )
    }
}

/// CORS configuration for the RPC server.
#[derive(Clone, Debug)]
pub struct CorsConfig {
    /// Allowed origins. Empty means no CORS headers are sent.
    pub allowed_origins: Vec<String>,
    /// Allowed methods.
    pub allowed_methods: Vec<String>,
    /// Allowed headers.
    pub allowed_headers: Vec<String>,
    /// Max age for preflight cache (seconds).
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec!["Content-Type".to_string()],
            max_age: 3600,
        }
    }
}

impl CorsConfig {
    /// Create a restrictive CORS config that allows no origins.
    pub const fn none() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: Vec::new(),
            allowed_headers: Vec::new(),
            max_age: 0,
        }
    }

    /// Create a permissive CORS config for development.
    pub fn permissive() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec!["*".to_string()],
            max_age: 86400,
        }
    }
}
