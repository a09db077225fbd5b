//! HTTP and JSON-RPC server implementation.

use std::{net::SocketAddr, time::Duration};

use axum::{Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use ethgate_indexer::EvmTxIndexer;
use jsonrpsee::server::{Server, ServerConfig, ServerHandle};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info};

use crate::{
    accessor::ChainReader,
    config::{CorsConfig, RpcServerConfig},
    eth::{EthApiImpl, EthApiServer, NetApiImpl, NetApiServer, Web3ApiImpl, Web3ApiServer},
    state::NodeState,
    status::{NodeApiImpl, NodeApiServer},
};

/// Error type for RPC server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind server.
    #[error("failed to bind server: {0}")]
    Bind(std::io::Error),
    /// Failed to register RPC methods.
    #[error("failed to register RPC methods: {0}")]
    RegisterMethod(#[from] jsonrpsee::core::RegisterMethodError),
}

/// Build a CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::new();
    }

    let mut layer = CorsLayer::new();

    if config.allowed_origins.len() == 1 && config.allowed_origins[0] == "*" {
        layer = layer.allow_origin(Any);
    } else {
        let origins: Vec<_> =
            config.allowed_origins.iter().filter_map(|o| o.parse().ok()).collect();
        layer = layer.allow_origin(AllowOrigin::list(origins));
    }

    if config.allowed_methods.iter().any(|m| m == "*") {
        layer = layer.allow_methods(Any);
    } else {
        let methods: Vec<_> =
            config.allowed_methods.iter().filter_map(|m| m.parse().ok()).collect();
        layer = layer.allow_methods(methods);
    }

    if config.allowed_headers.iter().any(|h| h == "*") {
        layer = layer.allow_headers(Any);
    } else {
        let headers: Vec<_> =
            config.allowed_headers.iter().filter_map(|h| h.parse().ok()).collect();
        layer = layer.allow_headers(headers);
    }

    layer.max_age(Duration::from_secs(config.max_age))
}

/// RPC server exposing node status via HTTP and the Ethereum JSON-RPC API.
pub struct RpcServer<I, C> {
    config: RpcServerConfig,
    state: NodeState,
    eth: EthApiImpl<I, C>,
}

impl<I, C> std::fmt::Debug for RpcServer<I, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcServer")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("eth", &self.eth)
            .finish()
    }
}

impl<I, C> RpcServer<I, C>
where
    I: EvmTxIndexer + 'static,
    C: ChainReader + 'static,
{
    /// Create a new RPC server.
    pub const fn new(config: RpcServerConfig, state: NodeState, eth: EthApiImpl<I, C>) -> Self {
        Self { config, state, eth }
    }

    /// Bind both listeners and start serving.
    ///
    /// Returns once both sockets are bound; serving continues on background
    /// tasks until the returned handle is stopped.
    pub async fn start(self) -> Result<RpcServerHandle, ServerError> {
        let cors_layer = build_cors_layer(&self.config.cors);
        let max_connections = self.config.max_connections;
        let chain_id = self.state.status().chain_id;

        let listener =
            tokio::net::TcpListener::bind(self.config.http_addr).await.map_err(ServerError::Bind)?;
        let http_addr = listener.local_addr().map_err(ServerError::Bind)?;
        let app = Router::new()
            .route("/status", get(status_handler))
            .route("/health", get(health_handler))
            .layer(cors_layer.clone())
            .layer(ConcurrencyLimitLayer::new(max_connections as usize))
            .with_state(self.state.clone());

        info!(addr = %http_addr, "Starting HTTP server");
        let http_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "HTTP server error");
            }
        });

        let server = Server::builder()
            .set_config(ServerConfig::builder().max_connections(max_connections).build())
            .set_http_middleware(tower::ServiceBuilder::new().layer(cors_layer))
            .build(self.config.jsonrpc_addr)
            .await
            .map_err(ServerError::Bind)?;
        let jsonrpc_addr = server.local_addr().map_err(ServerError::Bind)?;

        let mut module = jsonrpsee::RpcModule::new(());
        module.merge(self.eth.into_rpc())?;
        module.merge(NetApiImpl::new(chain_id).into_rpc())?;
        module.merge(Web3ApiImpl::new().into_rpc())?;
        module.merge(NodeApiImpl::new(self.state).into_rpc())?;

        info!(addr = %jsonrpc_addr, "Starting JSON-RPC server");
        let jsonrpc_handle = server.start(module);

        Ok(RpcServerHandle { http_addr, jsonrpc_addr, http_handle, jsonrpc_handle })
    }
}

/// Handle for managing the RPC server lifecycle.
pub struct RpcServerHandle {
    http_addr: SocketAddr,
    jsonrpc_addr: SocketAddr,
    http_handle: tokio::task::JoinHandle<()>,
    jsonrpc_handle: ServerHandle,
}

impl std::fmt::Debug for RpcServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcServerHandle")
            .field("http_addr", &self.http_addr)
            .field("jsonrpc_addr", &self.jsonrpc_addr)
            .finish_non_exhaustive()
    }
}

impl RpcServerHandle {
    /// Bound address of the status endpoints.
    pub const fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Bound address of the JSON-RPC server.
    pub const fn jsonrpc_addr(&self) -> SocketAddr {
        self.jsonrpc_addr
    }

    /// Wait for the JSON-RPC server to stop, then shut down the status server.
    pub async fn stopped(self) {
        self.jsonrpc_handle.stopped().await;
        self.http_handle.abort();
    }

    /// Stop both servers.
    pub fn stop(self) {
        self.http_handle.abort();
        let _ = self.jsonrpc_handle.stop();
    }
}

async fn status_handler(State(state): State<NodeState>) -> impl IntoResponse {
    (StatusCode::OK, axum::Json(state.status()))
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
