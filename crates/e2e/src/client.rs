//! Minimal JSON-RPC client over HTTP.

use std::{net::SocketAddr, time::Duration};

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::HarnessError;

/// HTTP client for JSON-RPC calls.
#[derive(Clone, Debug)]
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
}

impl RpcClient {
    /// Create a client for the server listening on `addr`.
    pub fn new(addr: SocketAddr) -> Result<Self, HarnessError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| HarnessError::Rpc(e.to_string()))?;
        Ok(Self { client, url: format!("http://{addr}") })
    }

    /// Send a raw request and return the full response object.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, HarnessError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });
        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| HarnessError::Rpc(e.to_string()))?;
        resp.json().await.map_err(|e| HarnessError::Rpc(e.to_string()))
    }

    /// Call `method` and decode its result.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, HarnessError> {
        let mut response = self.request(method, params).await?;
        if let Some(error) = response.get("error") {
            return Err(HarnessError::Rpc(error.to_string()));
        }
        serde_json::from_value(response["result"].take())
            .map_err(|e| HarnessError::Rpc(format!("malformed {method} result: {e}")))
    }
}
