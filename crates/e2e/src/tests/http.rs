//! End-to-end tests over the JSON-RPC and status HTTP servers.

use alloy_primitives::{B256, U64};
use ethgate_indexer::MemoryTxIndex;
use ethgate_rpc::{NodeStatus, RpcTransactionReceipt};
use serde_json::json;

use crate::{RpcClient, TestConfig, TestNode, TestSetup};

#[tokio::test]
async fn test_transfer_over_json_rpc() {
    let config = TestConfig::default();
    let setup = TestSetup::simple_transfer(&config);
    let node = TestNode::start(&config, &setup, MemoryTxIndex::new()).unwrap();
    let server = node.serve().await.unwrap();
    let client = RpcClient::new(server.jsonrpc_addr()).unwrap();

    let chain_id: U64 = client.call("eth_chainId", json!([])).await.unwrap();
    assert_eq!(chain_id, U64::from(config.chain_id));

    let hash: B256 =
        client.call("eth_sendRawTransaction", json!([setup.bootstrap_txs[0]])).await.unwrap();
    let pending: Option<RpcTransactionReceipt> =
        client.call("eth_getTransactionReceipt", json!([hash])).await.unwrap();
    assert!(pending.is_none());

    let height = node.commit().await.unwrap();
    let receipt: Option<RpcTransactionReceipt> =
        client.call("eth_getTransactionReceipt", json!([hash])).await.unwrap();
    let receipt = receipt.unwrap();
    assert_eq!(receipt.block_number, U64::from(height));
    assert_eq!(receipt.status, U64::from(1));

    let status: NodeStatus = client.call("ethgate_nodeStatus", json!([])).await.unwrap();
    assert_eq!(status.latest_height, height);
    assert_eq!(status.last_indexed, height as i64);
    assert_eq!(status.indexed_txs, 1);
    assert_eq!(status.submitted_txs, 1);

    server.stop();
    node.shutdown();
}

#[tokio::test]
async fn test_rejected_raw_transaction_is_json_rpc_error() {
    let config = TestConfig::default();
    let node = TestNode::start(&config, &TestSetup::empty(), MemoryTxIndex::new()).unwrap();
    let server = node.serve().await.unwrap();
    let client = RpcClient::new(server.jsonrpc_addr()).unwrap();

    let response = client.request("eth_sendRawTransaction", json!(["0x"])).await.unwrap();
    let message = response["error"]["message"].as_str().unwrap();
    assert!(message.contains("too short"), "{message}");
    assert_eq!(node.state().status().submitted_txs, 0);

    server.stop();
    node.shutdown();
}

#[tokio::test]
async fn test_health_and_status_endpoints() {
    let config = TestConfig::default().with_chain_id(9001);
    let node = TestNode::start(&config, &TestSetup::empty(), MemoryTxIndex::new()).unwrap();
    node.commit().await.unwrap();
    let server = node.serve().await.unwrap();
    let base = format!("http://{}", server.http_addr());

    let health = reqwest::get(format!("{base}/health")).await.unwrap();
    assert!(health.status().is_success());
    assert_eq!(health.text().await.unwrap(), "ok");

    let status: NodeStatus =
        reqwest::get(format!("{base}/status")).await.unwrap().json().await.unwrap();
    assert_eq!(status.chain_id, 9001);
    assert_eq!(status.latest_height, 1);
    assert_eq!(status.last_indexed, 1);

    server.stop();
    node.shutdown();
}
