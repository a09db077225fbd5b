//! ethgate-specific JSON-RPC API implementation.

use jsonrpsee::{core::RpcResult, proc_macros::rpc};

use crate::state::{NodeState, NodeStatus};

/// ethgate-specific JSON-RPC API trait.
#[rpc(server, namespace = "ethgate")]
pub trait NodeApi {
    /// Returns the current node status including indexer progress.
    #[method(name = "nodeStatus")]
    async fn node_status(&self) -> RpcResult<NodeStatus>;
}

/// Implementation of the node status API.
#[derive(Debug)]
pub struct NodeApiImpl {
    state: NodeState,
}

impl NodeApiImpl {
    /// Create a new node status API implementation.
    pub const fn new(state: NodeState) -> Self {
        Self { state }
    }
}

#[jsonrpsee::core::async_trait]
impl NodeApiServer for NodeApiImpl {
    async fn node_status(&self) -> RpcResult<NodeStatus> {
        Ok(self.state.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_shared_state() {
        let state = NodeState::new(9);
        let api = NodeApiImpl::new(state.clone());
        state.set_indexed(4, 2);

        let status = api.node_status().await.unwrap();
        assert_eq!(status.chain_id, 9);
        assert_eq!(status.last_indexed, 4);
        assert_eq!(status.indexed_txs, 2);
    }
}
