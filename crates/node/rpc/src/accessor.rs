//! Read-only access to committed chain data.

use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use ethgate_domain::{BlockHeader, DeliveryOutcome, Tx};

use crate::{
    error::RpcError,
    types::{BlockNumberOrHash, BlockNumberOrTag, BlockTag},
};

/// Read-only view of committed blocks and account state.
///
/// This abstracts away the consensus and execution collaborators, allowing
/// RPC methods to rebuild Ethereum views without knowing about their
/// internals.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Height of the latest committed block.
    async fn latest_height(&self) -> Result<u64, RpcError>;

    /// Header of the block at `height`.
    async fn header_by_height(&self, height: u64) -> Result<Option<BlockHeader>, RpcError>;

    /// Header of the block with `hash`.
    async fn header_by_hash(&self, hash: B256) -> Result<Option<BlockHeader>, RpcError>;

    /// Full ordered transaction list of the block at `height`.
    async fn block_txs(&self, height: u64) -> Result<Option<Vec<Tx>>, RpcError>;

    /// Delivery outcomes of the block at `height`, one per transaction.
    async fn block_outcomes(&self, height: u64) -> Result<Option<Vec<DeliveryOutcome>>, RpcError>;

    /// Account nonce after the block at `height`.
    async fn nonce(&self, address: Address, height: u64) -> Result<u64, RpcError>;

    /// Account balance after the block at `height`.
    async fn balance(&self, address: Address, height: u64) -> Result<U256, RpcError>;

    /// Resolve a number or tag to a concrete height.
    async fn resolve_number(&self, block: BlockNumberOrTag) -> Result<u64, RpcError> {
        let latest = self.latest_height().await?;
        match block {
            BlockNumberOrTag::Number(number) => {
                let height = number.to::<u64>();
                if height > latest {
                    return Err(RpcError::BlockNotFound);
                }
                Ok(height)
            }
            BlockNumberOrTag::Tag(BlockTag::Earliest) => Ok(0),
            BlockNumberOrTag::Tag(_) | BlockNumberOrTag::Latest => Ok(latest),
        }
    }

    /// Resolve any block reference to a concrete height.
    async fn resolve_block(&self, block: BlockNumberOrHash) -> Result<u64, RpcError> {
        match block {
            BlockNumberOrHash::Number(number) => self.resolve_number(number).await,
            BlockNumberOrHash::Hash { hash, .. } => self
                .header_by_hash(hash)
                .await?
                .map(|header| header.height)
                .ok_or(RpcError::BlockNotFound),
        }
    }
}

#[async_trait]
impl<T: ChainReader + ?Sized> ChainReader for Arc<T> {
    async fn latest_height(&self) -> Result<u64, RpcError> {
        (**self).latest_height().await
    }

    async fn header_by_height(&self, height: u64) -> Result<Option<BlockHeader>, RpcError> {
        (**self).header_by_height(height).await
    }

    async fn header_by_hash(&self, hash: B256) -> Result<Option<BlockHeader>, RpcError> {
        (**self).header_by_hash(hash).await
    }

    async fn block_txs(&self, height: u64) -> Result<Option<Vec<Tx>>, RpcError> {
        (**self).block_txs(height).await
    }

    async fn block_outcomes(&self, height: u64) -> Result<Option<Vec<DeliveryOutcome>>, RpcError> {
        (**self).block_outcomes(height).await
    }

    async fn nonce(&self, address: Address, height: u64) -> Result<u64, RpcError> {
        (**self).nonce(address, height).await
    }

    async fn balance(&self, address: Address, height: u64) -> Result<U256, RpcError> {
        (**self).balance(address, height).await
    }
}
