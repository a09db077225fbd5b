//! Chain parameters.

use ethgate_domain::{ChainConfig, DEFAULT_BASE_DENOM, DEFAULT_BASE_FEE, DEFAULT_CHAIN_ID};
use serde::{Deserialize, Serialize};

/// Chain section of the node configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainSettings {
    /// EVM chain id.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Base denomination.
    #[serde(default = "default_base_denom")]
    pub base_denom: String,

    /// Base fee per gas.
    #[serde(default = "default_base_fee")]
    pub base_fee: u64,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            base_denom: DEFAULT_BASE_DENOM.to_string(),
            base_fee: DEFAULT_BASE_FEE,
        }
    }
}

impl ChainSettings {
    /// Build the immutable chain configuration.
    pub fn to_chain_config(&self) -> ChainConfig {
        ChainConfig::new(self.chain_id)
            .with_base_denom(self.base_denom.clone())
            .with_base_fee(self.base_fee)
    }
}

const fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

fn default_base_denom() -> String {
    DEFAULT_BASE_DENOM.to_string()
}

const fn default_base_fee() -> u64 {
    DEFAULT_BASE_FEE
}
