//! Development ledger configuration.

use std::time::Duration;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Default gas limit per block.
pub const DEFAULT_BLOCK_GAS_LIMIT: u64 = 30_000_000;

/// Default block time in milliseconds.
pub const DEFAULT_BLOCK_TIME_MS: u64 = 1_000;

/// Default cap on transactions per block.
pub const DEFAULT_MAX_BLOCK_TXS: usize = 1024;

/// A genesis balance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenesisAccount {
    /// Funded address.
    pub address: Address,
    /// Initial balance.
    pub balance: U256,
}

/// Development ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DevnetConfig {
    /// Interval between blocks.
    #[serde(default = "default_block_time_ms")]
    pub block_time_ms: u64,

    /// Maximum gas per block.
    #[serde(default = "default_block_gas_limit")]
    pub block_gas_limit: u64,

    /// Maximum transactions per block.
    #[serde(default = "default_max_block_txs")]
    pub max_block_txs: usize,

    /// Skip producing blocks while the mempool is empty.
    #[serde(default)]
    pub skip_empty_blocks: bool,

    /// Initial balances.
    #[serde(default)]
    pub genesis: Vec<GenesisAccount>,
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self {
            block_time_ms: DEFAULT_BLOCK_TIME_MS,
            block_gas_limit: DEFAULT_BLOCK_GAS_LIMIT,
            max_block_txs: DEFAULT_MAX_BLOCK_TXS,
            skip_empty_blocks: false,
            genesis: Vec::new(),
        }
    }
}

impl DevnetConfig {
    /// Interval between blocks.
    pub const fn block_time(&self) -> Duration {
        Duration::from_millis(self.block_time_ms)
    }

    /// Genesis allocation as address/balance pairs.
    pub fn genesis_alloc(&self) -> Vec<(Address, U256)> {
        self.genesis.iter().map(|a| (a.address, a.balance)).collect()
    }
}

const fn default_block_time_ms() -> u64 {
    DEFAULT_BLOCK_TIME_MS
}

const fn default_block_gas_limit() -> u64 {
    DEFAULT_BLOCK_GAS_LIMIT
}

const fn default_max_block_txs() -> usize {
    DEFAULT_MAX_BLOCK_TXS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_devnet_config() {
        let config = DevnetConfig::default();
        assert_eq!(config.block_time(), Duration::from_secs(1));
        assert_eq!(config.block_gas_limit, DEFAULT_BLOCK_GAS_LIMIT);
        assert!(config.genesis_alloc().is_empty());
    }

    #[test]
    fn test_devnet_config_serde_defaults() {
        let config: DevnetConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(config, DevnetConfig::default());
    }

    #[test]
    fn test_genesis_from_toml() {
        let config: DevnetConfig = toml::from_str(
            r#"
            block_time_ms = 250

            [[genesis]]
            address = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
            balance = "0xde0b6b3a7640000"
            "#,
        )
        .expect("deserialize toml");
        assert_eq!(config.block_time(), Duration::from_millis(250));
        assert_eq!(
            config.genesis_alloc(),
            vec![(
                "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf".parse().unwrap(),
                U256::from(1_000_000_000_000_000_000u64)
            )]
        );
    }

    #[test]
    fn test_devnet_config_toml_roundtrip() {
        let config = DevnetConfig {
            block_time_ms: 5,
            skip_empty_blocks: true,
            genesis: vec![GenesisAccount {
                address: Address::repeat_byte(1),
                balance: U256::from(9u64),
            }],
            ..Default::default()
        };
        let serialized = toml::to_string(&config).expect("serialize toml");
        let deserialized: DevnetConfig = toml::from_str(&serialized).expect("deserialize toml");
        assert_eq!(config, deserialized);
    }
}
