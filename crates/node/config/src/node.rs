//! Top-level node configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    ChainSettings, ConfigError, DevnetConfig, IndexerBackend, IndexerConfig, KeyringConfig,
    RpcConfig,
};

/// Environment variable overriding `rpc.allow_unprotected_txs`.
pub const ALLOW_UNPROTECTED_TXS_ENV: &str = "JSON_RPC_ALLOW_UNPROTECTED_TXS";

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeConfig {
    /// Chain parameters.
    #[serde(default)]
    pub chain: ChainSettings,

    /// Indexer storage.
    #[serde(default)]
    pub indexer: IndexerConfig,

    /// RPC servers.
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Local signing keys.
    #[serde(default)]
    pub keyring: KeyringConfig,

    /// Development ledger.
    #[serde(default)]
    pub devnet: DevnetConfig,
}

impl NodeConfig {
    /// Load from `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    /// Load from a `.toml` or `.json` file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Self::from_json(&content),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Parse TOML content.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse JSON content.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        let value = std::env::var(ALLOW_UNPROTECTED_TXS_ENV).ok();
        self.apply_allow_unprotected(value.as_deref());
    }

    /// Apply an `allow_unprotected_txs` override if `value` is a recognised flag.
    pub fn apply_allow_unprotected(&mut self, value: Option<&str>) {
        if let Some(allow) = value.and_then(parse_flag) {
            self.rpc.allow_unprotected_txs = allow;
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indexer.backend == IndexerBackend::Sqlite && self.indexer.db_path.is_none() {
            return Err(ConfigError::Invalid("sqlite indexer requires indexer.db_path".into()));
        }
        if self.indexer.queue_size == 0 {
            return Err(ConfigError::Invalid("indexer.queue_size must be positive".into()));
        }
        if self.devnet.block_time_ms == 0 {
            return Err(ConfigError::Invalid("devnet.block_time_ms must be positive".into()));
        }
        if self.devnet.block_gas_limit == 0 {
            return Err(ConfigError::Invalid("devnet.block_gas_limit must be positive".into()));
        }
        Ok(())
    }
}

/// Parse a boolean environment flag.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
