//! Local signing keys.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Keys available to `eth_sendTransaction`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyringConfig {
    /// Hex-encoded secp256k1 private keys.
    #[serde(default)]
    pub keys: Vec<String>,

    /// Directory of files holding one hex key each.
    #[serde(default)]
    pub key_dir: Option<PathBuf>,
}

impl KeyringConfig {
    /// Returns true if no key source is configured.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.key_dir.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyring_config_defaults() {
        let config: KeyringConfig = serde_json::from_str("{}").expect("deserialize");
        assert!(config.is_empty());

        let config: KeyringConfig = toml::from_str(r#"key_dir = "/keys""#).expect("deserialize");
        assert!(!config.is_empty());
        assert_eq!(config.key_dir, Some(PathBuf::from("/keys")));
    }
}
