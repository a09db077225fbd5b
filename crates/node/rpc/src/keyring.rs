//! Local signing keys for `eth_sendTransaction`.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use alloy_consensus::{SignableTransaction, Signed, TxEnvelope};
use alloy_primitives::{Address, Signature, hex};
use ethgate_domain::evm::Evm;
use k256::ecdsa::SigningKey;
use thiserror::Error;
use tracing::debug;

use crate::error::SubmitError;

/// Errors raised while loading keys.
#[derive(Debug, Error)]
pub enum KeyringError {
    /// A key is not a valid secp256k1 secret.
    #[error(
        "invalid private key{}",
        .0.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default()
    )]
    InvalidKey(Option<PathBuf>),

    /// The key directory could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// In-memory set of signing keys indexed by address.
#[derive(Default)]
pub struct Keyring {
    keys: HashMap<Address, SigningKey>,
}

impl std::fmt::Debug for Keyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyring").field("accounts", &self.accounts()).finish()
    }
}

fn parse_key(hex_key: &str) -> Option<SigningKey> {
    let bytes = hex::decode(hex_key.trim()).ok()?;
    SigningKey::from_slice(&bytes).ok()
}

impl Keyring {
    /// Create an empty keyring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a keyring from hex-encoded private keys.
    pub fn from_hex_keys<I, S>(keys: I) -> Result<Self, KeyringError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keyring = Self::new();
        for key in keys {
            keyring.insert(parse_key(key.as_ref()).ok_or(KeyringError::InvalidKey(None))?);
        }
        Ok(keyring)
    }

    /// Load every file in `dir` as a hex-encoded private key.
    ///
    /// Returns the number of keys added.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, KeyringError> {
        let io = |source| KeyringError::Io { path: dir.to_path_buf(), source };
        let mut loaded = 0;
        for entry in fs::read_dir(dir).map_err(io)? {
            let path = entry.map_err(io)?.path();
            if !path.is_file() {
                continue;
            }
            let contents = fs::read_to_string(&path)
                .map_err(|source| KeyringError::Io { path: path.clone(), source })?;
            let key = parse_key(&contents).ok_or_else(|| KeyringError::InvalidKey(Some(path)))?;
            let address = self.insert(key);
            debug!(%address, "loaded key");
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Add a key, returning its address.
    pub fn insert(&mut self, key: SigningKey) -> Address {
        let address = Evm::address_from_key(&key);
        self.keys.insert(address, key);
        address
    }

    /// Addresses of every held key, sorted.
    pub fn accounts(&self) -> Vec<Address> {
        let mut accounts: Vec<_> = self.keys.keys().copied().collect();
        accounts.sort();
        accounts
    }

    /// Returns true if a key for `address` is held.
    pub fn contains(&self, address: &Address) -> bool {
        self.keys.contains_key(address)
    }

    /// Number of held keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no keys are held.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Sign `tx` with the key for `from`.
    pub fn sign<T>(&self, from: Address, tx: T) -> Result<TxEnvelope, SubmitError>
    where
        T: SignableTransaction<Signature>,
        TxEnvelope: From<Signed<T>>,
    {
        let key = self.keys.get(&from).ok_or(SubmitError::KeyNotFound(from))?;
        Evm::sign(key, tx).map_err(|e| SubmitError::Signing(e.to_string()))
    }
}
