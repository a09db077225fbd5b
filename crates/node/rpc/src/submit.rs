//! Transaction submission: decode, validate, wrap and broadcast.

use std::sync::Arc;

use alloy_consensus::{Transaction as _, TxEnvelope};
use alloy_eips::eip2718::Decodable2718 as _;
use alloy_primitives::{B256, Bytes, U256};
use ethgate_domain::{ChainConfig, Fee, NativeTx, evm::Evm};
use tracing::{debug, warn};

use crate::error::SubmitError;

/// Transaction submission callback type.
///
/// Receives the encoded native envelope wrapping a submitted EVM
/// transaction. Returns true if the transaction was accepted.
pub type TxSubmitCallback = Arc<dyn Fn(Bytes) -> bool + Send + Sync>;

const EIP2930_TX_TYPE: u8 = 0x01;
const EIP1559_TX_TYPE: u8 = 0x02;

/// Decode raw `eth_sendRawTransaction` bytes into a signed envelope.
///
/// Accepts legacy RLP lists and EIP-2718 typed access-list and dynamic-fee
/// transactions. Anything else, including native envelopes, is rejected by
/// its leading byte before any decoding is attempted.
pub fn decode_raw_transaction(raw: &[u8]) -> Result<TxEnvelope, SubmitError> {
    match raw {
        [] | [0x00..=0x7f] => return Err(SubmitError::TypedTxTooShort),
        [0x80..=0xbf, ..] => return Err(SubmitError::LegacyRlpShape),
        [0xc0..=0xff, ..] | [EIP2930_TX_TYPE | EIP1559_TX_TYPE, ..] => {}
        [_, ..] => return Err(SubmitError::UnsupportedTxType),
    }
    TxEnvelope::decode_2718(&mut &raw[..]).map_err(|e| SubmitError::Rlp(e.to_string()))
}

/// Validates submitted transactions and forwards them for broadcast.
#[derive(Clone)]
pub struct Submitter {
    chain: Arc<ChainConfig>,
    allow_unprotected_txs: bool,
    broadcast: Option<TxSubmitCallback>,
}

impl std::fmt::Debug for Submitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Submitter")
            .field("chain_id", &self.chain.chain_id)
            .field("allow_unprotected_txs", &self.allow_unprotected_txs)
            .field("broadcast", &self.broadcast.is_some())
            .finish()
    }
}

impl Submitter {
    /// Create a submitter without a broadcast collaborator.
    pub const fn new(chain: Arc<ChainConfig>) -> Self {
        Self { chain, allow_unprotected_txs: false, broadcast: None }
    }

    /// Set the broadcast callback.
    #[must_use]
    pub fn with_broadcast(mut self, broadcast: TxSubmitCallback) -> Self {
        self.broadcast = Some(broadcast);
        self
    }

    /// Accept legacy transactions without EIP-155 replay protection.
    #[must_use]
    pub const fn with_allow_unprotected_txs(mut self, allow: bool) -> Self {
        self.allow_unprotected_txs = allow;
        self
    }

    /// Returns the chain configuration.
    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    /// Decode and submit raw transaction bytes.
    pub fn submit_raw(&self, raw: &[u8]) -> Result<B256, SubmitError> {
        let envelope = decode_raw_transaction(raw)?;
        self.submit_envelope(&envelope)
    }

    /// Validate, wrap and broadcast a signed envelope.
    pub fn submit_envelope(&self, envelope: &TxEnvelope) -> Result<B256, SubmitError> {
        let sender = Evm::recover_sender(envelope).map_err(|_| SubmitError::InvalidSignature)?;

        match envelope.chain_id() {
            Some(got) if got != self.chain.chain_id => {
                return Err(SubmitError::ChainIdMismatch { got, expected: self.chain.chain_id });
            }
            None if !self.allow_unprotected_txs => return Err(SubmitError::Unprotected),
            _ => {}
        }

        let hash = *envelope.tx_hash();
        let fee = Fee {
            amount: U256::from(envelope.gas_limit()) * U256::from(envelope.max_fee_per_gas()),
            denom: self.chain.base_denom.clone(),
            gas_limit: envelope.gas_limit(),
        };
        let wrapped = NativeTx::ethereum(Evm::encode(envelope), fee).to_tx();

        if let Some(broadcast) = &self.broadcast
            && !broadcast(wrapped.bytes)
        {
            warn!(%hash, %sender, "transaction rejected by broadcast");
            return Err(SubmitError::Rejected);
        }

        debug!(
            %hash,
            %sender,
            nonce = envelope.nonce(),
            legacy = envelope.is_legacy(),
            "submitted evm transaction"
        );
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use alloy_consensus::{SignableTransaction as _, TxEip1559, TxLegacy};
    use alloy_eips::eip2718::Encodable2718 as _;
    use alloy_primitives::{Address, Signature, TxKind, keccak256};
    use ethgate_domain::{NATIVE_TX_TAG, Tx};
    use k256::ecdsa::SigningKey;
    use parking_lot::Mutex;
    use rstest::rstest;

    use super::*;

    fn key() -> SigningKey {
        SigningKey::from_slice(&[5u8; 32]).unwrap()
    }

    fn dynamic_tx(chain_id: u64) -> TxEip1559 {
        TxEip1559 {
            chain_id,
            nonce: 0,
            gas_limit: 21_000,
            max_fee_per_gas: 2_000_000_000,
            max_priority_fee_per_gas: 0,
            to: TxKind::Call(Address::repeat_byte(0x77)),
            value: U256::from(1u64),
            access_list: Default::default(),
            input: Bytes::new(),
        }
    }

    fn legacy_tx(chain_id: Option<u64>) -> TxLegacy {
        TxLegacy {
            chain_id,
            nonce: 0,
            gas_price: 1_000_000_000,
            gas_limit: 21_000,
            to: TxKind::Call(Address::repeat_byte(0x77)),
            value: U256::ZERO,
            input: Bytes::new(),
        }
    }

    fn capture() -> (TxSubmitCallback, Arc<Mutex<Vec<Bytes>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: TxSubmitCallback = Arc::new(move |bytes| {
            sink.lock().push(bytes);
            true
        });
        (callback, seen)
    }

    fn submitter() -> Submitter {
        Submitter::new(Arc::new(ChainConfig::new(1337)))
    }

    #[rstest]
    #[case::empty(&[], "typed transaction too short")]
    #[case::type_byte_only(&[0x02], "typed transaction too short")]
    #[case::rlp_string(
        &[0x83, 0x01, 0x02, 0x03],
        "rlp: expected input list for legacy transaction"
    )]
    #[case::blob_type(&[0x03, 0xc0], "transaction type not supported")]
    #[case::unknown_type(&[0x7e, 0xc0], "transaction type not supported")]
    fn decode_rejects_by_leading_byte(#[case] raw: &[u8], #[case] message: &str) {
        let err = submitter().submit_raw(raw).unwrap_err();
        assert_eq!(err.to_string(), message);
    }

    #[test]
    fn native_envelope_is_unsupported() {
        let raw = Evm::encode(&Evm::sign(&key(), dynamic_tx(1337)).unwrap());
        let native = NativeTx::ethereum(raw, Fee::default()).to_tx();
        assert_eq!(native.bytes[0], NATIVE_TX_TAG);
        assert!(matches!(
            submitter().submit_raw(&native.bytes),
            Err(SubmitError::UnsupportedTxType)
        ));
    }

    #[test]
    fn dynamic_tx_rlp_encoded_as_legacy_is_rejected() {
        let envelope = Evm::sign(&key(), dynamic_tx(1337)).unwrap();
        let mut wrapped = Vec::new();
        envelope.network_encode(&mut wrapped);
        assert!((0x80..=0xbf).contains(&wrapped[0]));
        assert!(matches!(submitter().submit_raw(&wrapped), Err(SubmitError::LegacyRlpShape)));
    }

    #[test]
    fn unsigned_dynamic_tx_fails_sender_recovery() {
        let unsigned = TxEnvelope::from(
            dynamic_tx(1337).into_signed(Signature::new(U256::ZERO, U256::ZERO, false)),
        );
        let err = submitter().submit_raw(&unsigned.encoded_2718()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "couldn't retrieve sender address from the ethereum transaction: \
             invalid transaction v, r, s values"
        );
    }

    #[test]
    fn accepted_tx_is_wrapped_and_broadcast() {
        let (callback, seen) = capture();
        let submitter = submitter().with_broadcast(callback);
        let raw = Evm::encode(&Evm::sign(&key(), dynamic_tx(1337)).unwrap());

        let hash = submitter.submit_raw(&raw).unwrap();
        assert_eq!(hash, keccak256(&raw));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        let native = NativeTx::decode(&seen[0]).unwrap();
        assert_eq!(native.msgs.len(), 1);
        assert_eq!(native.msgs[0].as_ethereum(), Some(&raw));
        assert_eq!(native.fee.gas_limit, 21_000);
        assert_eq!(native.fee.amount, U256::from(21_000u64 * 2_000_000_000));
        assert_eq!(native.fee.denom, submitter.chain().base_denom);
        assert_eq!(Tx::new(seen[0].clone()).bytes[0], NATIVE_TX_TAG);
    }

    #[test]
    fn rejected_by_broadcast() {
        let submitter = submitter().with_broadcast(Arc::new(|_| false));
        let raw = Evm::encode(&Evm::sign(&key(), dynamic_tx(1337)).unwrap());
        assert!(matches!(submitter.submit_raw(&raw), Err(SubmitError::Rejected)));
    }

    #[test]
    fn chain_id_mismatch_is_rejected() {
        let raw = Evm::encode(&Evm::sign(&key(), dynamic_tx(1)).unwrap());
        assert!(matches!(
            submitter().submit_raw(&raw),
            Err(SubmitError::ChainIdMismatch { got: 1, expected: 1337 })
        ));
    }

    #[test]
    fn unprotected_legacy_requires_opt_in() {
        let raw = Evm::encode(&Evm::sign(&key(), legacy_tx(None)).unwrap());
        assert!(matches!(submitter().submit_raw(&raw), Err(SubmitError::Unprotected)));

        let permissive = submitter().with_allow_unprotected_txs(true);
        assert_eq!(permissive.submit_raw(&raw).unwrap(), keccak256(&raw));
    }

    #[test]
    fn protected_legacy_is_accepted() {
        let raw = Evm::encode(&Evm::sign(&key(), legacy_tx(Some(1337))).unwrap());
        assert!(raw[0] >= 0xc0);
        assert_eq!(submitter().submit_raw(&raw).unwrap(), keccak256(&raw));
    }
}
