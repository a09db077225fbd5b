//! EVM-oriented transaction helpers.

use alloy_consensus::{SignableTransaction, Signed, TxEip1559, TxEnvelope};
use alloy_eips::eip2718::Encodable2718 as _;
use alloy_primitives::{Address, Bytes, Signature, TxKind, U256, keccak256, uint};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use sha3::{Digest as _, Keccak256};

/// Order of the secp256k1 curve.
pub const SECP256K1N: U256 =
    uint!(0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141_U256);

/// Half the secp256k1 order; larger `s` values are malleable (EIP-2).
pub const SECP256K1N_HALF: U256 =
    uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0_U256);

/// Errors raised by EVM signing and recovery.
#[derive(Debug, thiserror::Error)]
pub enum EvmError {
    /// Signature components are out of range or do not recover a key.
    #[error("invalid transaction v, r, s values")]
    InvalidSignature,
    /// The signing backend failed.
    #[error("signing failed: {0}")]
    Signing(String),
}

/// EVM-specific helpers for transaction construction and recovery.
#[derive(Debug)]
pub struct Evm;

impl Evm {
    /// Derive an Ethereum address from a secp256k1 signing key.
    pub fn address_from_key(key: &SigningKey) -> Address {
        Self::address_from_verifying_key(key.verifying_key())
    }

    fn address_from_verifying_key(key: &VerifyingKey) -> Address {
        let encoded = key.to_encoded_point(false);
        let pubkey = encoded.as_bytes();
        let hash = keccak256(&pubkey[1..]);
        Address::from_slice(&hash[12..])
    }

    /// Sign any transaction shape and wrap it in an envelope.
    pub fn sign<T>(key: &SigningKey, tx: T) -> Result<TxEnvelope, EvmError>
    where
        T: SignableTransaction<Signature>,
        TxEnvelope: From<Signed<T>>,
    {
        let digest = Keccak256::new_with_prefix(tx.encoded_for_signing());
        let (sig, recid) =
            key.sign_digest_recoverable(digest).map_err(|e| EvmError::Signing(e.to_string()))?;
        let signature = Signature::from((sig, recid));
        Ok(TxEnvelope::from(tx.into_signed(signature)))
    }

    /// Encode an envelope in its EIP-2718 wire form.
    pub fn encode(envelope: &TxEnvelope) -> Bytes {
        Bytes::from(envelope.encoded_2718())
    }

    /// Sign a simple EIP-1559 transfer and return its EIP-2718 bytes.
    #[allow(clippy::too_many_arguments)]
    pub fn sign_eip1559_transfer(
        key: &SigningKey,
        chain_id: u64,
        to: Address,
        value: U256,
        nonce: u64,
        gas_limit: u64,
        max_fee_per_gas: u128,
    ) -> Result<Bytes, EvmError> {
        let tx = TxEip1559 {
            chain_id,
            nonce,
            gas_limit,
            max_fee_per_gas,
            max_priority_fee_per_gas: 0,
            to: TxKind::Call(to),
            value,
            access_list: Default::default(),
            input: Bytes::new(),
        };
        Ok(Self::encode(&Self::sign(key, tx)?))
    }

    /// Check signature components against secp256k1 bounds.
    pub fn validate_signature(signature: &Signature) -> Result<(), EvmError> {
        let (r, s) = (signature.r(), signature.s());
        if r.is_zero() || s.is_zero() || r >= SECP256K1N || s > SECP256K1N_HALF {
            return Err(EvmError::InvalidSignature);
        }
        Ok(())
    }

    /// Recover the sender of a signed envelope.
    pub fn recover_sender(envelope: &TxEnvelope) -> Result<Address, EvmError> {
        let signature = envelope.signature();
        Self::validate_signature(signature)?;

        let mut sig_bytes = [0u8; 64];
        sig_bytes[..32].copy_from_slice(&signature.r().to_be_bytes::<32>());
        sig_bytes[32..].copy_from_slice(&signature.s().to_be_bytes::<32>());
        let sig =
            EcdsaSignature::from_slice(&sig_bytes).map_err(|_| EvmError::InvalidSignature)?;

        let recovery_id = RecoveryId::try_from(u8::from(signature.v()))
            .map_err(|_| EvmError::InvalidSignature)?;

        let signing_hash = envelope.signature_hash();
        let verifying_key =
            VerifyingKey::recover_from_prehash(signing_hash.as_slice(), &sig, recovery_id)
                .map_err(|_| EvmError::InvalidSignature)?;

        Ok(Self::address_from_verifying_key(&verifying_key))
    }
}
