//! Identifiers

use alloy_primitives::{Address, B256, U256};
use bytes::{Buf, BufMut};
use commonware_codec::{Error as CodecError, FixedSize, Read, Write};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Block identifier (32 bytes).
pub struct BlockId(pub B256);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Transaction identifier (32 bytes).
pub struct TxId(pub B256);

/// Identifier encoding helpers.
#[derive(Debug)]
pub struct Idents;

impl Idents {
    /// Encode a `B256` into the buffer as raw bytes.
    pub fn write_b256(value: &B256, buf: &mut impl BufMut) {
        buf.put_slice(value.as_slice());
    }

    /// Decode a `B256` from the buffer, returning an error if insufficient bytes remain.
    pub fn read_b256(buf: &mut impl Buf) -> Result<B256, CodecError> {
        let mut out = [0u8; 32];
        Self::read_exact(buf, &mut out)?;
        Ok(B256::from(out))
    }

    /// Encode an `Address` into the buffer as raw bytes.
    pub fn write_address(value: &Address, buf: &mut impl BufMut) {
        buf.put_slice(value.as_slice());
    }

    /// Decode an `Address` from the buffer.
    pub fn read_address(buf: &mut impl Buf) -> Result<Address, CodecError> {
        let mut out = [0u8; 20];
        Self::read_exact(buf, &mut out)?;
        Ok(Address::from(out))
    }

    /// Encode a `U256` as 32 big-endian bytes.
    pub fn write_u256(value: &U256, buf: &mut impl BufMut) {
        buf.put_slice(&value.to_be_bytes::<32>());
    }

    /// Decode a `U256` from 32 big-endian bytes.
    pub fn read_u256(buf: &mut impl Buf) -> Result<U256, CodecError> {
        let mut out = [0u8; 32];
        Self::read_exact(buf, &mut out)?;
        Ok(U256::from_be_bytes(out))
    }

    fn read_exact(buf: &mut impl Buf, out: &mut [u8]) -> Result<(), CodecError> {
        if buf.remaining() < out.len() {
            return Err(CodecError::EndOfBuffer);
        }
        buf.copy_to_slice(out);
        Ok(())
    }
}

impl FixedSize for BlockId {
    const SIZE: usize = 32;
}

impl FixedSize for TxId {
    const SIZE: usize = 32;
}

impl Write for BlockId {
    fn write(&self, buf: &mut impl BufMut) {
        Idents::write_b256(&self.0, buf);
    }
}

impl Read for BlockId {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        Ok(Self(Idents::read_b256(buf)?))
    }
}

impl Write for TxId {
    fn write(&self, buf: &mut impl BufMut) {
        Idents::write_b256(&self.0, buf);
    }
}

impl Read for TxId {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        Ok(Self(Idents::read_b256(buf)?))
    }
}
