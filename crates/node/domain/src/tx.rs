//! Transactions

use alloy_primitives::{Bytes, keccak256};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error as CodecError, RangeCfg, Read, Write};

use super::TxId;

#[derive(Clone, Copy, Debug)]
/// Configuration used when decoding transactions from bytes.
pub struct TxCfg {
    /// Maximum encoded transaction size accepted by the codec.
    pub max_tx_bytes: usize,
}

impl Default for TxCfg {
    fn default() -> Self {
        Self { max_tx_bytes: 128 * 1024 }
    }
}

/// Raw transaction bytes as committed by consensus.
///
/// Committed transactions are opaque to consensus. They are normally a
/// [`NativeTx`](crate::NativeTx) envelope, but nothing prevents a block from
/// carrying arbitrary bytes, so consumers must tolerate undecodable entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tx {
    /// Encoded transaction bytes.
    pub bytes: Bytes,
}

impl Tx {
    /// Compute the transaction identifier from its raw contents.
    pub fn id(&self) -> TxId {
        TxId(keccak256(&self.bytes))
    }

    /// Create a new transaction from encoded bytes.
    pub const fn new(bytes: Bytes) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_ref()
    }
}

impl From<Bytes> for Tx {
    fn from(bytes: Bytes) -> Self {
        Self::new(bytes)
    }
}

impl Write for Tx {
    fn write(&self, buf: &mut impl BufMut) {
        self.bytes.as_ref().write(buf);
    }
}

impl EncodeSize for Tx {
    fn encode_size(&self) -> usize {
        self.bytes.as_ref().encode_size()
    }
}

impl Read for Tx {
    type Cfg = TxCfg;

    fn read_cfg(buf: &mut impl Buf, cfg: &Self::Cfg) -> Result<Self, CodecError> {
        let data = Vec::<u8>::read_cfg(buf, &(RangeCfg::new(0..=cfg.max_tx_bytes), ()))?;
        Ok(Self { bytes: Bytes::from(data) })
    }
}
