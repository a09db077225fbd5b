//! Block types

use alloy_primitives::{Address, B256, keccak256};
use bytes::{Buf, BufMut};
use commonware_codec::{Encode, EncodeSize, Error as CodecError, RangeCfg, Read, ReadExt, Write};

use crate::{BlockId, Idents, Tx, TxCfg};

#[derive(Clone, Copy, Debug, Default)]
/// Configuration used when decoding blocks and their transactions.
pub struct BlockCfg {
    /// Maximum number of transactions that can be encoded in a block.
    pub max_txs: usize,
    /// Per-transaction codec configuration.
    pub tx: TxCfg,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Header of a committed block.
pub struct BlockHeader {
    /// Identifier of the parent block.
    pub parent: BlockId,
    /// Block height (number of committed ancestors).
    pub height: u64,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Proposer of the block.
    pub proposer: Address,
    /// Block gas limit.
    pub gas_limit: u64,
    /// Base fee per gas in effect for this block.
    pub base_fee: u64,
    /// Commitment over the ordered transaction ids.
    pub tx_root: B256,
}

impl BlockHeader {
    /// Compute the block identifier from the encoded header.
    pub fn id(&self) -> BlockId {
        BlockId(keccak256(self.encode()))
    }

    /// Returns the block hash exposed over RPC.
    pub fn hash(&self) -> B256 {
        self.id().0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// A committed block: header plus the ordered, mixed-kind transaction list.
pub struct Block {
    /// Block header.
    pub header: BlockHeader,
    /// Transactions included in the block, in delivery order.
    pub txs: Vec<Tx>,
}

impl Block {
    /// Build a block, deriving the header's `tx_root` from `txs`.
    pub fn new(mut header: BlockHeader, txs: Vec<Tx>) -> Self {
        header.tx_root = Self::tx_root(&txs);
        Self { header, txs }
    }

    /// Commitment over the ordered transaction ids.
    pub fn tx_root(txs: &[Tx]) -> B256 {
        let mut buf = Vec::with_capacity(txs.len() * 32);
        for tx in txs {
            buf.extend_from_slice(tx.id().0.as_slice());
        }
        keccak256(buf)
    }

    /// Block height.
    pub const fn height(&self) -> u64 {
        self.header.height
    }

    /// Block hash.
    pub fn hash(&self) -> B256 {
        self.header.hash()
    }
}

impl Write for BlockHeader {
    fn write(&self, buf: &mut impl BufMut) {
        self.parent.write(buf);
        self.height.write(buf);
        self.timestamp.write(buf);
        Idents::write_address(&self.proposer, buf);
        self.gas_limit.write(buf);
        self.base_fee.write(buf);
        Idents::write_b256(&self.tx_root, buf);
    }
}

impl EncodeSize for BlockHeader {
    fn encode_size(&self) -> usize {
        self.parent.encode_size()
            + self.height.encode_size()
            + self.timestamp.encode_size()
            + 20
            + self.gas_limit.encode_size()
            + self.base_fee.encode_size()
            + 32
    }
}

impl Read for BlockHeader {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &Self::Cfg) -> Result<Self, CodecError> {
        let parent = BlockId::read(buf)?;
        let height = u64::read(buf)?;
        let timestamp = u64::read(buf)?;
        let proposer = Idents::read_address(buf)?;
        let gas_limit = u64::read(buf)?;
        let base_fee = u64::read(buf)?;
        let tx_root = Idents::read_b256(buf)?;
        Ok(Self { parent, height, timestamp, proposer, gas_limit, base_fee, tx_root })
    }
}

impl Write for Block {
    fn write(&self, buf: &mut impl BufMut) {
        self.header.write(buf);
        self.txs.write(buf);
    }
}

impl EncodeSize for Block {
    fn encode_size(&self) -> usize {
        self.header.encode_size() + self.txs.encode_size()
    }
}

impl Read for Block {
    type Cfg = BlockCfg;

    fn read_cfg(buf: &mut impl Buf, cfg: &Self::Cfg) -> Result<Self, CodecError> {
        let header = BlockHeader::read(buf)?;
        let txs = Vec::<Tx>::read_cfg(buf, &(RangeCfg::new(0..=cfg.max_txs), cfg.tx))?;
        if header.tx_root != Self::tx_root(&txs) {
            return Err(CodecError::Invalid("Block", "tx root mismatch"));
        }
        Ok(Self { header, txs })
    }
}
