//! Native transaction envelope.

use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use bytes::{Buf, BufMut};
use commonware_codec::{
    Decode as _, Encode as _, EncodeSize, Error as CodecError, RangeCfg, Read, ReadExt as _, Write,
};

use crate::{Idents, Tx};

/// Leading byte of every encoded [`NativeTx`].
///
/// Sits outside the EIP-2718 type range used by EVM transactions, so raw EVM
/// submissions can be told apart from native envelopes by their first byte.
pub const NATIVE_TX_TAG: u8 = 0x0a;

const MSG_ETHEREUM: u8 = 0;
const MSG_TRANSFER: u8 = 1;

#[derive(Clone, Copy, Debug)]
/// Limits applied while decoding a [`NativeTx`].
pub struct NativeTxCfg {
    /// Maximum number of messages in one envelope.
    pub max_msgs: usize,
    /// Maximum size of an embedded EVM transaction.
    pub max_msg_bytes: usize,
    /// Maximum memo / denom length.
    pub max_text_bytes: usize,
}

impl Default for NativeTxCfg {
    fn default() -> Self {
        Self { max_msgs: 64, max_msg_bytes: 128 * 1024, max_text_bytes: 256 }
    }
}

/// A message carried inside a [`NativeTx`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Msg {
    /// A signed EVM transaction in EIP-2718 encoding.
    Ethereum(Bytes),
    /// A native balance transfer.
    Transfer {
        /// Debited account.
        from: Address,
        /// Credited account.
        to: Address,
        /// Amount in base denom.
        amount: U256,
    },
}

impl Msg {
    /// Returns the raw EVM transaction bytes if this is an EVM message.
    pub fn as_ethereum(&self) -> Option<&Bytes> {
        match self {
            Self::Ethereum(raw) => Some(raw),
            Self::Transfer { .. } => None,
        }
    }

    /// Returns the EVM transaction hash if this is an EVM message.
    pub fn ethereum_hash(&self) -> Option<B256> {
        self.as_ethereum().map(keccak256)
    }
}

/// Fee paid by a native envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fee {
    /// Fee amount.
    pub amount: U256,
    /// Denomination of `amount`.
    pub denom: String,
    /// Gas limit granted to the envelope.
    pub gas_limit: u64,
}

/// The platform's native transaction envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NativeTx {
    /// Messages executed in order.
    pub msgs: Vec<Msg>,
    /// Fee for the whole envelope.
    pub fee: Fee,
    /// Free-form memo.
    pub memo: String,
}

impl NativeTx {
    /// Create an envelope wrapping a single EVM transaction.
    pub fn ethereum(raw: Bytes, fee: Fee) -> Self {
        Self { msgs: vec![Msg::Ethereum(raw)], fee, memo: String::new() }
    }

    /// Decode an envelope from raw committed bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Self::decode_cfg(bytes, &NativeTxCfg::default())
    }

    /// Encode into a committed transaction.
    pub fn to_tx(&self) -> Tx {
        Tx::new(Bytes::from(self.encode().to_vec()))
    }

    /// Iterates `(msg_index, raw)` over the EVM messages of this envelope.
    pub fn ethereum_msgs(&self) -> impl Iterator<Item = (usize, &Bytes)> {
        self.msgs.iter().enumerate().filter_map(|(i, msg)| msg.as_ethereum().map(|raw| (i, raw)))
    }

    /// Returns true if any message is an EVM transaction.
    pub fn has_ethereum_msg(&self) -> bool {
        self.ethereum_msgs().next().is_some()
    }
}

impl Write for Msg {
    fn write(&self, buf: &mut impl BufMut) {
        match self {
            Self::Ethereum(raw) => {
                MSG_ETHEREUM.write(buf);
                raw.as_ref().write(buf);
            }
            Self::Transfer { from, to, amount } => {
                MSG_TRANSFER.write(buf);
                Idents::write_address(from, buf);
                Idents::write_address(to, buf);
                Idents::write_u256(amount, buf);
            }
        }
    }
}

impl EncodeSize for Msg {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Ethereum(raw) => raw.as_ref().encode_size(),
            Self::Transfer { .. } => 20 + 20 + 32,
        }
    }
}

impl Read for Msg {
    type Cfg = NativeTxCfg;

    fn read_cfg(buf: &mut impl Buf, cfg: &Self::Cfg) -> Result<Self, CodecError> {
        match u8::read(buf)? {
            MSG_ETHEREUM => {
                let raw =
                    Vec::<u8>::read_cfg(buf, &(RangeCfg::new(0..=cfg.max_msg_bytes), ()))?;
                Ok(Self::Ethereum(Bytes::from(raw)))
            }
            MSG_TRANSFER => {
                let from = Idents::read_address(buf)?;
                let to = Idents::read_address(buf)?;
                let amount = Idents::read_u256(buf)?;
                Ok(Self::Transfer { from, to, amount })
            }
            other => Err(CodecError::InvalidEnum(other)),
        }
    }
}

fn write_text(text: &str, buf: &mut impl BufMut) {
    text.as_bytes().write(buf);
}

fn read_text(buf: &mut impl Buf, max: usize) -> Result<String, CodecError> {
    let raw = Vec::<u8>::read_cfg(buf, &(RangeCfg::new(0..=max), ()))?;
    String::from_utf8(raw).map_err(|_| CodecError::Invalid("NativeTx", "text is not utf-8"))
}

impl Write for Fee {
    fn write(&self, buf: &mut impl BufMut) {
        Idents::write_u256(&self.amount, buf);
        write_text(&self.denom, buf);
        self.gas_limit.write(buf);
    }
}

impl EncodeSize for Fee {
    fn encode_size(&self) -> usize {
        32 + self.denom.as_bytes().encode_size() + self.gas_limit.encode_size()
    }
}

impl Read for Fee {
    type Cfg = NativeTxCfg;

    fn read_cfg(buf: &mut impl Buf, cfg: &Self::Cfg) -> Result<Self, CodecError> {
        let amount = Idents::read_u256(buf)?;
        let denom = read_text(buf, cfg.max_text_bytes)?;
        let gas_limit = u64::read(buf)?;
        Ok(Self { amount, denom, gas_limit })
    }
}

impl Write for NativeTx {
    fn write(&self, buf: &mut impl BufMut) {
        NATIVE_TX_TAG.write(buf);
        self.msgs.write(buf);
        self.fee.write(buf);
        write_text(&self.memo, buf);
    }
}

impl EncodeSize for NativeTx {
    fn encode_size(&self) -> usize {
        1 + self.msgs.encode_size() + self.fee.encode_size() + self.memo.as_bytes().encode_size()
    }
}

impl Read for NativeTx {
    type Cfg = NativeTxCfg;

    fn read_cfg(buf: &mut impl Buf, cfg: &Self::Cfg) -> Result<Self, CodecError> {
        if u8::read(buf)? != NATIVE_TX_TAG {
            return Err(CodecError::Invalid("NativeTx", "missing envelope tag"));
        }
        let msgs = Vec::<Msg>::read_cfg(buf, &(RangeCfg::new(0..=cfg.max_msgs), *cfg))?;
        let fee = Fee::read_cfg(buf, cfg)?;
        let memo = read_text(buf, cfg.max_text_bytes)?;
        Ok(Self { msgs, fee, memo })
    }
}
