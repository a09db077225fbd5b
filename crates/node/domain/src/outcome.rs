//! Delivery outcomes and the structured events they carry.

use alloy_primitives::{Address, B256, Bytes};
use serde::{Deserialize, Serialize};

/// Result code of a successfully delivered transaction.
pub const CODE_OK: u32 = 0;

/// Result code used when a transaction could not be decoded.
pub const CODE_TX_DECODE: u32 = 2;

/// Result code used when execution rejected the transaction.
pub const CODE_EXECUTION: u32 = 11;

/// Log fragment marking a delivery that ran out of block gas.
///
/// Such transactions still occupy a slot in the block and are indexed as
/// failed with their full gas limit charged.
pub const BLOCK_GAS_LIMIT_EXCEEDED_LOG: &str = "out of gas in location: block gas meter";

/// Event kinds and attribute keys emitted during delivery.
pub mod events {
    /// Execution summary, one per EVM message.
    pub const ETHEREUM_TX: &str = "ethereum_tx";
    /// Logs emitted by one EVM message.
    pub const TX_LOG: &str = "tx_log";
    /// Native value transfer.
    pub const TRANSFER: &str = "transfer";

    /// Hash of the EVM transaction.
    pub const ATTR_ETH_HASH: &str = "ethereumTxHash";
    /// Position of the EVM transaction in the block, as seen by execution.
    pub const ATTR_TX_INDEX: &str = "txIndex";
    /// Gas used by the EVM transaction.
    pub const ATTR_GAS_USED: &str = "txGasUsed";
    /// Present when the top-level call failed; value is the reason.
    pub const ATTR_FAILED: &str = "ethereumTxFailed";
    /// A JSON-encoded [`EvmLog`](crate::EvmLog).
    pub const ATTR_TX_LOG: &str = "txLog";
    /// Transfer sender.
    pub const ATTR_SENDER: &str = "sender";
    /// Transfer recipient.
    pub const ATTR_RECIPIENT: &str = "recipient";
    /// Transfer amount.
    pub const ATTR_AMOUNT: &str = "amount";
}

/// A key/value pair on an [`Event`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventAttribute {
    /// Attribute key.
    pub key: String,
    /// Attribute value.
    pub value: String,
}

/// A structured event emitted while delivering a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Event kind, e.g. [`events::ETHEREUM_TX`].
    pub kind: String,
    /// Ordered attributes.
    pub attributes: Vec<EventAttribute>,
}

impl Event {
    /// Create an event with no attributes.
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into(), attributes: Vec::new() }
    }

    /// Append an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(EventAttribute { key: key.into(), value: value.into() });
        self
    }

    /// First value stored under `key`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.iter().find(|a| a.key == key).map(|a| a.value.as_str())
    }

    /// All values stored under `key`, in order.
    pub fn attributes_of<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.attributes.iter().filter(move |a| a.key == key).map(|a| a.value.as_str())
    }
}

/// Outcome of delivering one transaction of a block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliveryOutcome {
    /// Result code, [`CODE_OK`] on success.
    pub code: u32,
    /// Human-readable log.
    pub log: String,
    /// Gas requested by the envelope.
    pub gas_wanted: u64,
    /// Gas consumed by the envelope.
    pub gas_used: u64,
    /// Emitted events.
    pub events: Vec<Event>,
}

impl DeliveryOutcome {
    /// Returns true if the delivery succeeded.
    pub const fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }

    /// Returns true if the delivery was rejected for exceeding the block gas limit.
    pub fn exceeded_block_gas_limit(&self) -> bool {
        self.log.contains(BLOCK_GAS_LIMIT_EXCEEDED_LOG)
    }

    /// Events of the given kind, in emission order.
    pub fn events_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    /// The execution summary event for the EVM transaction with `hash`.
    pub fn ethereum_tx_event(&self, hash: &B256) -> Option<&Event> {
        let wanted = hash.to_string();
        self.events_of(events::ETHEREUM_TX).find(|e| {
            e.attribute(events::ATTR_ETH_HASH).is_some_and(|v| v.eq_ignore_ascii_case(&wanted))
        })
    }
}

/// A log emitted by EVM execution, as carried in `tx_log` events.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmLog {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics.
    pub topics: Vec<B256>,
    /// Non-indexed data.
    pub data: Bytes,
}
