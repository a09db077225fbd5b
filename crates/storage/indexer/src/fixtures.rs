//! Block and outcome builders shared by the indexer tests.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, U256, keccak256};
use ethgate_domain::{
    BLOCK_GAS_LIMIT_EXCEEDED_LOG, Block, BlockHeader, CODE_EXECUTION, DeliveryOutcome, Event, Fee,
    Msg, NativeTx, Tx, events, evm::Evm,
};
use k256::ecdsa::SigningKey;

use crate::EvmTxIndexer;

pub(crate) const GAS_LIMIT: u64 = 50_000;

/// A signed EIP-1559 transfer from the key seeded with `seed`.
pub(crate) fn evm_tx(seed: u8, nonce: u64) -> Bytes {
    let key = SigningKey::from_slice(&[seed; 32]).unwrap();
    Evm::sign_eip1559_transfer(
        &key,
        1337,
        Address::repeat_byte(0x44),
        U256::from(1u64),
        nonce,
        GAS_LIMIT,
        1_000_000_000,
    )
    .unwrap()
}

pub(crate) fn wrap(raw: Bytes) -> Tx {
    NativeTx::ethereum(raw, Fee::default()).to_tx()
}

pub(crate) fn native_transfer() -> Tx {
    NativeTx {
        msgs: vec![Msg::Transfer {
            from: Address::repeat_byte(1),
            to: Address::repeat_byte(2),
            amount: U256::from(5u64),
        }],
        fee: Fee::default(),
        memo: "native".into(),
    }
    .to_tx()
}

pub(crate) fn eth_tx_event(raw: &Bytes, gas_used: u64, failed: bool) -> Event {
    let event = Event::new(events::ETHEREUM_TX)
        .with_attribute(events::ATTR_ETH_HASH, keccak256(raw).to_string())
        .with_attribute(events::ATTR_GAS_USED, gas_used.to_string());
    if failed { event.with_attribute(events::ATTR_FAILED, "execution reverted") } else { event }
}

pub(crate) fn ok_outcome(msgs: &[(&Bytes, u64, bool)]) -> DeliveryOutcome {
    DeliveryOutcome {
        events: msgs.iter().map(|(raw, gas, failed)| eth_tx_event(raw, *gas, *failed)).collect(),
        ..Default::default()
    }
}

pub(crate) fn gas_exceeded() -> DeliveryOutcome {
    DeliveryOutcome {
        code: CODE_EXECUTION,
        log: BLOCK_GAS_LIMIT_EXCEEDED_LOG.to_string(),
        ..Default::default()
    }
}

pub(crate) fn block_of(
    height: u64,
    entries: Vec<(Tx, DeliveryOutcome)>,
) -> (Block, Vec<DeliveryOutcome>) {
    let (txs, outcomes): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
    let header = BlockHeader { height, timestamp: height * 2, ..Default::default() };
    (Block::new(header, txs), outcomes)
}

/// `[native transfer, evm ok, garbage, evm failed]` at `height`.
pub(crate) fn mixed_block(height: u64) -> (Block, Vec<DeliveryOutcome>) {
    let seed = (height % 200) as u8 + 1;
    let first = evm_tx(seed, height);
    let second = evm_tx(seed + 1, height);
    block_of(
        height,
        vec![
            (native_transfer(), DeliveryOutcome::default()),
            (wrap(first.clone()), ok_outcome(&[(&first, 21_000, false)])),
            (Tx::new(Bytes::from_static(&[0xff, 0x00, 0x01])), DeliveryOutcome::default()),
            (wrap(second.clone()), ok_outcome(&[(&second, 30_000, true)])),
        ],
    )
}

/// Index `mixed_block`s on one thread while another thread reads them back.
///
/// A reader that sees a block's first EVM transaction must also see its
/// second, and every height at or below the watermark must be complete.
pub(crate) fn assert_whole_block_visibility<I: EvmTxIndexer + 'static>(index: Arc<I>) {
    const BLOCKS: u64 = 30;

    let writer = {
        let index = Arc::clone(&index);
        std::thread::spawn(move || {
            for height in 1..=BLOCKS {
                let (block, outcomes) = mixed_block(height);
                index.index_block(&block, &outcomes).unwrap();
            }
        })
    };
    let reader = {
        let index = Arc::clone(&index);
        std::thread::spawn(move || {
            for _ in 0..10_000 {
                let last = index.last_indexed_block().unwrap();
                for height in 1..=BLOCKS as i64 {
                    let first = index.get_by_block_and_index(height, 0).unwrap();
                    let second = index.get_by_block_and_index(height, 1).unwrap();
                    if first.is_some() {
                        assert!(second.is_some(), "height {height} is partially visible");
                    }
                    if height <= last {
                        assert!(first.is_some(), "height {height} missing below watermark {last}");
                    }
                }
                if last >= BLOCKS as i64 {
                    break;
                }
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(index.indexed_count().unwrap(), 2 * BLOCKS);
}
