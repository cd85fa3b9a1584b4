//! Block assembly and the proof-of-work search: increment the nonce
//! until the mining digest carries the required leading-zero prefix,
//! then stamp the block with its timestamp and final hash.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::blockchain::{Block, Chain, Mempool, Transaction};
use crate::config::MAX_TRANSACTIONS_PER_BLOCK;
use crate::consensus::hash_rate::{default_meter, HashRateMeter};
use crate::error::{ErrorCode, Result};

/// Predicate deciding whether a pending transaction is taken into the
/// block being assembled.
pub type TxSelector<'a> = &'a dyn Fn(&Transaction) -> bool;

/// Assembles the next block from the mempool.
///
/// Without a selector, up to [`MAX_TRANSACTIONS_PER_BLOCK`] transactions
/// are drained from the front. With one, the queue is walked in order
/// and only the transactions the selector accepts are removed (up to the
/// same cap); rejected transactions stay pending.
///
/// When `miner` is given, a mining-reward transaction paying the current
/// chain reward plus all collected fees is appended last.
pub fn create_block(
    mempool: &mut Mempool,
    chain: &Chain,
    difficulty: u64,
    miner: Option<&str>,
    selector: Option<TxSelector<'_>>,
) -> Result<Block> {
    let mut txs = match selector {
        None => mempool.pop_transactions(MAX_TRANSACTIONS_PER_BLOCK),
        Some(selector) => {
            let mut accepted_indices = Vec::new();
            for index in 0..mempool.len() {
                if accepted_indices.len() == MAX_TRANSACTIONS_PER_BLOCK {
                    break;
                }
                let tx = mempool.get(index).expect("index in bounds");
                if selector(tx) {
                    accepted_indices.push(index);
                }
            }

            // Remove back-to-front so earlier indices stay valid.
            let mut selected = Vec::with_capacity(accepted_indices.len());
            for index in accepted_indices.into_iter().rev() {
                selected.push(mempool.pop_at(index).expect("index in bounds"));
            }
            selected.reverse();
            selected
        }
    };

    if let Some(miner_pk) = miner {
        let fees: f64 = txs.iter().map(|tx| tx.fee).sum();
        let reward = Transaction::new_reward(chain.mining_reward() + fees, miner_pk)?;
        txs.push(reward);
    }

    let latest = chain.latest();
    Ok(Block::new(
        latest.index + 1,
        difficulty,
        latest.hash.clone(),
        txs,
    ))
}

/// Searches `[nonce_start, nonce_end]` for a nonce whose mining digest
/// satisfies the block's difficulty, recording the hash rate on `meter`.
/// On success the block's timestamp and final hash are stamped in.
pub fn mine_next_block(
    block: &mut Block,
    nonce_start: u64,
    nonce_end: u64,
    meter: &HashRateMeter,
) -> Result<()> {
    if nonce_start > nonce_end {
        return Err(ErrorCode::NonceMinLargerThanNonceMax);
    }

    block.nonce = nonce_start;
    let counter = Arc::new(AtomicU64::new(nonce_start));
    meter.start(Arc::clone(&counter));

    let digest = loop {
        let digest = block.mining_digest()?;
        if Block::meets_difficulty(&digest, block.difficulty) {
            break digest;
        }

        if block.nonce == nonce_end {
            meter.end();
            return Err(ErrorCode::NoHashSolutionFoundInNonceRange);
        }

        block.nonce += 1;
        counter.store(block.nonce, Ordering::Relaxed);
    };

    meter.end();

    block.timestamp = crate::config::timestamp_now();
    block.hash = Block::final_hash(&digest, block.timestamp)?;

    log::info!(
        "mined block {} at nonce {} ({:.0} h/s)",
        block.index,
        block.nonce,
        meter.current_hps()
    );

    Ok(())
}

/// Mines over the full nonce range with the process default meter.
pub fn mine_block(block: &mut Block) -> Result<()> {
    mine_next_block(block, 0, u64::MAX, default_meter())
}
