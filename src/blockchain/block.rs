//! Blocks and their two-stage hash: an inner "mining digest" over the
//! contents (the proof-of-work target) and an outer stored hash that
//! additionally binds the mining timestamp.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::blockchain::chain::Chain;
use crate::blockchain::transaction::Transaction;
use crate::config::{
    GENESIS_DIFFICULTY, GENESIS_HASH, GENESIS_INDEX, GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP,
};
use crate::crypto::sha256::sha256_hex_upper;
use crate::error::{ErrorCode, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u32,
    pub timestamp: u64,
    pub difficulty: u64,
    pub nonce: u64,
    pub previous_hash: String,
    pub hash: String,
    pub txs: Vec<Transaction>,
}

impl Block {
    /// An unmined block: nonce, timestamp and hash are filled in by the
    /// proof-of-work search.
    pub fn new(index: u32, difficulty: u64, previous_hash: String, txs: Vec<Transaction>) -> Self {
        Self {
            index,
            timestamp: 0,
            difficulty,
            nonce: 0,
            previous_hash,
            hash: String::new(),
            txs,
        }
    }

    /// The hardcoded first block every chain starts from.
    pub fn genesis() -> Self {
        Self {
            index: GENESIS_INDEX,
            timestamp: GENESIS_TIMESTAMP,
            difficulty: GENESIS_DIFFICULTY,
            nonce: 0,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            hash: GENESIS_HASH.to_string(),
            txs: Vec::new(),
        }
    }

    /// Inner digest over `index ‖ nonce ‖ previous_hash ‖ txs-json`; the
    /// string the proof-of-work prefix test runs against.
    pub fn mining_digest(&self) -> Result<String> {
        let mut data = format!("{}{}{}", self.index, self.nonce, self.previous_hash);
        for tx in &self.txs {
            data.push_str(&tx.to_json());
        }

        sha256_hex_upper(data.as_bytes())
    }

    /// Outer digest binding a mining digest to the mining timestamp;
    /// this is the hash a block stores and is verified by.
    pub fn final_hash(mining_digest: &str, timestamp: u64) -> Result<String> {
        sha256_hex_upper(format!("{mining_digest}{timestamp}").as_bytes())
    }

    /// True when `digest` starts with at least `difficulty` zero hex
    /// characters.
    pub fn meets_difficulty(digest: &str, difficulty: u64) -> bool {
        let leading = digest.bytes().take_while(|b| *b == b'0').count();
        leading as u64 >= difficulty
    }

    /// Validates this block against the chain it claims to extend.
    /// Rules run in a fixed order; the first failure is returned.
    pub fn verify(&self, chain: &Chain) -> Result<()> {
        for tx in &self.txs {
            tx.verify()?;
        }

        if self.index == 0 {
            if *self != Self::genesis() {
                return Err(ErrorCode::GenesisBlockInvalid);
            }
            return Ok(());
        }

        let prev = chain
            .block_at(self.index - 1)
            .ok_or(ErrorCode::BlockIndexInvalid)?;

        if self.previous_hash != prev.hash {
            return Err(ErrorCode::BlockPreviousHashInvalid);
        }
        if self.timestamp <= prev.timestamp {
            return Err(ErrorCode::BlockTimestampInvalid);
        }
        if self.index != prev.index + 1 {
            return Err(ErrorCode::BlockIndexInvalid);
        }

        let digest = self.mining_digest()?;
        if Self::final_hash(&digest, self.timestamp)? != self.hash {
            return Err(ErrorCode::BlockHashInvalid);
        }

        if !Self::meets_difficulty(&digest, self.difficulty) {
            return Err(ErrorCode::BlockHashDifficultyInsufficient);
        }

        Ok(())
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("block serializes")
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
