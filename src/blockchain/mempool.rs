//! FIFO queue of signed, not-yet-mined transactions. Admission checks
//! run against the current chain; the queue never holds two entries
//! with the same hash.

use std::collections::{HashSet, VecDeque};

use crate::blockchain::chain::Chain;
use crate::blockchain::transaction::Transaction;
use crate::config::{timestamp_now, RECOMMENDED_TRANSACTION_FEE, TRANSACTION_EXPIRY_SECS};
use crate::crypto::KeyPair;
use crate::error::{ErrorCode, Result};

#[derive(Debug, Clone, Default)]
pub struct Mempool {
    pending: VecDeque<Transaction>,
    hashes: HashSet<String>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a signed transaction. Checks run in a fixed order and the
    /// first failure is returned:
    /// duplicate, zero amount, missing keys, insufficient sender
    /// balance, expiry window, signature verification.
    pub fn push_transaction(&mut self, chain: &Chain, tx: Transaction) -> Result<()> {
        if self.hashes.contains(&tx.hash) {
            return Err(ErrorCode::TransactionAlreadyInMempool);
        }

        if tx.amount == 0.0 {
            return Err(ErrorCode::TransactionAmountInvalid);
        }

        if tx.sender.is_empty() || tx.recipient.is_empty() {
            return Err(ErrorCode::TransactionKeyNotSpecified);
        }

        if chain.address_balance(&tx.sender) < tx.amount + tx.fee {
            return Err(ErrorCode::TransactionSenderBalanceInsufficient);
        }

        if tx.timestamp < timestamp_now().saturating_sub(TRANSACTION_EXPIRY_SECS) {
            return Err(ErrorCode::TransactionExpired);
        }

        tx.verify()?;

        self.hashes.insert(tx.hash.clone());
        self.pending.push_back(tx);
        Ok(())
    }

    /// Builds, signs and admits a transfer in one step; returns the new
    /// transaction's hash on success.
    pub fn push_new_transaction(
        &mut self,
        chain: &Chain,
        amount: f64,
        fee: f64,
        sender: &KeyPair,
        recipient: &str,
    ) -> Result<String> {
        let tx = Transaction::new_transfer(amount, fee, sender, recipient)?;
        let tx_hash = tx.hash.clone();
        self.push_transaction(chain, tx)?;
        Ok(tx_hash)
    }

    /// Removes and returns up to `count` transactions from the front.
    pub fn pop_transactions(&mut self, count: usize) -> Vec<Transaction> {
        let mut popped = Vec::new();

        while popped.len() < count {
            match self.pending.pop_front() {
                Some(tx) => {
                    self.hashes.remove(&tx.hash);
                    popped.push(tx);
                }
                None => break,
            }
        }

        popped
    }

    /// Removes and returns the transaction at `index`, if present.
    pub fn pop_at(&mut self, index: usize) -> Option<Transaction> {
        let tx = self.pending.remove(index)?;
        self.hashes.remove(&tx.hash);
        Some(tx)
    }

    pub fn get(&self, index: usize) -> Option<&Transaction> {
        self.pending.get(index)
    }

    pub fn contains(&self, tx_hash: &str) -> bool {
        self.hashes.contains(tx_hash)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
