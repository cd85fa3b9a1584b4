//! Signed value-transfer records. A transaction's identity is a double
//! SHA-256 over its canonical data string with a hex timestamp tag
//! appended; the signature covers the raw 32 digest bytes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::config::timestamp_now;
use crate::crypto::sha256::{hex_upper, sha256};
use crate::crypto::KeyPair;
use crate::error::{ErrorCode, Result};

/// Hex length of the content digest prefix of a transaction hash; the
/// remainder of the string is the timestamp tag.
pub const TX_DIGEST_HEX_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Transfer,
    MiningReward,
}

/// Wire/JSON tag values are fixed: 0 = transfer, 1 = mining reward.
impl Serialize for TxKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let tag: u32 = match self {
            TxKind::Transfer => 0,
            TxKind::MiningReward => 1,
        };
        serializer.serialize_u32(tag)
    }
}

impl<'de> Deserialize<'de> for TxKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match u32::deserialize(deserializer)? {
            0 => Ok(TxKind::Transfer),
            1 => Ok(TxKind::MiningReward),
            other => Err(serde::de::Error::custom(format!(
                "unknown transaction type tag {other}"
            ))),
        }
    }
}

/// Field names (including the historical `signiture` spelling) are part
/// of the serialized form and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub id: u64,
    /// Empty for mining rewards.
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
    /// Always 0 for mining rewards.
    pub fee: f64,
    pub timestamp: u64,
    /// DER signature as hex; empty for mining rewards.
    #[serde(rename = "signiture")]
    pub signature: String,
    pub hash: String,
}

impl Transaction {
    /// Builds and signs a transfer from `sender` (which must hold a
    /// private key) to the `recipient` address.
    pub fn new_transfer(
        amount: f64,
        fee: f64,
        sender: &KeyPair,
        recipient: &str,
    ) -> Result<Self> {
        let mut tx = Self {
            kind: TxKind::Transfer,
            id: rand::random::<u64>(),
            sender: sender.public_key_hex(),
            recipient: recipient.to_string(),
            amount,
            fee,
            timestamp: timestamp_now(),
            signature: String::new(),
            hash: String::new(),
        };

        tx.hash = tx.generate_hash()?;
        tx.sign_with(sender)?;
        Ok(tx)
    }

    /// Builds the reward transaction a miner appends to its block. No
    /// sender, no fee, no signature.
    pub fn new_reward(amount: f64, recipient: &str) -> Result<Self> {
        let mut tx = Self {
            kind: TxKind::MiningReward,
            id: rand::random::<u64>(),
            sender: String::new(),
            recipient: recipient.to_string(),
            amount,
            fee: 0.0,
            timestamp: timestamp_now(),
            signature: String::new(),
            hash: String::new(),
        };

        tx.hash = tx.generate_hash()?;
        Ok(tx)
    }

    /// Canonical data string hashed and signed. Uses the language's
    /// default decimal formatting; the exact renderings are pinned by
    /// fixture tests below.
    pub fn data_string(&self) -> String {
        format!(
            "{}{}{}{}{}",
            self.id, self.amount, self.timestamp, self.sender, self.recipient
        )
    }

    /// `hex_upper(sha256(sha256(data)))` followed by the uppercase hex
    /// timestamp tag that lets chain scans skip older blocks.
    pub fn generate_hash(&self) -> Result<String> {
        let inner = sha256(self.data_string().as_bytes())?;
        let outer = sha256(&inner)?;
        Ok(format!("{}{:X}", hex_upper(&outer), self.timestamp))
    }

    /// Signs the first 32 bytes of the transaction hash with the given
    /// key pair and stores the DER signature as hex.
    pub fn sign_with(&mut self, keys: &KeyPair) -> Result<()> {
        let digest = self.digest_bytes()?;
        let signature = keys.sign(&digest)?;
        self.signature = hex::encode(signature);
        Ok(())
    }

    /// Checks the transaction against its own invariants: the stored
    /// hash must match the data, and for transfers the signature must
    /// verify under the sender address.
    pub fn verify(&self) -> Result<()> {
        if self.kind == TxKind::MiningReward {
            return Ok(());
        }

        if self.sender.is_empty() {
            return Err(ErrorCode::EcdsaPublicKeyRequired);
        }

        if self.generate_hash()? != self.hash {
            return Err(ErrorCode::TransactionHashInvalid);
        }

        let public_key = KeyPair::from_public_hex(&self.sender)?;
        let signature =
            hex::decode(&self.signature).map_err(|_| ErrorCode::SignitureInvalid)?;

        public_key.verify(&self.digest_bytes()?, &signature)
    }

    /// Timestamp parsed back out of the tag portion of a hash string.
    pub fn parse_timestamp_tag(hash: &str) -> Result<u64> {
        if hash.len() <= TX_DIGEST_HEX_LEN {
            return Err(ErrorCode::TransactionHashInvalid);
        }

        u64::from_str_radix(&hash[TX_DIGEST_HEX_LEN..], 16)
            .map_err(|_| ErrorCode::TransactionHashInvalid)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("transaction serializes")
    }

    /// Raw 32 content-digest bytes of the stored hash; the message the
    /// signature covers.
    fn digest_bytes(&self) -> Result<Vec<u8>> {
        let recomputed = self.generate_hash()?;
        hex::decode(&recomputed[..TX_DIGEST_HEX_LEN])
            .map_err(|_| ErrorCode::TransactionHashInvalid)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
