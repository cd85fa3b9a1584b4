use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum NetworkType {
    #[default]
    Mainnet,
    Testnet,
}

impl NetworkType {
    /// 64-bit network magic; messages carrying a different id are
    /// silently dropped by every node on this network.
    pub fn network_id(&self) -> u64 {
        match self {
            NetworkType::Mainnet => 0x5F2C_7813_16C7_5688,
            NetworkType::Testnet => 0x05D7_3FF5_5BB7_7E55,
        }
    }

    /// Both networks share the well-known node port; the type exists so
    /// the two magics cannot be mixed up at call sites.
    pub fn default_port(&self) -> u16 {
        match self {
            NetworkType::Mainnet => 60000,
            NetworkType::Testnet => 60000,
        }
    }
}

/* ------------------------- Protocol constants -------------------------
   These mirror the economics and limits used across `blockchain` and
   `consensus`:

   - at most 20 transactions per mined block (excluding the reward)
   - mempool entries expire 600 seconds after their timestamp
   - reward decays from 75 by a factor of 1.5 every 3,435,000 blocks,
     with a floor of 0.3 (see blockchain::reward)
--------------------------------------------------------------------- */

pub const MAX_TRANSACTIONS_PER_BLOCK: usize = 20;

pub const RECOMMENDED_TRANSACTION_FEE: f64 = 0.5;

/// Seconds a pending transaction stays admissible after its timestamp.
pub const TRANSACTION_EXPIRY_SECS: u64 = 600;

/// Outbound connect retries made before a peer request gives up.
pub const PEER_CONNECT_ATTEMPTS: usize = 3;

// ----- Genesis block constants -----

pub const GENESIS_INDEX: u32 = 0;
pub const GENESIS_PREVIOUS_HASH: &str = "";
pub const GENESIS_DIFFICULTY: u64 = 0;
pub const GENESIS_TIMESTAMP: u64 = 1_638_318_078;
pub const GENESIS_HASH: &str =
    "AC7FDA5E0E2BF8B6600D4AFAC9C6095E89E9C14B30BC4A114FAB090BCAFADC79";

/// Seconds since epoch. The protocol's only clock; block and transaction
/// timestamps are produced here.
pub fn timestamp_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs()
}

/// Runtime configuration for the node binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub network: NetworkType,
    pub port: u16,
    pub guid: u64,
    /// IPv4 of a peer to dial on startup, if any.
    pub initial_peer: Option<String>,
    /// How often the node flush loop ticks, in milliseconds.
    pub flush_interval_ms: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: NetworkType::Mainnet,
            port: NetworkType::Mainnet.default_port(),
            guid: 0,
            initial_peer: None,
            flush_interval_ms: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_magics_differ() {
        assert_ne!(
            NetworkType::Mainnet.network_id(),
            NetworkType::Testnet.network_id()
        );
        assert_eq!(NetworkType::Mainnet.network_id(), 0x5F2C_7813_16C7_5688);
        assert_eq!(NetworkType::Testnet.network_id(), 0x05D7_3FF5_5BB7_7E55);
    }

    #[test]
    fn genesis_constants_pinned() {
        assert_eq!(GENESIS_INDEX, 0);
        assert_eq!(GENESIS_PREVIOUS_HASH, "");
        assert_eq!(GENESIS_DIFFICULTY, 0);
        assert_eq!(GENESIS_TIMESTAMP, 1_638_318_078);
        assert_eq!(GENESIS_HASH.len(), 64);
    }

    #[test]
    fn timestamps_are_monotonic_enough() {
        let a = timestamp_now();
        let b = timestamp_now();
        assert!(b >= a);
    }
}
