//! Crate root.

pub mod blockchain;
pub mod config;
pub mod consensus;
pub mod crypto;
pub mod error;
pub mod network;
pub mod node;

pub use blockchain::{Block, Chain, Mempool, Transaction, TxKind};
pub use config::NetworkType;
pub use crypto::KeyPair;
pub use error::{ErrorCode, Result};
pub use node::{Node, NodeType, Peer, ResponseValue};
