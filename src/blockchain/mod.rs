pub mod block;
pub mod chain;
pub mod mempool;
pub mod reward;
pub mod transaction;

pub use block::Block;
pub use chain::Chain;
pub use mempool::Mempool;
pub use transaction::{Transaction, TxKind};
