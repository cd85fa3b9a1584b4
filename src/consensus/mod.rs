pub mod hash_rate;
pub mod pow;

pub use hash_rate::{default_meter, HashRateMeter};
pub use pow::{create_block, mine_block, mine_next_block};
