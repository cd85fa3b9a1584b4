pub mod ecdsa;
pub mod sha256;

pub use ecdsa::KeyPair;
pub use sha256::{sha256, sha256_hex_upper};
