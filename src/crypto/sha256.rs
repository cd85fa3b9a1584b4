use sha2::{Digest, Sha256};

use crate::error::{ErrorCode, Result};

/// SHA-256 digest of `message`. Rejects empty input; every digest in the
/// protocol is taken over non-empty canonical strings.
pub fn sha256(message: &[u8]) -> Result<[u8; 32]> {
    if message.is_empty() {
        return Err(ErrorCode::MessageEmpty);
    }

    let mut hasher = Sha256::new();
    hasher.update(message);
    let digest = hasher.finalize();

    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Ok(out)
}

/// Digest rendered as the 64 uppercase hex characters used for block and
/// transaction identities.
pub fn sha256_hex_upper(message: &[u8]) -> Result<String> {
    Ok(hex_upper(&sha256(message)?))
}

/// Uppercase hex form of arbitrary bytes.
pub fn hex_upper(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}
