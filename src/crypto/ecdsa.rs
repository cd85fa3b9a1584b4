//! secp256k1 key pairs in the network's text form: compressed SEC1
//! points carried as `vpk_`-prefixed lowercase hex, signatures as
//! DER-encoded ECDSA-with-SHA-256.

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::{ErrorCode, Result};

/// ASCII tag every public-key string starts with.
pub const PUBLIC_KEY_PREFIX: &str = "vpk_";

/// Compressed SEC1 point length in hex characters.
const PUBLIC_KEY_HEX_LEN: usize = 66;

/// A secp256k1 key pair. The signing half is optional; pairs built from
/// a public key string alone can only verify.
#[derive(Debug, Clone)]
pub struct KeyPair {
    signing_key: Option<SigningKey>,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generates a fresh key pair from OS randomness.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let verifying_key = *signing_key.verifying_key();

        Self {
            signing_key: Some(signing_key),
            verifying_key,
        }
    }

    /// Builds a pair from the text forms. The public key string is
    /// required; the private key hex may be empty for a verify-only pair.
    pub fn from_keys(public_hex: &str, private_hex: &str) -> Result<Self> {
        let verifying_key = parse_public_key(public_hex)?;

        let signing_key = if private_hex.is_empty() {
            None
        } else {
            let bytes =
                hex::decode(private_hex).map_err(|_| ErrorCode::EcdsaPublicKeyInvalid)?;
            Some(SigningKey::from_slice(&bytes).map_err(|_| ErrorCode::EcdsaPublicKeyInvalid)?)
        };

        Ok(Self {
            signing_key,
            verifying_key,
        })
    }

    /// Verify-only pair from a `vpk_` public key string.
    pub fn from_public_hex(public_hex: &str) -> Result<Self> {
        Self::from_keys(public_hex, "")
    }

    /// `vpk_` followed by the 66 lowercase hex chars of the compressed
    /// point. This string is the address form used across the ledger.
    pub fn public_key_hex(&self) -> String {
        let point = self.verifying_key.to_encoded_point(true);
        format!("{}{}", PUBLIC_KEY_PREFIX, hex::encode(point.as_bytes()))
    }

    /// Lowercase 64-hex big-endian scalar, when this pair can sign.
    pub fn private_key_hex(&self) -> Option<String> {
        self.signing_key
            .as_ref()
            .map(|sk| hex::encode(sk.to_bytes()))
    }

    pub fn has_private_key(&self) -> bool {
        self.signing_key.is_some()
    }

    /// Signs `message` (ECDSA over SHA-256 of the message) and returns
    /// the DER-encoded signature bytes.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signing_key = self
            .signing_key
            .as_ref()
            .ok_or(ErrorCode::EcdsaPrivateKeyRequired)?;

        let signature: Signature = signing_key.sign(message);
        Ok(signature.to_der().as_bytes().to_vec())
    }

    /// Checks a DER signature over `message` against this public key.
    pub fn verify(&self, message: &[u8], signature_der: &[u8]) -> Result<()> {
        let signature =
            Signature::from_der(signature_der).map_err(|_| ErrorCode::SignitureInvalid)?;

        self.verifying_key
            .verify(message, &signature)
            .map_err(|_| ErrorCode::SignitureInvalid)
    }
}

/// Parses the `vpk_`-prefixed compressed-point hex form. The prefix is
/// matched case-insensitively; the emitted form is always lowercase.
fn parse_public_key(public_hex: &str) -> Result<VerifyingKey> {
    if public_hex.len() != PUBLIC_KEY_PREFIX.len() + PUBLIC_KEY_HEX_LEN {
        return Err(ErrorCode::EcdsaPublicKeyInvalid);
    }

    let (prefix, point_hex) = public_hex.split_at(PUBLIC_KEY_PREFIX.len());
    if !prefix.eq_ignore_ascii_case(PUBLIC_KEY_PREFIX) {
        return Err(ErrorCode::EcdsaPublicKeyInvalid);
    }

    let point = hex::decode(point_hex).map_err(|_| ErrorCode::EcdsaPublicKeyInvalid)?;
    VerifyingKey::from_sec1_bytes(&point).map_err(|_| ErrorCode::EcdsaPublicKeyInvalid)
}
