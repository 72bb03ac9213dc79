//! Storage-side fingerprint of refresh tokens.
//!
//! A 64-bit xxHash of the serialized token, rendered as lowercase hex
//! without padding. This is not a password hash: the token's own entropy
//! is what protects the session, the digest only keeps the bearer secret
//! out of the store.

use subtle::ConstantTimeEq;
use thiserror::Error;
use xxhash_rust::xxh64::xxh64;

const DIGEST_SEED: u64 = 0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// The stored value is not a hex-encoded 64-bit integer.
    #[error("Stored digest is malformed: {0:?}")]
    Malformed(String),
}

pub struct SecretDigest;

impl SecretDigest {
    pub fn digest(secret: &str) -> String {
        format!("{:x}", Self::fingerprint(secret))
    }

    /// Compare `candidate` against a stored hex digest.
    ///
    /// `Ok(false)` means the token does not match; `Err` means the stored
    /// value itself is corrupt.
    pub fn matches(stored_digest_hex: &str, candidate: &str) -> Result<bool, DigestError> {
        let stored = parse_stored(stored_digest_hex)?;
        let computed = Self::fingerprint(candidate);
        Ok(stored.ct_eq(&computed).into())
    }

    fn fingerprint(secret: &str) -> u64 {
        xxh64(secret.as_bytes(), DIGEST_SEED)
    }
}

fn parse_stored(value: &str) -> Result<u64, DigestError> {
    let malformed = || DigestError::Malformed(value.to_string());
    if value.is_empty() || value.len() > 16 || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(malformed());
    }
    u64::from_str_radix(value, 16).map_err(|_| malformed())
}
