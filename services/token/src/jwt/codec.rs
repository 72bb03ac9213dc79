//! Token Codec: HS512 signing and verification of identity claims.
//!
//! One shared secret signs both token kinds. Verification distinguishes
//! forged or malformed input ([`CodecError::InvalidSignature`]) from an
//! honest token that has simply run out ([`CodecError::Expired`]); the
//! signature is always checked before the expiry, so a forged token never
//! reports as expired.

use crate::jwt::claims::{Claims, IdentityClaims};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::Duration;
use thiserror::Error;

/// The only algorithm this codec produces or accepts.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS512;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Bad signature, unexpected algorithm, or unparseable token.
    #[error("Token signature invalid")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,

    #[error("Token lifetime must be at least one second")]
    InvalidTtl,

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iat"]);

        TokenCodec {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign `claims` with `iat = now` and `exp = now + ttl`.
    pub fn sign(&self, claims: IdentityClaims, ttl: Duration) -> Result<String, CodecError> {
        self.sign_at(claims, Utc::now(), ttl)
    }

    /// Sign `claims` as if issued at `issued_at`.
    pub fn sign_at(
        &self,
        claims: IdentityClaims,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, CodecError> {
        let ttl_secs = i64::try_from(ttl.as_secs()).map_err(|_| CodecError::InvalidTtl)?;
        if ttl_secs < 1 {
            return Err(CodecError::InvalidTtl);
        }

        let iat = issued_at.timestamp();
        let exp = iat.checked_add(ttl_secs).ok_or(CodecError::InvalidTtl)?;
        let claims = Claims {
            identity: claims,
            iat,
            exp,
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| CodecError::Encoding(e.to_string()))
    }

    /// Verify signature, algorithm and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, CodecError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => CodecError::Expired,
                _ => CodecError::InvalidSignature,
            }
        })?;

        if !data.claims.has_valid_lifetime() {
            return Err(CodecError::InvalidSignature);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"unit-test-secret-for-the-token-codec";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET)
    }

    #[test]
    fn test_sign_then_verify_access_token() {
        let token = codec()
            .sign(IdentityClaims::access("user-1", "10.1.2.3", "sess"), Duration::from_secs(60))
            .unwrap();

        let claims = codec().verify(&token).unwrap();
        assert_eq!(claims.subject(), Some("user-1"));
        assert_eq!(claims.source_address(), Some("10.1.2.3"));
        assert_eq!(claims.session_id(), "sess");
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn test_header_advertises_hs512() {
        let token = codec()
            .sign(IdentityClaims::refresh("sess"), Duration::from_secs(60))
            .unwrap();
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS512);
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let result = codec().sign(IdentityClaims::refresh("sess"), Duration::from_millis(999));
        assert_eq!(result, Err(CodecError::InvalidTtl));
    }

    #[test]
    fn test_expired_token_reports_expired() {
        let issued = Utc::now() - chrono::Duration::hours(2);
        let token = codec()
            .sign_at(IdentityClaims::refresh("sess"), issued, Duration::from_secs(3600))
            .unwrap();

        assert_eq!(codec().verify(&token), Err(CodecError::Expired));
    }

    #[test]
    fn test_expired_forgery_reports_invalid_signature() {
        let issued = Utc::now() - chrono::Duration::hours(2);
        let forged = TokenCodec::new(b"someone-else")
            .sign_at(IdentityClaims::refresh("sess"), issued, Duration::from_secs(3600))
            .unwrap();

        assert_eq!(codec().verify(&forged), Err(CodecError::InvalidSignature));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            identity: IdentityClaims::refresh("sess"),
            iat: now,
            exp: now + 600,
        };
        let hs256 = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(codec().verify(&hs256), Err(CodecError::InvalidSignature));
    }

    #[test]
    fn test_exp_not_after_iat_rejected() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            identity: IdentityClaims::refresh("sess"),
            iat: now + 600,
            exp: now + 600,
        };
        let token = encode(
            &Header::new(SIGNING_ALGORITHM),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(codec().verify(&token), Err(CodecError::InvalidSignature));
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(codec().verify("not-a-token"), Err(CodecError::InvalidSignature));
        assert_eq!(codec().verify(""), Err(CodecError::InvalidSignature));
    }
}
