use crate::jwt::CodecError;
use crate::refresh::DigestError;
use crate::storage::StoreError;
use axum::http::StatusCode;
use thiserror::Error;

/// Failures of the issue/refresh protocol.
///
/// Everything except `Internal` is attributable to the presented token or
/// the user's session state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RotationError {
    #[error("Refresh token invalid")]
    InvalidToken,

    #[error("Refresh token expired")]
    TokenExpired,

    #[error("Refresh session not found")]
    SessionNotFound,

    #[error("Refresh token does not match its session")]
    TokenMismatch,

    #[error("Refresh session expired")]
    SessionExpired,

    #[error("A live session already exists for this user")]
    Conflict,

    #[error("Internal error: {0}")]
    Internal(String),
}

// Error codes for HTTP responses
pub const TOKEN_REFRESH_INVALID: &str = "TOKEN_REFRESH_INVALID";
pub const TOKEN_REFRESH_EXPIRED: &str = "TOKEN_REFRESH_EXPIRED";
pub const SESSION_NOT_FOUND: &str = "SESSION_NOT_FOUND";
pub const TOKEN_MISMATCH: &str = "TOKEN_MISMATCH";
pub const SESSION_EXPIRED: &str = "SESSION_EXPIRED";
pub const SESSION_CONFLICT: &str = "SESSION_CONFLICT";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

impl RotationError {
    pub fn internal(msg: impl Into<String>) -> Self {
        RotationError::Internal(msg.into())
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            RotationError::InvalidToken => TOKEN_REFRESH_INVALID,
            RotationError::TokenExpired => TOKEN_REFRESH_EXPIRED,
            RotationError::SessionNotFound => SESSION_NOT_FOUND,
            RotationError::TokenMismatch => TOKEN_MISMATCH,
            RotationError::SessionExpired => SESSION_EXPIRED,
            RotationError::Conflict => SESSION_CONFLICT,
            RotationError::Internal(_) => INTERNAL_ERROR,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RotationError::InvalidToken
            | RotationError::TokenExpired
            | RotationError::SessionNotFound
            | RotationError::TokenMismatch
            | RotationError::SessionExpired => StatusCode::UNAUTHORIZED,
            RotationError::Conflict => StatusCode::CONFLICT,
            RotationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing text; never includes internal detail.
    pub fn public_message(&self) -> String {
        match self {
            RotationError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<CodecError> for RotationError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::InvalidSignature => RotationError::InvalidToken,
            CodecError::Expired => RotationError::TokenExpired,
            other => RotationError::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for RotationError {
    fn from(err: StoreError) -> Self {
        RotationError::Internal(err.to_string())
    }
}

impl From<DigestError> for RotationError {
    fn from(err: DigestError) -> Self {
        RotationError::Internal(err.to_string())
    }
}

/// Start-up configuration failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required variable {0}")]
    Missing(&'static str),

    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_errors_classified() {
        assert_eq!(
            RotationError::from(CodecError::InvalidSignature),
            RotationError::InvalidToken
        );
        assert_eq!(RotationError::from(CodecError::Expired), RotationError::TokenExpired);
        assert!(matches!(
            RotationError::from(CodecError::InvalidTtl),
            RotationError::Internal(_)
        ));
    }

    #[test]
    fn test_store_and_digest_errors_are_internal() {
        assert!(matches!(
            RotationError::from(StoreError::Timeout("save")),
            RotationError::Internal(_)
        ));
        assert!(matches!(
            RotationError::from(DigestError::Malformed("zz".to_string())),
            RotationError::Internal(_)
        ));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(RotationError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(RotationError::SessionExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(RotationError::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            RotationError::internal("redis down").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_detail_not_public() {
        let err = RotationError::internal("redis://secret-host refused");
        assert_eq!(err.code(), INTERNAL_ERROR);
        assert!(!err.public_message().contains("secret-host"));
        assert_eq!(RotationError::TokenMismatch.code(), TOKEN_MISMATCH);
    }
}
