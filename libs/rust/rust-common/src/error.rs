//! Platform error type shared by the auth-platform services.
//!
//! Errors raised while talking to an outbound dependency (mail relay,
//! key-value store, ...) are funnelled through [`PlatformError`] so that
//! the retry machinery can decide, from the variant alone, whether another
//! attempt is worthwhile.

use std::time::Duration;
use thiserror::Error;

/// Common error type for outbound platform operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Dependency is temporarily unavailable (connection refused, 4xx-class
    /// transient SMTP reply, ...).
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The dependency rejected the request permanently.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Operation did not finish within its deadline.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl PlatformError {
    /// Check if this error is retryable.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_common::PlatformError;
    ///
    /// let err = PlatformError::unavailable("relay busy");
    /// assert!(err.is_retryable());
    ///
    /// let err = PlatformError::rejected("mailbox unknown");
    /// assert!(!err.is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }

    /// Create an unavailable error with the given message.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a permanent rejection error with the given message.
    #[must_use]
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}
