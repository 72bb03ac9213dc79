//! Best-effort anomaly notifications.
//!
//! Delivery failures are reported to the caller as [`AlertError`] but the
//! rotation engine never lets them fail a request.

pub mod smtp;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use smtp::SmtpAlertSink;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlertError {
    #[error("Alert sink misconfigured: {0}")]
    Configuration(String),

    #[error("Alert delivery failed: {0}")]
    Delivery(String),
}

/// Notification channel for security events.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), AlertError>;
}

/// A refresh presented from a different address than the session was
/// created from.
///
/// Carries identifiers only; bearer tokens never appear in alerts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressMismatch {
    pub user_id: String,
    pub session_id: String,
    pub stored_address: String,
    pub current_address: String,
    pub detected_at: DateTime<Utc>,
}

impl AddressMismatch {
    pub const SUBJECT: &'static str = "Security alert: refresh from a new address";

    pub fn subject(&self) -> &'static str {
        Self::SUBJECT
    }

    pub fn body(&self) -> String {
        format!(
            "A refresh token was redeemed from an address that differs from the one \
             recorded when the session was created.\n\n\
             User: {}\n\
             Session: {}\n\
             Recorded address: {}\n\
             Current address: {}\n\
             Detected at: {}\n\n\
             The session was rotated. If this was not expected, the user's \
             credentials may be compromised.",
            self.user_id,
            self.session_id,
            self.stored_address,
            self.current_address,
            self.detected_at.to_rfc3339(),
        )
    }
}
