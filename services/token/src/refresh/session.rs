use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Unguessable refresh session identifier: 128 random bits as 32 hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        let bits: u128 = rand::thread_rng().gen();
        SessionId(format!("{bits:032x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        SessionId(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        SessionId(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted refresh session. Never updated in place: rotation deletes the
/// row and creates a new one under a fresh id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSession {
    pub session_id: SessionId,
    pub user_id: String,
    /// Hex digest of the serialized refresh token, never the token itself.
    pub token_digest: String,
    pub source_address: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshSession {
    /// Live up to and including `expires_at`, the same second the
    /// refresh token's `exp` still verifies.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at >= now
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_live_at(now)
    }

    /// Time left before expiry, `None` once expired.
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Option<Duration> {
        (self.expires_at - now).to_std().ok().filter(|d| !d.is_zero())
    }
}

/// Access/refresh token pair handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_in: chrono::Duration) -> RefreshSession {
        let now = Utc::now();
        RefreshSession {
            session_id: SessionId::generate(),
            user_id: "user-1".to_string(),
            token_digest: "abc".to_string(),
            source_address: "10.0.0.1".to_string(),
            created_at: now,
            expires_at: now + expires_in,
        }
    }

    #[test]
    fn test_session_ids_are_128_bit_hex() {
        let id = SessionId::generate();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(id, SessionId::generate());
    }

    #[test]
    fn test_expiry() {
        let live = session(chrono::Duration::minutes(5));
        assert!(live.is_live_at(Utc::now()));
        assert!(live.remaining_ttl(Utc::now()).is_some());

        let stale = session(chrono::Duration::minutes(-5));
        assert!(stale.is_expired_at(Utc::now()));
        assert_eq!(stale.remaining_ttl(Utc::now()), None);
    }

    #[test]
    fn test_expiry_boundary() {
        let at_boundary = session(chrono::Duration::zero());
        assert!(at_boundary.is_live_at(at_boundary.expires_at));
        assert!(!at_boundary.is_expired_at(at_boundary.expires_at));

        let just_after = at_boundary.expires_at + chrono::Duration::nanoseconds(1);
        assert!(at_boundary.is_expired_at(just_after));
        assert_eq!(at_boundary.remaining_ttl(at_boundary.expires_at), None);
    }

    #[test]
    fn test_serde_keeps_session_id_flat() {
        let row = session(chrono::Duration::minutes(5));
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["session_id"], serde_json::Value::String(row.session_id.to_string()));
        let back: RefreshSession = serde_json::from_value(json).unwrap();
        assert_eq!(back, row);
    }
}
