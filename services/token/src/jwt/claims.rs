use serde::{Deserialize, Serialize};

/// Identity carried by both token kinds.
///
/// Access tokens populate every field; refresh tokens carry only the
/// session correlation id, so `sub` and `source_address` are `None` there.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_address: Option<String>,
    pub session_id: String,
}

impl IdentityClaims {
    /// Claims for a short-lived access token.
    pub fn access(
        user_id: impl Into<String>,
        source_address: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        IdentityClaims {
            sub: Some(user_id.into()),
            source_address: Some(source_address.into()),
            session_id: session_id.into(),
        }
    }

    /// Claims for a long-lived refresh token.
    pub fn refresh(session_id: impl Into<String>) -> Self {
        IdentityClaims {
            sub: None,
            source_address: None,
            session_id: session_id.into(),
        }
    }

    pub fn is_refresh(&self) -> bool {
        self.sub.is_none() && self.source_address.is_none()
    }
}

/// Signed claim envelope: identity plus NumericDate timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(flatten)]
    pub identity: IdentityClaims,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn subject(&self) -> Option<&str> {
        self.identity.sub.as_deref()
    }

    pub fn source_address(&self) -> Option<&str> {
        self.identity.source_address.as_deref()
    }

    pub fn session_id(&self) -> &str {
        &self.identity.session_id
    }

    /// `exp` must lie strictly after `iat`.
    pub fn has_valid_lifetime(&self) -> bool {
        self.exp > self.iat
    }
}
