//! Rotation Engine: issuance and single-use refresh of token pairs.
//!
//! The engine holds no session state of its own. Every call rehydrates
//! from the [`SessionStore`], and every store call is bounded by the
//! configured store deadline.

use crate::alert::{AddressMismatch, AlertSink};
use crate::error::RotationError;
use crate::jwt::{IdentityClaims, TokenCodec};
use crate::metrics;
use crate::refresh::{RefreshSession, SecretDigest, SessionId, TokenPair};
use crate::storage::{SessionStore, StoreError};
use chrono::{DateTime, SubsecRound, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationSettings {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Deadline for each individual store call
    pub store_timeout: Duration,
    /// Deadline for one alert delivery, retries included
    pub alert_timeout: Duration,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            access_ttl: Duration::from_secs(900),
            refresh_ttl: Duration::from_secs(86_400),
            store_timeout: Duration::from_secs(2),
            alert_timeout: Duration::from_secs(10),
        }
    }
}

/// Result of an issuance request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issuance {
    Issued(TokenPair),
    /// The user already holds a live session; nothing was issued.
    AlreadyActive,
}

pub struct RotationEngine {
    codec: Arc<TokenCodec>,
    store: Arc<dyn SessionStore>,
    alerts: Arc<dyn AlertSink>,
    settings: RotationSettings,
}

impl RotationEngine {
    pub fn new(
        codec: Arc<TokenCodec>,
        store: Arc<dyn SessionStore>,
        alerts: Arc<dyn AlertSink>,
        settings: RotationSettings,
    ) -> Self {
        RotationEngine {
            codec,
            store,
            alerts,
            settings,
        }
    }

    /// Issue a fresh pair unless the user already holds a live session.
    pub async fn issue(
        &self,
        user_id: &str,
        source_address: &str,
    ) -> Result<Issuance, RotationError> {
        let result = self.issue_session(user_id, source_address).await;
        metrics::record_issuance(match &result {
            Ok(Issuance::Issued(_)) => "issued",
            Ok(Issuance::AlreadyActive) => "conflict",
            Err(_) => "error",
        });
        result
    }

    /// Redeem a refresh token for a new pair, consuming its session.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        source_address: &str,
    ) -> Result<TokenPair, RotationError> {
        let result = self.rotate(refresh_token, source_address).await;
        metrics::record_refresh(match &result {
            Ok(_) => "success",
            Err(e) => e.code(),
        });
        result
    }

    async fn issue_session(
        &self,
        user_id: &str,
        source_address: &str,
    ) -> Result<Issuance, RotationError> {
        let exists = self
            .bounded("exists_for_user", self.store.exists_for_user(user_id))
            .await
            .map_err(|e| store_failure("exists_for_user", e))?;
        if exists {
            warn!(user_id = %user_id, "Issuance refused: live session already exists");
            return Ok(Issuance::AlreadyActive);
        }

        let session_id = SessionId::generate();
        // Whole seconds so the row expires together with the token.
        let now = Utc::now().trunc_subsecs(0);

        let access_token = self.codec.sign_at(
            IdentityClaims::access(user_id, source_address, session_id.as_str()),
            now,
            self.settings.access_ttl,
        )?;
        let refresh_token = self.codec.sign_at(
            IdentityClaims::refresh(session_id.as_str()),
            now,
            self.settings.refresh_ttl,
        )?;

        let session = RefreshSession {
            session_id: session_id.clone(),
            user_id: user_id.to_string(),
            token_digest: SecretDigest::digest(&refresh_token),
            source_address: source_address.to_string(),
            created_at: now,
            expires_at: now + whole_seconds(self.settings.refresh_ttl)?,
        };

        match self.bounded("save", self.store.save(&session)).await {
            Ok(()) => {}
            Err(StoreError::Conflict) => {
                warn!(user_id = %user_id, "Issuance lost a race with a concurrent session");
                return Ok(Issuance::AlreadyActive);
            }
            Err(e) => return Err(store_failure("save", e)),
        }

        metrics::record_token_issued("access");
        metrics::record_token_issued("refresh");
        info!(user_id = %user_id, session_id = %session_id, "Issued token pair");

        Ok(Issuance::Issued(TokenPair {
            access_token,
            refresh_token,
        }))
    }

    async fn rotate(
        &self,
        refresh_token: &str,
        source_address: &str,
    ) -> Result<TokenPair, RotationError> {
        // Nothing touches the store before the token itself checks out.
        let claims = self.codec.verify(refresh_token).map_err(|e| {
            debug!(error = %e, "Refresh token rejected");
            RotationError::from(e)
        })?;
        let session_id = SessionId::from(claims.session_id());

        let session = self
            .bounded("get_by_id", self.store.get_by_id(&session_id))
            .await
            .map_err(|e| store_failure("get_by_id", e))?
            .ok_or_else(|| {
                debug!(session_id = %session_id, "No session for refresh token");
                RotationError::SessionNotFound
            })?;

        match SecretDigest::matches(&session.token_digest, refresh_token) {
            Ok(true) => {}
            Ok(false) => {
                metrics::record_security_event("token_mismatch");
                warn!(
                    session_id = %session.session_id,
                    user_id = %session.user_id,
                    "Refresh token does not match its session"
                );
                return Err(RotationError::TokenMismatch);
            }
            Err(e) => {
                metrics::record_security_event("digest_corrupt");
                error!(
                    session_id = %session.session_id,
                    error = %e,
                    "Stored token digest is corrupt"
                );
                return Err(e.into());
            }
        }

        let now = Utc::now();
        if session.is_expired_at(now) {
            if let Err(e) = self
                .bounded("delete_by_id", self.store.delete_by_id(&session.session_id))
                .await
            {
                error!(
                    session_id = %session.session_id,
                    error = %e,
                    "Failed to delete expired session"
                );
            }
            info!(session_id = %session.session_id, "Refresh session expired");
            return Err(RotationError::SessionExpired);
        }

        if session.source_address != source_address {
            self.report_address_mismatch(&session, source_address, now);
        }

        // Old row goes first: a failure below leaves zero sessions, never two.
        self.bounded("delete_by_id", self.store.delete_by_id(&session.session_id))
            .await
            .map_err(|e| store_failure("delete_by_id", e))?;

        match self.issue_session(&session.user_id, source_address).await? {
            Issuance::Issued(pair) => {
                info!(
                    user_id = %session.user_id,
                    previous_session_id = %session.session_id,
                    "Rotated refresh session"
                );
                Ok(pair)
            }
            Issuance::AlreadyActive => {
                warn!(
                    user_id = %session.user_id,
                    "Rotation blocked by a concurrently issued session"
                );
                Err(RotationError::Conflict)
            }
        }
    }

    /// Fire-and-forget: the alert is delivered on its own task.
    fn report_address_mismatch(
        &self,
        session: &RefreshSession,
        current_address: &str,
        detected_at: DateTime<Utc>,
    ) {
        metrics::record_security_event("address_mismatch");
        warn!(
            user_id = %session.user_id,
            session_id = %session.session_id,
            stored_address = %session.source_address,
            current_address = %current_address,
            "Refresh from a different address than the session was created from"
        );

        let alert = AddressMismatch {
            user_id: session.user_id.clone(),
            session_id: session.session_id.to_string(),
            stored_address: session.source_address.clone(),
            current_address: current_address.to_string(),
            detected_at,
        };
        let sink = Arc::clone(&self.alerts);
        let deadline = self.settings.alert_timeout;

        tokio::spawn(async move {
            let body = alert.body();
            match tokio::time::timeout(deadline, sink.send(alert.subject(), &body)).await {
                Ok(Ok(())) => metrics::record_alert_delivery("sent"),
                Ok(Err(e)) => {
                    metrics::record_alert_delivery("failed");
                    error!(user_id = %alert.user_id, error = %e, "Alert delivery failed");
                }
                Err(_) => {
                    metrics::record_alert_delivery("timed_out");
                    error!(
                        user_id = %alert.user_id,
                        timeout_ms = deadline.as_millis() as u64,
                        "Alert delivery timed out"
                    );
                }
            }
        });
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let started = Instant::now();
        let result = tokio::time::timeout(self.settings.store_timeout, call)
            .await
            .unwrap_or(Err(StoreError::Timeout(operation)));
        metrics::record_store_latency(operation, started.elapsed().as_secs_f64());
        result
    }
}

fn store_failure(operation: &'static str, err: StoreError) -> RotationError {
    error!(operation, error = %err, "Session store call failed");
    RotationError::from(err)
}

fn whole_seconds(ttl: Duration) -> Result<chrono::Duration, RotationError> {
    i64::try_from(ttl.as_secs())
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| RotationError::internal("refresh TTL out of range"))
}
