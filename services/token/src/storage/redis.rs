//! Redis-backed session store.
//!
//! Layout:
//! - `refresh_session:{id}` holds the JSON row, expiring with the session.
//! - `refresh_session_user:{user}` holds the id of the user's live session
//!   and is taken with `SET NX` before the row is written, so a second
//!   concurrent issuance for the same user is rejected by Redis itself.

use crate::refresh::{RefreshSession, SessionId};
use crate::storage::{SessionStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use tracing::warn;

const SESSION_PREFIX: &str = "refresh_session:";
const USER_PREFIX: &str = "refresh_session_user:";

/// Delete the user guard only if it still points at the given session.
const RELEASE_USER_GUARD: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
";

pub struct RedisSessionStore {
    conn: ConnectionManager,
    release_guard: Script,
}

impl RedisSessionStore {
    pub async fn new(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url).map_err(backend)?;
        let conn = ConnectionManager::new(client).await.map_err(backend)?;
        Ok(Self::with_connection(conn))
    }

    pub fn with_connection(conn: ConnectionManager) -> Self {
        RedisSessionStore {
            conn,
            release_guard: Script::new(RELEASE_USER_GUARD),
        }
    }

    async fn release_user_guard(
        &self,
        conn: &mut ConnectionManager,
        user_id: &str,
        session_id: &SessionId,
    ) -> Result<(), StoreError> {
        let _released: i64 = self
            .release_guard
            .key(user_key(user_id))
            .arg(session_id.as_str())
            .invoke_async(conn)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn save(&self, session: &RefreshSession) -> Result<(), StoreError> {
        let ttl = expiry_seconds(session, Utc::now()).ok_or_else(|| {
            StoreError::Backend("refusing to store an already expired session".to_string())
        })?;
        let value =
            serde_json::to_string(session).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut conn = self.conn.clone();

        let guard: Option<String> = redis::cmd("SET")
            .arg(user_key(&session.user_id))
            .arg(session.session_id.as_str())
            .arg("NX")
            .arg("EX")
            .arg(ttl)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        if guard.is_none() {
            return Err(StoreError::Conflict);
        }

        let stored: Result<Option<String>, redis::RedisError> = redis::cmd("SET")
            .arg(session_key(&session.session_id))
            .arg(&value)
            .arg("NX")
            .arg("EX")
            .arg(ttl)
            .query_async(&mut conn)
            .await;

        let outcome = match stored {
            Ok(Some(_)) => return Ok(()),
            Ok(None) => StoreError::Conflict,
            Err(e) => backend(e),
        };

        if let Err(e) = self
            .release_user_guard(&mut conn, &session.user_id, &session.session_id)
            .await
        {
            warn!(
                user_id = %session.user_id,
                error = %e,
                "Failed to release user guard after aborted save"
            );
        }
        Err(outcome)
    }

    async fn get_by_id(&self, session_id: &SessionId) -> Result<Option<RefreshSession>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(session_key(session_id)).await.map_err(backend)?;

        value
            .map(|v| {
                serde_json::from_str(&v).map_err(|e| StoreError::Serialization(e.to_string()))
            })
            .transpose()
    }

    async fn delete_by_id(&self, session_id: &SessionId) -> Result<(), StoreError> {
        let existing = self.get_by_id(session_id).await?;
        let mut conn = self.conn.clone();

        let _removed: i64 = conn.del(session_key(session_id)).await.map_err(backend)?;

        if let Some(session) = existing {
            self.release_user_guard(&mut conn, &session.user_id, session_id)
                .await?;
        }
        Ok(())
    }

    async fn exists_for_user(&self, user_id: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        conn.exists(user_key(user_id)).await.map_err(backend)
    }
}

fn session_key(session_id: &SessionId) -> String {
    format!("{SESSION_PREFIX}{session_id}")
}

fn user_key(user_id: &str) -> String {
    format!("{USER_PREFIX}{user_id}")
}

/// Whole seconds until expiry, rounded up; `None` once expired.
fn expiry_seconds(session: &RefreshSession, now: DateTime<Utc>) -> Option<u64> {
    session.remaining_ttl(now).map(|remaining| {
        let secs = remaining.as_secs();
        if remaining.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    })
}

fn backend(err: redis::RedisError) -> StoreError {
    StoreError::Backend(err.to_string())
}
