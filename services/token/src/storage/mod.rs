//! Refresh session persistence.
//!
//! The rotation engine only sees the [`SessionStore`] capability; any
//! implementation honouring its contract is interchangeable.

pub mod memory;
pub mod redis;

use crate::refresh::{RefreshSession, SessionId};
use async_trait::async_trait;
use thiserror::Error;

pub use memory::InMemorySessionStore;
pub use self::redis::RedisSessionStore;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A live session already exists for the user (or the id is taken).
    #[error("Session conflicts with an existing live session")]
    Conflict,

    #[error("Store operation {0} timed out")]
    Timeout(&'static str),

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Session serialization error: {0}")]
    Serialization(String),
}

/// Persistence contract for refresh sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session.
    ///
    /// Must fail with [`StoreError::Conflict`] when a live session already
    /// exists for `session.user_id`; this is what makes concurrent issuance
    /// for one user safe.
    async fn save(&self, session: &RefreshSession) -> Result<(), StoreError>;

    async fn get_by_id(&self, session_id: &SessionId) -> Result<Option<RefreshSession>, StoreError>;

    /// Remove a session. Deleting an absent id is not an error.
    async fn delete_by_id(&self, session_id: &SessionId) -> Result<(), StoreError>;

    /// Whether the user currently holds a live (unexpired) session.
    async fn exists_for_user(&self, user_id: &str) -> Result<bool, StoreError>;
}
