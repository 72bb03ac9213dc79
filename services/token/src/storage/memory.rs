//! Process-local session store.
//!
//! Suitable for single-node deployments and tests. The one-live-session
//! per user rule is checked and applied under a single write lock.

use crate::refresh::{RefreshSession, SessionId};
use crate::storage::{SessionStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
    sessions: HashMap<SessionId, RefreshSession>,
    by_user: HashMap<String, SessionId>,
}

impl MemoryState {
    fn remove(&mut self, session_id: &SessionId) -> Option<RefreshSession> {
        let removed = self.sessions.remove(session_id)?;
        if self.by_user.get(&removed.user_id) == Some(session_id) {
            self.by_user.remove(&removed.user_id);
        }
        Some(removed)
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    state: RwLock<MemoryState>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, live or not.
    pub async fn len(&self) -> usize {
        self.state.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Rows stored for one user, live or not.
    pub async fn count_for_user(&self, user_id: &str) -> usize {
        self.state
            .read()
            .await
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .count()
    }

    /// Drop every expired row; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut state = self.state.write().await;
        let expired: Vec<SessionId> = state
            .sessions
            .values()
            .filter(|s| s.is_expired_at(now))
            .map(|s| s.session_id.clone())
            .collect();
        for id in &expired {
            state.remove(id);
        }
        expired.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, session: &RefreshSession) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut state = self.state.write().await;

        if state.sessions.contains_key(&session.session_id) {
            return Err(StoreError::Conflict);
        }

        if let Some(existing_id) = state.by_user.get(&session.user_id).cloned() {
            let live = state
                .sessions
                .get(&existing_id)
                .is_some_and(|existing| existing.is_live_at(now));
            if live {
                return Err(StoreError::Conflict);
            }
            // Stale row for this user; the new session replaces it.
            state.remove(&existing_id);
        }

        state
            .by_user
            .insert(session.user_id.clone(), session.session_id.clone());
        state
            .sessions
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn get_by_id(&self, session_id: &SessionId) -> Result<Option<RefreshSession>, StoreError> {
        Ok(self.state.read().await.sessions.get(session_id).cloned())
    }

    async fn delete_by_id(&self, session_id: &SessionId) -> Result<(), StoreError> {
        self.state.write().await.remove(session_id);
        Ok(())
    }

    async fn exists_for_user(&self, user_id: &str) -> Result<bool, StoreError> {
        let now = Utc::now();
        let state = self.state.read().await;
        Ok(state
            .by_user
            .get(user_id)
            .and_then(|id| state.sessions.get(id))
            .is_some_and(|session| session.is_live_at(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn session(user_id: &str, expires_in: chrono::Duration) -> RefreshSession {
        let now = Utc::now();
        RefreshSession {
            session_id: SessionId::generate(),
            user_id: user_id.to_string(),
            token_digest: "1234abcd".to_string(),
            source_address: "10.0.0.1".to_string(),
            created_at: now,
            expires_at: now + expires_in,
        }
    }

    #[tokio::test]
    async fn test_save_get_delete() {
        let store = InMemorySessionStore::new();
        let row = session("user-1", chrono::Duration::hours(1));

        store.save(&row).await.unwrap();
        assert_eq!(store.get_by_id(&row.session_id).await.unwrap(), Some(row.clone()));
        assert!(store.exists_for_user("user-1").await.unwrap());

        store.delete_by_id(&row.session_id).await.unwrap();
        assert_eq!(store.get_by_id(&row.session_id).await.unwrap(), None);
        assert!(!store.exists_for_user("user-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_absent_is_ok() {
        let store = InMemorySessionStore::new();
        assert!(store.delete_by_id(&SessionId::from("missing")).await.is_ok());
    }

    #[tokio::test]
    async fn test_second_live_session_for_user_conflicts() {
        let store = InMemorySessionStore::new();
        store.save(&session("user-1", chrono::Duration::hours(1))).await.unwrap();

        let second = session("user-1", chrono::Duration::hours(1));
        assert_eq!(store.save(&second).await, Err(StoreError::Conflict));
        assert_eq!(store.count_for_user("user-1").await, 1);
    }

    #[tokio::test]
    async fn test_stale_session_is_replaced() {
        let store = InMemorySessionStore::new();
        let stale = session("user-1", chrono::Duration::seconds(-1));
        store.save(&stale).await.unwrap();
        assert!(!store.exists_for_user("user-1").await.unwrap());

        let fresh = session("user-1", chrono::Duration::hours(1));
        store.save(&fresh).await.unwrap();

        assert_eq!(store.get_by_id(&stale.session_id).await.unwrap(), None);
        assert_eq!(store.count_for_user("user-1").await, 1);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = InMemorySessionStore::new();
        store.save(&session("user-1", chrono::Duration::seconds(-1))).await.unwrap();
        store.save(&session("user-2", chrono::Duration::hours(1))).await.unwrap();

        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.exists_for_user("user-2").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_saves_admit_one() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.save(&session("racer", chrono::Duration::hours(1))).await
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(store.count_for_user("racer").await, 1);
    }
}
