//! Collaborator doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use test_utils::fixtures::TEST_SIGNING_SECRET;
use tokio::sync::mpsc;
use token_rotation::alert::{AlertError, AlertSink};
use token_rotation::jwt::TokenCodec;
use token_rotation::refresh::{RefreshSession, SessionId};
use token_rotation::storage::{InMemorySessionStore, SessionStore, StoreError};
use token_rotation::{Issuance, RotationEngine, RotationSettings, TokenPair};

pub fn codec() -> Arc<TokenCodec> {
    Arc::new(TokenCodec::new(TEST_SIGNING_SECRET))
}

pub fn settings() -> RotationSettings {
    RotationSettings {
        access_ttl: Duration::from_secs(60),
        refresh_ttl: Duration::from_secs(3600),
        store_timeout: Duration::from_secs(1),
        alert_timeout: Duration::from_secs(1),
    }
}

pub fn engine(store: Arc<dyn SessionStore>, alerts: Arc<dyn AlertSink>) -> RotationEngine {
    RotationEngine::new(codec(), store, alerts, settings())
}

/// Unwrap an issuance that is expected to produce tokens.
pub fn issued(outcome: Issuance) -> TokenPair {
    match outcome {
        Issuance::Issued(pair) => pair,
        Issuance::AlreadyActive => panic!("expected a token pair, got AlreadyActive"),
    }
}

/// Store that fails the test if it is touched at all.
pub struct UntouchableStore;

#[async_trait]
impl SessionStore for UntouchableStore {
    async fn save(&self, _session: &RefreshSession) -> Result<(), StoreError> {
        panic!("store must not be written");
    }

    async fn get_by_id(&self, _id: &SessionId) -> Result<Option<RefreshSession>, StoreError> {
        panic!("store must not be read");
    }

    async fn delete_by_id(&self, _id: &SessionId) -> Result<(), StoreError> {
        panic!("store must not be written");
    }

    async fn exists_for_user(&self, _user_id: &str) -> Result<bool, StoreError> {
        panic!("store must not be read");
    }
}

/// In-memory store with switchable write failures.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: InMemorySessionStore,
    pub fail_save: AtomicBool,
    pub fail_delete: AtomicBool,
    pub reads: AtomicUsize,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionStore for FaultyStore {
    async fn save(&self, session: &RefreshSession) -> Result<(), StoreError> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected save failure".to_string()));
        }
        self.inner.save(session).await
    }

    async fn get_by_id(&self, id: &SessionId) -> Result<Option<RefreshSession>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_id(id).await
    }

    async fn delete_by_id(&self, id: &SessionId) -> Result<(), StoreError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected delete failure".to_string()));
        }
        self.inner.delete_by_id(id).await
    }

    async fn exists_for_user(&self, user_id: &str) -> Result<bool, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.exists_for_user(user_id).await
    }
}

/// A delivered alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentAlert {
    pub subject: String,
    pub body: String,
}

/// Sink that forwards every alert over a channel.
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<SentAlert>,
}

impl RecordingSink {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SentAlert>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(RecordingSink { tx }), rx)
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn send(&self, subject: &str, body: &str) -> Result<(), AlertError> {
        self.tx
            .send(SentAlert {
                subject: subject.to_string(),
                body: body.to_string(),
            })
            .map_err(|e| AlertError::Delivery(e.to_string()))
    }
}

/// Sink whose every delivery fails, counting attempts.
#[derive(Default)]
pub struct FailingSink {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl AlertSink for FailingSink {
    async fn send(&self, _subject: &str, _body: &str) -> Result<(), AlertError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AlertError::Delivery("relay refused".to_string()))
    }
}

/// Sink that takes far longer to deliver than any refresh may wait.
#[derive(Default)]
pub struct SlowSink {
    pub started: AtomicUsize,
}

impl SlowSink {
    pub const DELAY: Duration = Duration::from_secs(5);
}

#[async_trait]
impl AlertSink for SlowSink {
    async fn send(&self, _subject: &str, _body: &str) -> Result<(), AlertError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Self::DELAY).await;
        Ok(())
    }
}

/// Wait for the next alert, giving the spawned delivery task time to run.
pub async fn next_alert(rx: &mut mpsc::UnboundedReceiver<SentAlert>) -> Option<SentAlert> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .ok()
        .flatten()
}
