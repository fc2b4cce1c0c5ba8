// Session storage seam - a trait so the engine never knows whether sessions
// live in memory or in a database.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use super::types::Session;

/// Failures at the storage boundary. The engine propagates these untouched;
/// retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("concurrent update lost for session '{session_id}'")]
    Conflict { session_id: String },

    #[error("session encoding failed: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("session store backend error: {0}")]
    Backend(String),
}

/// Keyed storage for session records.
///
/// `update` must compare the incoming record's `version` against the stored
/// one and refuse stale writes with `StoreError::Conflict`. A successful
/// write bumps `version` and `updated_at`. This is the optimistic backstop
/// under the engine's per-session locking.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: Session) -> Result<Session, StoreError>;

    async fn get(&self, session_id: &str) -> Result<Option<Session>, StoreError>;

    async fn update(&self, session: Session) -> Result<Session, StoreError>;

    /// All sessions, newest first.
    async fn list(&self) -> Result<Vec<Session>, StoreError>;
}

/// Default backend: a process-local map behind an async `RwLock`.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: Session) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(StoreError::Backend(format!(
                "session '{}' already exists",
                session.id
            )));
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn update(&self, mut session: Session) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions
            .get(&session.id)
            .ok_or_else(|| StoreError::Backend(format!("session '{}' not found", session.id)))?;

        if stored.version != session.version {
            return Err(StoreError::Conflict {
                session_id: session.id,
            });
        }

        session.version += 1;
        session.updated_at = chrono::Utc::now();
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn list(&self) -> Result<Vec<Session>, StoreError> {
        let mut all: Vec<Session> = self.sessions.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }
}
