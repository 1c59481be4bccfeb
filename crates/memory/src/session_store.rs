//! In-memory session store.
//!
//! Sessions are keyed by id with a per-user index beside them. Both maps sit
//! behind one lock so a deletion is never half-visible.

use async_trait::async_trait;
use daycoach_core::error::SessionError;
use daycoach_core::session::{
    ChatSession, SessionId, SessionMessage, SessionSeed, SessionStats, SessionStore,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionId, ChatSession>,
    by_user: HashMap<String, Vec<SessionId>>,
}

impl Inner {
    fn remove_session(&mut self, id: &SessionId) -> Option<ChatSession> {
        let session = self.sessions.remove(id)?;
        if let Some(ids) = self.by_user.get_mut(&session.user_id) {
            ids.retain(|s| s != id);
            if ids.is_empty() {
                self.by_user.remove(&session.user_id);
            }
        }
        Some(session)
    }
}

/// A session store that keeps everything in process memory.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_ownership(target: &SessionId, messages: &[SessionMessage]) -> Result<(), SessionError> {
    match messages.iter().find(|m| &m.session_id != target) {
        Some(foreign) => Err(SessionError::ForeignMessage {
            target: target.clone(),
            message_session: foreign.session_id.clone(),
        }),
        None => Ok(()),
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self, user_id: &str, seed: SessionSeed) -> ChatSession {
        let session = ChatSession::new(user_id, seed);
        let mut inner = self.inner.write().await;
        inner
            .by_user
            .entry(user_id.to_string())
            .or_default()
            .push(session.id.clone());
        inner.sessions.insert(session.id.clone(), session.clone());
        tracing::debug!(session = %session.id, user = %user_id, "Session created");
        session
    }

    async fn insert_session(&self, session: ChatSession) -> Result<(), SessionError> {
        check_ownership(&session.id, &session.messages)?;
        let mut inner = self.inner.write().await;
        if inner.sessions.contains_key(&session.id) {
            return Err(SessionError::AlreadyExists(session.id));
        }
        inner
            .by_user
            .entry(session.user_id.clone())
            .or_default()
            .push(session.id.clone());
        tracing::debug!(
            session = %session.id,
            user = %session.user_id,
            messages = session.messages.len(),
            "Session inserted"
        );
        inner.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Option<ChatSession> {
        self.inner.read().await.sessions.get(id).cloned()
    }

    async fn add_message(&self, session_id: &SessionId, message: SessionMessage) -> Result<(), SessionError> {
        self.add_messages(session_id, vec![message]).await
    }

    async fn add_messages(
        &self,
        session_id: &SessionId,
        messages: Vec<SessionMessage>,
    ) -> Result<(), SessionError> {
        check_ownership(session_id, &messages)?;
        let mut inner = self.inner.write().await;
        let session = inner
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;
        session.messages.extend(messages);
        Ok(())
    }

    async fn get_recent_messages(&self, session_id: &SessionId, n: usize) -> Vec<SessionMessage> {
        let inner = self.inner.read().await;
        match inner.sessions.get(session_id) {
            Some(session) => {
                let skip = session.messages.len().saturating_sub(n);
                session.messages[skip..].to_vec()
            }
            None => Vec::new(),
        }
    }

    async fn get_user_sessions(&self, user_id: &str) -> Vec<ChatSession> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<ChatSession> = inner
            .by_user
            .get(user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.sessions.get(id))
            .filter(|s| s.belongs_to(user_id))
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.created_at);
        sessions
    }

    async fn clear_session(&self, id: &SessionId) -> bool {
        let removed = self.inner.write().await.remove_session(id).is_some();
        if removed {
            tracing::debug!(session = %id, "Session cleared");
        }
        removed
    }

    async fn clear_user_sessions(&self, user_id: &str) -> usize {
        let mut inner = self.inner.write().await;
        let ids = inner.by_user.remove(user_id).unwrap_or_default();
        let removed = ids
            .iter()
            .filter(|id| inner.sessions.remove(*id).is_some())
            .count();
        tracing::debug!(user = %user_id, removed, "User sessions cleared");
        removed
    }

    async fn get_stats(&self) -> SessionStats {
        let inner = self.inner.read().await;
        SessionStats {
            total_sessions: inner.sessions.len(),
            total_messages: inner.sessions.values().map(|s| s.messages.len()).sum(),
            total_users: inner.by_user.len(),
        }
    }
}
