//! Chat sessions — per-user conversation history.
//!
//! A session is owned by exactly one user. Stores must guarantee that no
//! operation addressed by one user's session id can reach another user's
//! messages, and that deletion is immediate and irreversible.

use crate::error::SessionError;
use crate::message::Role;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Course position captured when a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSeed {
    pub day: u32,
    pub language_id: String,
}

/// One stored turn of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub id: String,
    /// The session this message is stored under. Lookup only.
    pub session_id: SessionId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl SessionMessage {
    fn with_role(session_id: SessionId, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id,
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(session_id: SessionId, content: impl Into<String>) -> Self {
        Self::with_role(session_id, Role::User, content)
    }

    pub fn assistant(session_id: SessionId, content: impl Into<String>) -> Self {
        Self::with_role(session_id, Role::Assistant, content)
    }
}

/// A user-owned conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: SessionId,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub seed: SessionSeed,
    /// Append-only, oldest first.
    pub messages: Vec<SessionMessage>,
}

impl ChatSession {
    pub fn new(user_id: impl Into<String>, seed: SessionSeed) -> Self {
        Self {
            id: SessionId::new(),
            user_id: user_id.into(),
            created_at: Utc::now(),
            seed,
            messages: Vec::new(),
        }
    }

    pub fn belongs_to(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Aggregate counts for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_sessions: usize,
    pub total_messages: usize,
    pub total_users: usize,
}

/// The conversation history store.
///
/// Implementations: in-memory (`daycoach-memory`). A persistent backend must
/// keep the same isolation and deletion guarantees.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create an empty session owned by `user_id`.
    async fn create_session(&self, user_id: &str, seed: SessionSeed) -> ChatSession;

    /// Store a session built by the caller, messages included, in one
    /// write. Fails if the id is taken or a message names another session.
    async fn insert_session(&self, session: ChatSession) -> Result<(), SessionError>;

    async fn get_session(&self, id: &SessionId) -> Option<ChatSession>;

    /// Append one message. Fails with [`SessionError::NotFound`] when the
    /// session does not exist (never created or already cleared).
    async fn add_message(&self, session_id: &SessionId, message: SessionMessage) -> Result<(), SessionError>;

    /// Append several messages under one write, in order. Either all land or
    /// none do.
    async fn add_messages(
        &self,
        session_id: &SessionId,
        messages: Vec<SessionMessage>,
    ) -> Result<(), SessionError>;

    /// The last `n` messages, oldest first. Empty for unknown sessions.
    async fn get_recent_messages(&self, session_id: &SessionId, n: usize) -> Vec<SessionMessage>;

    /// Every session owned by `user_id`, oldest first.
    async fn get_user_sessions(&self, user_id: &str) -> Vec<ChatSession>;

    /// Hard-delete a session. Returns whether it existed.
    async fn clear_session(&self, id: &SessionId) -> bool;

    /// Hard-delete every session of `user_id`. Returns how many were removed.
    async fn clear_user_sessions(&self, user_id: &str) -> usize;

    async fn get_stats(&self) -> SessionStats;

    /// The session, but only if `user_id` owns it.
    async fn get_owned_session(&self, user_id: &str, id: &SessionId) -> Option<ChatSession> {
        self.get_session(id).await.filter(|s| s.belongs_to(user_id))
    }
}
