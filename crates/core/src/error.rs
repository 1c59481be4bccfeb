//! Error types for the DayCoach domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use crate::session::SessionId;
use thiserror::Error;

/// The top-level error type for all DayCoach operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Session errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Learning data errors ---
    #[error("Learning data error: {0}")]
    Learning(#[from] LearningError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Session already exists: {0}")]
    AlreadyExists(SessionId),

    #[error("Message belongs to session {message_session}, not {target}")]
    ForeignMessage {
        target: SessionId,
        message_session: SessionId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LearningError {
    #[error("No learning progress for user {0}")]
    UserNotFound(String),

    #[error("Day {day} is outside the course range 1..={max}")]
    DayOutOfRange { day: u32, max: u32 },

    #[error("No curriculum content for {language_id} day {day}")]
    ContentMissing { language_id: String, day: u32 },

    #[error("Curriculum content for {language_id} day {day} is incomplete: {reason}")]
    IncompleteContent {
        language_id: String,
        day: u32,
        reason: String,
    },

    #[error("Learning store failure: {0}")]
    Storage(String),
}
