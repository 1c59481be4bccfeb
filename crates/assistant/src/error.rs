//! Failures of one chat turn and their user-facing wording.

use daycoach_core::error::{LearningError, ProviderError, SessionError};
use daycoach_core::locale::Locale;
use daycoach_core::session::SessionId;
use daycoach_security::RejectionKind;

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// The content filter refused the message. Never retried.
    #[error("Content rejected: {reason}")]
    ContentRejected {
        reason: String,
        kind: Option<RejectionKind>,
        blocked: Option<Vec<String>>,
    },

    /// Unknown, cleared, or foreign session id.
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Session store refused the write: {0}")]
    Session(SessionError),

    /// Every model attempt failed, fallback included.
    #[error("Model call failed: {0}")]
    ProviderCallFailed(#[from] ProviderError),

    #[error("Could not assemble learner context: {0}")]
    Context(#[from] LearningError),
}

impl From<SessionError> for AssistantError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => AssistantError::SessionNotFound(id),
            other => AssistantError::Session(other),
        }
    }
}

impl AssistantError {
    /// Text safe to show the learner. Internal details never appear here;
    /// a rejection carries the filter's own reason.
    pub fn user_message(&self, locale: Locale) -> String {
        let text = match (self, locale) {
            (AssistantError::ContentRejected { reason, .. }, _) => return reason.clone(),
            (AssistantError::SessionNotFound(_), Locale::Ru) => {
                "Этот диалог больше не существует. Начните новый разговор."
            }
            (AssistantError::SessionNotFound(_), Locale::En) => {
                "This conversation no longer exists. Please start a new one."
            }
            (AssistantError::ProviderCallFailed(_), Locale::Ru) => {
                "Ассистент сейчас недоступен. Попробуйте ещё раз через минуту."
            }
            (AssistantError::ProviderCallFailed(_), Locale::En) => {
                "The assistant is unavailable right now. Please try again in a minute."
            }
            (AssistantError::Context(_), Locale::Ru) => {
                "Не удалось загрузить ваш прогресс по курсу. Попробуйте позже."
            }
            (AssistantError::Context(_), Locale::En) => {
                "We could not load your course progress. Please try again later."
            }
            (AssistantError::Session(_), Locale::Ru) => {
                "Не удалось сохранить сообщение. Попробуйте ещё раз."
            }
            (AssistantError::Session(_), Locale::En) => {
                "Your message could not be saved. Please try again."
            }
        };
        text.to_string()
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, AssistantError::ContentRejected { .. })
    }
}
