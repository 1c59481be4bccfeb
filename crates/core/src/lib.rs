//! # DayCoach Core
//!
//! Domain types, traits, and error definitions for the DayCoach tutoring
//! assistant. This crate has **no framework dependencies**: it defines the
//! domain model that every other crate implements against.
//!
//! ## Seams
//!
//! Every collaborator is a trait here, implementations live elsewhere:
//! - [`Provider`] — chat-completion backends (`daycoach-providers`)
//! - [`SessionStore`] — conversation history (`daycoach-memory`)
//! - [`ProgressSource`], [`AchievementSource`], [`CurriculumSource`] —
//!   read-only learning data owned by the surrounding product
//! - [`UsageReporter`] — analytics sink for model calls (`daycoach-telemetry`)

pub mod context;
pub mod error;
pub mod learning;
pub mod locale;
pub mod message;
pub mod provider;
pub mod session;
pub mod tier;
pub mod usage;

// Re-export key types at crate root for ergonomics
pub use context::{AssistantContext, DayContent, DayState, DayTask, RequestType};
pub use error::{Error, LearningError, ProviderError, Result, SessionError};
pub use learning::{
    AchievementSnapshot, AchievementSource, CurriculumSource, ProgressSnapshot, ProgressSource,
    COURSE_DAYS,
};
pub use locale::Locale;
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use session::{ChatSession, SessionId, SessionMessage, SessionSeed, SessionStats, SessionStore};
pub use tier::{ModelConfig, Tier};
pub use usage::{NoopReporter, UsageEvent, UsageReporter};
