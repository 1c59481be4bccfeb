//! Chat-completion providers for DayCoach.
//!
//! The HTTP provider implements `daycoach_core::Provider`. The model router
//! picks a model per subscription tier and falls back to the free tier when
//! a paid-tier call fails.

pub mod fallback;
pub mod openai_compat;
pub mod router;

pub use fallback::{Attempt, FallbackState};
pub use openai_compat::{decode_completion, OpenAiCompatProvider};
pub use router::{build_from_config, ChatCompletion, ChatOptions, ModelRouter};
