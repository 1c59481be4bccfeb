//! Storage implementations for DayCoach.
//!
//! Everything here is in-memory and safe for concurrent use from many
//! requests at once. Expiry is evaluated lazily on access.

pub mod cache;
pub mod cache_key;
pub mod learning;
pub mod session_store;

pub use cache::TtlCache;
pub use cache_key::{normalize_message, response_cache_key};
pub use learning::{CurriculumError, InMemoryCurriculum, InMemoryProgressStore};
pub use session_store::InMemorySessionStore;
