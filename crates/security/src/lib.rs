//! Security module for DayCoach — validation of raw learner input.
//!
//! Provides:
//! - **Content filter**: length limit, HTML stripping, locale blocklists,
//!   and prompt-injection detection in one pure pass
//! - **Blocklists**: Russian and English word lists
//! - **Injection patterns**: manipulation phrases aimed at the system prompt

pub mod blocklist;
pub mod content_filter;
pub mod injection;

pub use content_filter::{
    filter_content, strip_html, ContentFilter, ContentFilterResult, RejectionKind,
    DEFAULT_MAX_LENGTH,
};
