//! The tutoring assistant orchestration core.
//!
//! One chat turn runs through:
//!
//! 1. **Filter** the raw message (length, markup, blocklist, injection)
//! 2. **Look up** the response cache and return on a hit
//! 3. **Assemble** the learner context from progress and curriculum
//! 4. **Route** the prompt to the tier's model, with free-tier fallback
//! 5. **Parse** the model text into a message and code examples
//! 6. **Persist** the exchange to the session, then **cache** the response

pub mod context;
pub mod error;
pub mod parser;
pub mod service;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{build_messages, system_prompt, ContextAggregator};
pub use error::AssistantError;
pub use parser::{format_for_display, normalize_language, parse_response, AssistantResponse, CodeBlock};
pub use service::{AssistantReply, AssistantService, ChatRequest, ReplyStatus};
