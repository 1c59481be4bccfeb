//! Learner context: assembly from collaborators and rendering into a prompt.

pub mod aggregator;
pub mod prompt;

pub use aggregator::ContextAggregator;
pub use prompt::{build_messages, system_prompt};
