//! The learner context snapshot that grounds one chat turn.

use crate::session::SessionMessage;
use crate::tier::Tier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What kind of help the learner asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    #[default]
    Chat,
    Explain,
    Hint,
    CodeReview,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Chat => "chat",
            RequestType::Explain => "explain",
            RequestType::Hint => "hint",
            RequestType::CodeReview => "code_review",
        }
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" => Ok(RequestType::Chat),
            "explain" => Ok(RequestType::Explain),
            "hint" => Ok(RequestType::Hint),
            "code_review" | "code-review" | "review" => Ok(RequestType::CodeReview),
            other => Err(format!("unknown request type '{other}'")),
        }
    }
}

/// One exercise of a course day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Theory and tasks of one day for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayContent {
    pub language_id: String,
    pub day: u32,
    pub theory: String,
    #[serde(default)]
    pub tasks: Vec<DayTask>,
}

/// Which tasks of a day the learner has finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayState {
    pub day: u32,
    #[serde(default)]
    pub completed_task_ids: BTreeSet<String>,
}

impl DayState {
    pub fn empty(day: u32) -> Self {
        Self {
            day,
            completed_task_ids: BTreeSet::new(),
        }
    }

    pub fn is_task_done(&self, task_id: &str) -> bool {
        self.completed_task_ids.contains(task_id)
    }
}

/// Immutable snapshot of everything the assistant knows about a learner.
///
/// Built by the context aggregator from the progress, achievement, and
/// curriculum collaborators. `recent_messages` is ordered oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantContext {
    pub user_id: String,
    pub tier: Tier,
    pub current_day: u32,
    pub language_id: String,
    pub day_theory: String,
    pub day_tasks: Vec<DayTask>,
    pub completed_days: BTreeSet<u32>,
    pub current_streak: u32,
    pub total_tasks_completed: u32,
    pub day_state: DayState,
    #[serde(default)]
    pub recent_messages: Vec<SessionMessage>,
}

impl AssistantContext {
    /// A copy of this context carrying the last `limit` of `messages`.
    pub fn with_recent_messages(mut self, mut messages: Vec<SessionMessage>, limit: usize) -> Self {
        if messages.len() > limit {
            messages.drain(..messages.len() - limit);
        }
        self.recent_messages = messages;
        self
    }

    /// A copy of this context attributed to another tier.
    pub fn for_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn tasks_done_today(&self) -> usize {
        self.day_tasks
            .iter()
            .filter(|t| self.day_state.is_task_done(&t.id))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionId;

    fn context() -> AssistantContext {
        AssistantContext {
            user_id: "u1".into(),
            tier: Tier::Free,
            current_day: 2,
            language_id: "python".into(),
            day_theory: "Variables hold values.".into(),
            day_tasks: vec![
                DayTask {
                    id: "t1".into(),
                    title: "Declare".into(),
                    description: String::new(),
                },
                DayTask {
                    id: "t2".into(),
                    title: "Print".into(),
                    description: String::new(),
                },
            ],
            completed_days: BTreeSet::from([1]),
            current_streak: 2,
            total_tasks_completed: 4,
            day_state: DayState {
                day: 2,
                completed_task_ids: BTreeSet::from(["t1".to_string()]),
            },
            recent_messages: vec![],
        }
    }

    #[test]
    fn recent_messages_keep_the_newest() {
        let sid = SessionId::from("s1");
        let messages: Vec<_> = (0..5)
            .map(|i| SessionMessage::user(sid.clone(), format!("m{i}")))
            .collect();
        let ctx = context().with_recent_messages(messages, 3);
        let contents: Vec<_> = ctx.recent_messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["m2", "m3", "m4"]);
    }

    #[test]
    fn counts_tasks_done_today() {
        assert_eq!(context().tasks_done_today(), 1);
    }
}
