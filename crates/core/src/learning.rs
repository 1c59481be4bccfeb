//! Read-only collaborators owned by the surrounding product.
//!
//! The assistant never writes learning data. It queries progress,
//! achievements, and curriculum through these traits so tests and the CLI
//! can substitute deterministic fixtures.

use crate::context::{DayContent, DayState};
use crate::error::LearningError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Length of the course in days.
pub const COURSE_DAYS: u32 = 90;

/// A learner's progress as the progress store currently sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub user_id: String,
    /// The day the learner is currently working on.
    pub active_day: u32,
    /// The course language currently active for the learner.
    pub language_id: String,
    #[serde(default)]
    pub completed_days: BTreeSet<u32>,
    #[serde(default)]
    pub total_tasks_completed: u32,
    /// Task completion per day, keyed by day number.
    #[serde(default)]
    pub day_states: BTreeMap<u32, DayState>,
}

impl ProgressSnapshot {
    pub fn new(user_id: impl Into<String>, active_day: u32, language_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            active_day,
            language_id: language_id.into(),
            completed_days: BTreeSet::new(),
            total_tasks_completed: 0,
            day_states: BTreeMap::new(),
        }
    }

    /// Task completion for `day`, or an empty state if nothing was recorded.
    pub fn day_state(&self, day: u32) -> DayState {
        self.day_states
            .get(&day)
            .cloned()
            .unwrap_or_else(|| DayState::empty(day))
    }
}

/// Streaks and unlocked achievements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementSnapshot {
    pub user_id: String,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub unlocked: Vec<String>,
}

#[async_trait]
pub trait ProgressSource: Send + Sync {
    async fn progress(&self, user_id: &str) -> Result<ProgressSnapshot, LearningError>;
}

#[async_trait]
pub trait AchievementSource: Send + Sync {
    async fn achievements(&self, user_id: &str) -> Result<AchievementSnapshot, LearningError>;
}

#[async_trait]
pub trait CurriculumSource: Send + Sync {
    async fn day_content(&self, language_id: &str, day: u32) -> Result<DayContent, LearningError>;
}
