//! In-memory learning collaborators.
//!
//! Stand-ins for the product's progress, achievement, and curriculum stores.
//! The CLI loads the curriculum from a TOML file; tests build both directly.

use async_trait::async_trait;
use daycoach_core::context::DayContent;
use daycoach_core::error::LearningError;
use daycoach_core::learning::{
    AchievementSnapshot, AchievementSource, CurriculumSource, ProgressSnapshot, ProgressSource,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Progress and achievements keyed by user id.
#[derive(Default)]
pub struct InMemoryProgressStore {
    progress: RwLock<HashMap<String, ProgressSnapshot>>,
    achievements: RwLock<HashMap<String, AchievementSnapshot>>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_progress(&self, snapshot: ProgressSnapshot) {
        self.progress
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(snapshot.user_id.clone(), snapshot);
    }

    pub fn set_achievements(&self, snapshot: AchievementSnapshot) {
        self.achievements
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(snapshot.user_id.clone(), snapshot);
    }

    /// Move a learner to another day and language, keeping the rest.
    pub fn set_position(&self, user_id: &str, day: u32, language_id: &str) {
        let mut progress = self.progress.write().unwrap_or_else(PoisonError::into_inner);
        let entry = progress
            .entry(user_id.to_string())
            .or_insert_with(|| ProgressSnapshot::new(user_id, day, language_id));
        entry.active_day = day;
        entry.language_id = language_id.to_string();
    }
}

#[async_trait]
impl ProgressSource for InMemoryProgressStore {
    async fn progress(&self, user_id: &str) -> Result<ProgressSnapshot, LearningError> {
        self.progress
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
            .ok_or_else(|| LearningError::UserNotFound(user_id.to_string()))
    }
}

#[async_trait]
impl AchievementSource for InMemoryProgressStore {
    async fn achievements(&self, user_id: &str) -> Result<AchievementSnapshot, LearningError> {
        // A learner with no achievement record simply has none yet.
        Ok(self
            .achievements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| AchievementSnapshot {
                user_id: user_id.to_string(),
                ..AchievementSnapshot::default()
            }))
    }
}

/// Errors loading a curriculum file.
#[derive(Debug, thiserror::Error)]
pub enum CurriculumError {
    #[error("Failed to read curriculum at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse curriculum: {0}")]
    ParseError(String),
}

#[derive(Deserialize)]
struct CurriculumFile {
    #[serde(default)]
    days: Vec<DayContent>,
}

/// Day content keyed by `(language_id, day)`.
#[derive(Default)]
pub struct InMemoryCurriculum {
    days: RwLock<HashMap<(String, u32), DayContent>>,
}

impl InMemoryCurriculum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, content: DayContent) {
        self.days
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((content.language_id.clone(), content.day), content);
    }

    /// Parse a TOML document made of `[[days]]` tables.
    pub fn from_toml_str(source: &str) -> Result<Self, CurriculumError> {
        let file: CurriculumFile =
            toml::from_str(source).map_err(|e| CurriculumError::ParseError(e.to_string()))?;
        let curriculum = Self::new();
        for day in file.days {
            curriculum.insert(day);
        }
        Ok(curriculum)
    }

    pub fn load(path: &Path) -> Result<Self, CurriculumError> {
        let source = std::fs::read_to_string(path).map_err(|e| CurriculumError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let curriculum = Self::from_toml_str(&source)?;
        tracing::info!(path = %path.display(), days = curriculum.len(), "Curriculum loaded");
        Ok(curriculum)
    }

    pub fn len(&self) -> usize {
        self.days.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CurriculumSource for InMemoryCurriculum {
    async fn day_content(&self, language_id: &str, day: u32) -> Result<DayContent, LearningError> {
        self.days
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(language_id.to_string(), day))
            .cloned()
            .ok_or_else(|| LearningError::ContentMissing {
                language_id: language_id.to_string(),
                day,
            })
    }
}
