//! Context aggregator.
//!
//! Reads the progress, achievement, and curriculum collaborators and
//! assembles one [`AssistantContext`] per learner. Assembled contexts are
//! cached per user for a short TTL; [`ContextAggregator::invalidate_cache`]
//! must be called after progress mutates.
//!
//! The aggregator never writes to its collaborators.

use daycoach_core::context::{AssistantContext, DayContent};
use daycoach_core::error::LearningError;
use daycoach_core::learning::{
    AchievementSnapshot, AchievementSource, CurriculumSource, ProgressSnapshot, ProgressSource,
    COURSE_DAYS,
};
use daycoach_core::tier::Tier;
use daycoach_memory::TtlCache;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

pub struct ContextAggregator {
    progress: Arc<dyn ProgressSource>,
    achievements: Arc<dyn AchievementSource>,
    curriculum: Arc<dyn CurriculumSource>,
    cache: TtlCache<AssistantContext>,
    ttl: Duration,
    generations: RwLock<Generations>,
}

/// `epoch` moves on [`ContextAggregator::clear_all_caches`], `users` on
/// per-user invalidation.
#[derive(Default)]
struct Generations {
    epoch: u64,
    users: HashMap<String, u64>,
}

impl Generations {
    fn of(&self, user_id: &str) -> (u64, u64) {
        (self.epoch, self.users.get(user_id).copied().unwrap_or(0))
    }
}

fn cache_key(user_id: &str) -> String {
    format!("context:{user_id}")
}

impl ContextAggregator {
    pub fn new(
        progress: Arc<dyn ProgressSource>,
        achievements: Arc<dyn AchievementSource>,
        curriculum: Arc<dyn CurriculumSource>,
        ttl: Duration,
    ) -> Self {
        Self {
            progress,
            achievements,
            curriculum,
            cache: TtlCache::new(),
            ttl,
            generations: RwLock::default(),
        }
    }

    /// The learner's context, from cache when fresh.
    ///
    /// A cached snapshot is returned unchanged apart from `tier`, which is
    /// always the caller's.
    pub async fn get_user_context(
        &self,
        user_id: &str,
        tier: Tier,
    ) -> Result<AssistantContext, LearningError> {
        let key = cache_key(user_id);
        if let Some(context) = self.cache.get(&key) {
            debug!(user = %user_id, "Context cache hit");
            return Ok(context.for_tier(tier));
        }

        let started = self.generation(user_id);
        let context = self.assemble(user_id, tier).await?;

        // Held across the check and the write so an invalidation cannot slip
        // in between them.
        let generations = self.generations.read().unwrap_or_else(PoisonError::into_inner);
        if generations.of(user_id) != started {
            debug!(user = %user_id, "Context invalidated during rebuild, not caching");
            return Ok(context);
        }
        self.cache.set(key, context.clone(), self.ttl);
        drop(generations);
        debug!(
            user = %user_id,
            day = context.current_day,
            language = %context.language_id,
            "Context assembled"
        );
        Ok(context)
    }

    async fn assemble(&self, user_id: &str, tier: Tier) -> Result<AssistantContext, LearningError> {
        let progress = self.get_user_progress(user_id).await?;
        let achievements = self.get_user_achievements(user_id).await?;
        let day = progress.active_day;
        let content = self.get_current_day_content(&progress.language_id, day).await?;

        Ok(AssistantContext {
            user_id: user_id.to_string(),
            tier,
            current_day: day,
            day_state: progress.day_state(day),
            language_id: progress.language_id,
            day_theory: content.theory,
            day_tasks: content.tasks,
            completed_days: progress.completed_days,
            current_streak: achievements.current_streak,
            total_tasks_completed: progress.total_tasks_completed,
            recent_messages: Vec::new(),
        })
    }

    /// Theory and tasks for `(language_id, day)`.
    ///
    /// In-range days must come back with non-blank theory and at least one
    /// task; anything less is reported as [`LearningError::IncompleteContent`].
    pub async fn get_current_day_content(
        &self,
        language_id: &str,
        day: u32,
    ) -> Result<DayContent, LearningError> {
        if !(1..=COURSE_DAYS).contains(&day) {
            return Err(LearningError::DayOutOfRange {
                day,
                max: COURSE_DAYS,
            });
        }

        let content = self.curriculum.day_content(language_id, day).await?;
        let incomplete = |reason: &str| LearningError::IncompleteContent {
            language_id: language_id.to_string(),
            day,
            reason: reason.to_string(),
        };
        if content.theory.trim().is_empty() {
            return Err(incomplete("theory is empty"));
        }
        if content.tasks.is_empty() {
            return Err(incomplete("no tasks"));
        }
        Ok(content)
    }

    pub async fn get_user_progress(&self, user_id: &str) -> Result<ProgressSnapshot, LearningError> {
        self.progress.progress(user_id).await
    }

    pub async fn get_user_achievements(
        &self,
        user_id: &str,
    ) -> Result<AchievementSnapshot, LearningError> {
        self.achievements.achievements(user_id).await
    }

    fn generation(&self, user_id: &str) -> (u64, u64) {
        self.generations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .of(user_id)
    }

    pub fn invalidate_cache(&self, user_id: &str) {
        let mut generations = self.generations.write().unwrap_or_else(PoisonError::into_inner);
        *generations.users.entry(user_id.to_string()).or_default() += 1;
        if self.cache.remove(&cache_key(user_id)) {
            debug!(user = %user_id, "Context cache invalidated");
        }
    }

    pub fn clear_all_caches(&self) {
        let mut generations = self.generations.write().unwrap_or_else(PoisonError::into_inner);
        generations.epoch += 1;
        generations.users.clear();
        self.cache.clear();
    }

    /// Number of live cached contexts.
    pub fn cached_contexts(&self) -> usize {
        self.cache.size()
    }
}
