//! Shared fixtures for assistant tests.

use crate::context::ContextAggregator;
use crate::service::AssistantService;
use daycoach_config::TierModels;
use daycoach_core::context::{DayContent, DayTask};
use daycoach_core::error::ProviderError;
use daycoach_core::learning::ProgressSnapshot;
use daycoach_core::message::Message;
use daycoach_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use daycoach_memory::{InMemoryCurriculum, InMemoryProgressStore, InMemorySessionStore};
use daycoach_providers::ModelRouter;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const FREE_MODEL: &str = "openai/gpt-4o-mini";
pub const PREMIUM_MODEL: &str = "openai/gpt-4o";

/// Answers every request with the same text and records what it was sent.
pub struct ScriptedProvider {
    answer: String,
    failing_models: Vec<String>,
    fail_all: bool,
    delay: Option<Duration>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            failing_models: Vec::new(),
            fail_all: false,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, models: &[&str]) -> Self {
        self.failing_models = models.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn failing_on_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_all || self.failing_models.contains(&request.model) {
            return Err(ProviderError::ApiError {
                status_code: 503,
                message: format!("{} is overloaded", request.model),
            });
        }
        Ok(ProviderResponse {
            message: Message::assistant(self.answer.clone()),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: request.model,
            metadata: serde_json::Map::new(),
        })
    }
}

fn day(language_id: &str, day: u32, theory: &str, tasks: usize) -> DayContent {
    DayContent {
        language_id: language_id.into(),
        day,
        theory: theory.into(),
        tasks: (1..=tasks)
            .map(|i| DayTask {
                id: format!("{language_id}-{day}-{i}"),
                title: format!("Task {i}"),
                description: String::new(),
            })
            .collect(),
    }
}

/// Python days 1, 2, and 90 are complete; day 3 has no theory, day 4 no
/// tasks, day 5 is missing. JavaScript has day 1 only.
pub fn curriculum() -> InMemoryCurriculum {
    let curriculum = InMemoryCurriculum::new();
    curriculum.insert(day("python", 1, "print() writes to stdout.", 2));
    curriculum.insert(day("python", 2, "Variables name values.", 2));
    curriculum.insert(day("python", 3, "   ", 1));
    curriculum.insert(day("python", 4, "Loops repeat work.", 0));
    curriculum.insert(day("python", 90, "Final project.", 1));
    curriculum.insert(day("javascript", 1, "console.log() prints.", 1));
    curriculum
}

pub fn progress_store(user_id: &str, day: u32, language_id: &str) -> InMemoryProgressStore {
    let store = InMemoryProgressStore::new();
    store.set_progress(ProgressSnapshot::new(user_id, day, language_id));
    store
}

pub struct ServiceParts {
    pub service: AssistantService,
    pub provider: Arc<ScriptedProvider>,
    pub progress: Arc<InMemoryProgressStore>,
    pub sessions: Arc<InMemorySessionStore>,
}

/// A service over in-memory collaborators with learners `u1` and `u2` on
/// python day 2.
pub fn service_parts(provider: ScriptedProvider) -> ServiceParts {
    let provider = Arc::new(provider);
    let progress = Arc::new(progress_store("u1", 2, "python"));
    progress.set_position("u2", 2, "python");
    let sessions = Arc::new(InMemorySessionStore::new());

    let aggregator = Arc::new(ContextAggregator::new(
        progress.clone(),
        progress.clone(),
        Arc::new(curriculum()),
        Duration::from_secs(30),
    ));
    let router = Arc::new(ModelRouter::new(provider.clone(), TierModels::default()));
    let service = AssistantService::new(aggregator, router, sessions.clone());

    ServiceParts {
        service,
        provider,
        progress,
        sessions,
    }
}
