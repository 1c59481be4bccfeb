//! Model router — picks a model per subscription tier and handles fallback.
//!
//! Every attempt is reported to the configured [`UsageReporter`]. Reporting
//! never changes the outcome of a call.

use crate::fallback::{Attempt, FallbackState};
use crate::openai_compat::OpenAiCompatProvider;
use daycoach_config::{AppConfig, TierModels};
use daycoach_core::error::ProviderError;
use daycoach_core::message::Message;
use daycoach_core::provider::{Provider, ProviderRequest, ProviderResponse};
use daycoach_core::tier::{ModelConfig, Tier};
use daycoach_core::usage::{NoopReporter, UsageEvent, UsageReporter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-call options. Unset fields take the tier model's defaults.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub tier: Tier,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub response_format: Option<serde_json::Value>,
    /// Bound on each attempt. Overrides the router default.
    pub timeout: Option<Duration>,
    pub stream: bool,
}

impl ChatOptions {
    pub fn for_tier(tier: Tier) -> Self {
        Self {
            tier,
            ..Self::default()
        }
    }
}

/// A successful chat completion.
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub data: ProviderResponse,
    /// The assistant text as returned by the model.
    pub raw: String,
    /// Model that actually produced the answer.
    pub model: String,
    /// Tier the caller asked for, even when the free tier answered.
    pub tier: Tier,
    pub fallback_used: bool,
}

pub struct ModelRouter {
    provider: Arc<dyn Provider>,
    models: TierModels,
    reporter: Arc<dyn UsageReporter>,
    default_timeout: Option<Duration>,
}

impl ModelRouter {
    pub fn new(provider: Arc<dyn Provider>, models: TierModels) -> Self {
        Self {
            provider,
            models,
            reporter: Arc::new(NoopReporter),
            default_timeout: None,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn UsageReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn model_for(&self, tier: Tier) -> &ModelConfig {
        self.models.for_tier(tier)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run a chat completion for `options.tier`, falling back to the free
    /// tier once if a paid-tier attempt fails.
    ///
    /// When every attempt fails the error of the first attempt is returned.
    pub async fn chat_completion(
        &self,
        messages: Vec<Message>,
        options: ChatOptions,
    ) -> Result<ChatCompletion, ProviderError> {
        let mut state = FallbackState::begin(options.tier);
        let mut first_error: Option<ProviderError> = None;

        loop {
            match state {
                FallbackState::Calling(attempt) => match self.attempt(attempt, &messages, &options).await {
                    Ok(data) => {
                        debug!(state = ?state.succeeded(), "Model call finished");
                        let raw = data.message.content.clone();
                        let model = if data.model.is_empty() {
                            self.models.for_tier(attempt.tier).model.clone()
                        } else {
                            data.model.clone()
                        };
                        return Ok(ChatCompletion {
                            data,
                            raw,
                            model,
                            tier: attempt.requested,
                            fallback_used: attempt.is_fallback(),
                        });
                    }
                    Err(e) => {
                        state = state.failed();
                        if let FallbackState::Calling(next) = state {
                            warn!(
                                requested = %attempt.requested,
                                failed_tier = %attempt.tier,
                                next_tier = %next.tier,
                                error = %e,
                                "Model call failed, falling back"
                            );
                        }
                        first_error.get_or_insert(e);
                    }
                },
                FallbackState::Failed => {
                    return Err(first_error.unwrap_or_else(|| {
                        ProviderError::NotConfigured("no attempt was made".into())
                    }));
                }
                FallbackState::Idle | FallbackState::Done(_) => {
                    return Err(ProviderError::NotConfigured(format!(
                        "fallback machine stopped in {state:?}"
                    )));
                }
            }
        }
    }

    async fn attempt(
        &self,
        attempt: Attempt,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ProviderResponse, ProviderError> {
        let model = self.models.for_tier(attempt.tier);
        let request = ProviderRequest {
            model: model.model.clone(),
            messages: messages.to_vec(),
            temperature: options.temperature.unwrap_or(model.temperature),
            max_tokens: Some(options.max_tokens.unwrap_or(model.max_tokens)),
            response_format: options.response_format.clone(),
            stream: options.stream,
        };

        info!(
            provider = %self.provider.name(),
            model = %model.model,
            tier = %attempt.tier,
            fallback = attempt.is_fallback(),
            "Calling model"
        );

        let started = tokio::time::Instant::now();
        let result = match options.timeout.or(self.default_timeout) {
            Some(limit) => match tokio::time::timeout(limit, self.provider.complete(request)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(format!(
                    "Model '{}' timed out after {}ms",
                    model.model,
                    limit.as_millis()
                ))),
            },
            None => self.provider.complete(request).await,
        };
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        self.reporter.report(&UsageEvent {
            model: model.model.clone(),
            tier: attempt.requested,
            success: result.is_ok(),
            fallback: attempt.is_fallback(),
            usage: result.as_ref().ok().and_then(|r| r.usage),
            latency_ms,
            at: chrono::Utc::now(),
        });

        result
    }
}

/// Build the HTTP provider described by the configuration.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    Arc::new(OpenAiCompatProvider::with_timeout(
        config.provider.name.clone(),
        config.provider.api_url.clone(),
        config.provider.api_key.clone().unwrap_or_default(),
        config.request_timeout(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use daycoach_core::provider::Usage;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers per model name; models without a script fail.
    struct ScriptedProvider {
        answers: HashMap<String, String>,
        requests: Mutex<Vec<ProviderRequest>>,
    }

    impl ScriptedProvider {
        fn new(answers: &[(&str, &str)]) -> Self {
            Self {
                answers: answers
                    .iter()
                    .map(|(m, a)| (m.to_string(), a.to_string()))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn models_called(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.model.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            self.requests.lock().unwrap().push(request.clone());
            match self.answers.get(&request.model) {
                Some(answer) => Ok(ProviderResponse {
                    message: Message::assistant(answer.clone()),
                    usage: Some(Usage {
                        prompt_tokens: 10,
                        completion_tokens: 5,
                        total_tokens: 15,
                    }),
                    model: request.model,
                    metadata: serde_json::Map::new(),
                }),
                None => Err(ProviderError::ApiError {
                    status_code: 503,
                    message: format!("{} is unavailable", request.model),
                }),
            }
        }
    }

    struct HangingProvider;

    #[async_trait]
    impl Provider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(ProviderError::Network("unreachable".into()))
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        events: Mutex<Vec<UsageEvent>>,
    }

    impl UsageReporter for RecordingReporter {
        fn report(&self, event: &UsageEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    const FREE: &str = "openai/gpt-4o-mini";
    const PREMIUM: &str = "openai/gpt-4o";
    const PRO_PLUS: &str = "anthropic/claude-sonnet-4";

    fn router(provider: Arc<dyn Provider>) -> (ModelRouter, Arc<RecordingReporter>) {
        let reporter = Arc::new(RecordingReporter::default());
        let router = ModelRouter::new(provider, TierModels::default()).with_reporter(reporter.clone());
        (router, reporter)
    }

    fn hello() -> Vec<Message> {
        vec![Message::user("hello")]
    }

    #[tokio::test]
    async fn each_tier_uses_its_model() {
        let provider = Arc::new(ScriptedProvider::new(&[
            (FREE, "free"),
            (PREMIUM, "premium"),
            (PRO_PLUS, "pro"),
        ]));
        let (router, _) = router(provider.clone());

        for (tier, expected) in [(Tier::Free, FREE), (Tier::Premium, PREMIUM), (Tier::ProPlus, PRO_PLUS)] {
            let out = router.chat_completion(hello(), ChatOptions::for_tier(tier)).await.unwrap();
            assert_eq!(out.model, expected);
            assert_eq!(out.tier, tier);
            assert!(!out.fallback_used);
        }
        assert_eq!(provider.models_called(), [FREE, PREMIUM, PRO_PLUS]);
    }

    #[tokio::test]
    async fn tier_defaults_apply_unless_overridden() {
        let provider = Arc::new(ScriptedProvider::new(&[(PREMIUM, "ok")]));
        let (router, _) = router(provider.clone());

        router
            .chat_completion(hello(), ChatOptions::for_tier(Tier::Premium))
            .await
            .unwrap();
        router
            .chat_completion(
                hello(),
                ChatOptions {
                    tier: Tier::Premium,
                    temperature: Some(0.1),
                    max_tokens: Some(50),
                    response_format: Some(serde_json::json!({ "type": "json_object" })),
                    ..ChatOptions::default()
                },
            )
            .await
            .unwrap();

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].max_tokens, Some(2000));
        assert!((requests[0].temperature - 0.7).abs() < f32::EPSILON);
        assert!(requests[0].response_format.is_none());
        assert_eq!(requests[1].max_tokens, Some(50));
        assert!((requests[1].temperature - 0.1).abs() < f32::EPSILON);
        assert!(requests[1].response_format.is_some());
    }

    #[tokio::test]
    async fn paid_failure_falls_back_to_free() {
        let provider = Arc::new(ScriptedProvider::new(&[(FREE, "from free")]));
        let (router, reporter) = router(provider.clone());

        let out = router
            .chat_completion(hello(), ChatOptions::for_tier(Tier::ProPlus))
            .await
            .unwrap();

        assert_eq!(out.raw, "from free");
        assert_eq!(out.model, FREE);
        assert_eq!(out.tier, Tier::ProPlus);
        assert!(out.fallback_used);
        assert_eq!(provider.models_called(), [PRO_PLUS, FREE]);

        let events = reporter.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(!events[0].success && !events[0].fallback);
        assert!(events[1].success && events[1].fallback);
        assert!(events.iter().all(|e| e.tier == Tier::ProPlus));
        assert_eq!(events[1].usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn free_failure_does_not_retry() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let (router, reporter) = router(provider.clone());

        let err = router
            .chat_completion(hello(), ChatOptions::for_tier(Tier::Free))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 503, .. }));
        assert_eq!(provider.models_called(), [FREE]);
        assert_eq!(reporter.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn double_failure_returns_the_original_error() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let (router, _) = router(provider.clone());

        let err = router
            .chat_completion(hello(), ChatOptions::for_tier(Tier::Premium))
            .await
            .unwrap_err();
        match err {
            ProviderError::ApiError { message, .. } => assert!(message.contains(PREMIUM)),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(provider.models_called(), [PREMIUM, FREE]);
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_are_bounded_by_timeout() {
        let (router, reporter) = router(Arc::new(HangingProvider));
        let err = router
            .chat_completion(
                hello(),
                ChatOptions {
                    tier: Tier::Premium,
                    timeout: Some(Duration::from_secs(5)),
                    ..ChatOptions::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Timeout(_)));
        let events = reporter.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| !e.success));
    }

    #[test]
    fn config_builds_http_provider() {
        let provider = build_from_config(&AppConfig::default());
        assert_eq!(provider.name(), "openrouter");
    }
}
