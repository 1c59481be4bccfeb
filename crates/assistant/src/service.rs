//! Assistant service — one chat turn, end to end.
//!
//! ```text
//! Received -> Filtered -> CacheHit -> Done
//!                      -> CacheMiss -> ContextBuilt -> ModelCalled -> Parsed
//!                                   -> Persisted -> CachedOut -> Done
//! ```
//!
//! Every side effect happens after the model call returns: one atomic
//! session write, then a synchronous cache insert. A turn dropped while the
//! model is running leaves no trace in either store.

use crate::context::{build_messages, ContextAggregator};
use crate::error::AssistantError;
use crate::parser::{parse_response, AssistantResponse, FALLBACK_MESSAGE};
use daycoach_config::AppConfig;
use daycoach_core::context::RequestType;
use daycoach_core::locale::Locale;
use daycoach_core::session::{ChatSession, SessionId, SessionMessage, SessionSeed, SessionStore};
use daycoach_core::tier::Tier;
use daycoach_memory::{response_cache_key, TtlCache};
use daycoach_providers::{ChatOptions, ModelRouter};
use daycoach_security::{ContentFilter, RejectionKind};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_RESPONSE_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_HISTORY_WINDOW: usize = 10;

/// One learner message plus the client's view of where they are.
///
/// `day` and `language_id` only select the response cache entry to read.
/// The prompt, and the entry a fresh answer is stored under, always follow
/// the progress store's live state.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub user_id: String,
    pub tier: Tier,
    pub message: String,
    pub day: u32,
    pub language_id: String,
    pub request_type: RequestType,
    pub session_id: Option<SessionId>,
    pub locale: Locale,
}

impl ChatRequest {
    pub fn new(
        user_id: impl Into<String>,
        message: impl Into<String>,
        day: u32,
        language_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            tier: Tier::Free,
            message: message.into(),
            day,
            language_id: language_id.into(),
            request_type: RequestType::Chat,
            session_id: None,
            locale: Locale::Ru,
        }
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_request_type(mut self, request_type: RequestType) -> Self {
        self.request_type = request_type;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReplyStatus {
    Answered,
    Cached,
    Rejected {
        reason: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        kind: Option<RejectionKind>,
        #[serde(skip_serializing_if = "Option::is_none")]
        blocked: Option<Vec<String>>,
    },
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantReply {
    pub response: AssistantResponse,
    /// Session the exchange was written to. New turns get a fresh one.
    pub session_id: Option<SessionId>,
    #[serde(flatten)]
    pub status: ReplyStatus,
    pub fallback_used: bool,
}

impl AssistantReply {
    fn new(response: AssistantResponse, session_id: Option<SessionId>, status: ReplyStatus) -> Self {
        Self {
            response,
            session_id,
            status,
            fallback_used: false,
        }
    }
}

pub struct AssistantService {
    filter: ContentFilter,
    aggregator: Arc<ContextAggregator>,
    router: Arc<ModelRouter>,
    sessions: Arc<dyn SessionStore>,
    responses: TtlCache<AssistantResponse>,
    response_ttl: Duration,
    history_window: usize,
    timeout: Option<Duration>,
}

impl AssistantService {
    pub fn new(
        aggregator: Arc<ContextAggregator>,
        router: Arc<ModelRouter>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            filter: ContentFilter::default(),
            aggregator,
            router,
            sessions,
            responses: TtlCache::new(),
            response_ttl: DEFAULT_RESPONSE_TTL,
            history_window: DEFAULT_HISTORY_WINDOW,
            timeout: None,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        aggregator: Arc<ContextAggregator>,
        router: Arc<ModelRouter>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let responses = match config.cache.max_response_entries {
            Some(limit) => TtlCache::with_capacity_limit(limit),
            None => TtlCache::new(),
        };
        Self {
            filter: ContentFilter::new(config.filter.max_length),
            responses,
            response_ttl: config.cache.response_ttl(),
            history_window: config.session.history_window,
            timeout: Some(config.request_timeout()),
            ..Self::new(aggregator, router, sessions)
        }
    }

    pub fn with_response_ttl(mut self, ttl: Duration) -> Self {
        self.response_ttl = ttl;
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Bound each model attempt.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_filter(mut self, filter: ContentFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Run one turn. Failures come back as `Rejected` or `Failed` replies
    /// carrying user-safe text.
    pub async fn chat(&self, request: &ChatRequest) -> AssistantReply {
        match self.try_chat(request).await {
            Ok(reply) => reply,
            Err(AssistantError::ContentRejected {
                reason,
                kind,
                blocked,
            }) => AssistantReply::new(
                AssistantResponse::text(reason.clone()),
                request.session_id.clone(),
                ReplyStatus::Rejected {
                    reason,
                    kind,
                    blocked,
                },
            ),
            Err(err) => {
                warn!(user = %request.user_id, error = %err, "Chat turn failed");
                AssistantReply::new(
                    AssistantResponse::text(err.user_message(request.locale)),
                    request.session_id.clone(),
                    ReplyStatus::Failed,
                )
            }
        }
    }

    pub async fn try_chat(&self, request: &ChatRequest) -> Result<AssistantReply, AssistantError> {
        // Filtered
        let filtered = self.filter.check(&request.message, request.locale);
        if !filtered.allowed {
            warn!(
                user = %request.user_id,
                kind = ?filtered.kind,
                "Message rejected by content filter"
            );
            return Err(AssistantError::ContentRejected {
                reason: filtered.reason.unwrap_or_default(),
                kind: filtered.kind,
                blocked: filtered.blocked,
            });
        }
        if filtered.sanitized.is_empty() {
            return Err(AssistantError::ContentRejected {
                reason: empty_message_reason(request.locale).into(),
                kind: None,
                blocked: None,
            });
        }
        let text = filtered.sanitized;

        let existing = match &request.session_id {
            Some(id) => Some(
                self.sessions
                    .get_owned_session(&request.user_id, id)
                    .await
                    .ok_or_else(|| AssistantError::SessionNotFound(id.clone()))?,
            ),
            None => None,
        };

        // CacheHit
        let key = response_cache_key(
            &text,
            request.day,
            &request.language_id,
            request.request_type.as_str(),
        );
        if let Some(response) = self.responses.get(&key) {
            debug!(user = %request.user_id, "Response cache hit");
            return Ok(AssistantReply::new(
                response,
                existing.map(|session| session.id),
                ReplyStatus::Cached,
            ));
        }

        // ContextBuilt
        let mut context = self
            .aggregator
            .get_user_context(&request.user_id, request.tier)
            .await?;
        if let Some(session) = &existing {
            let history = self
                .sessions
                .get_recent_messages(&session.id, self.history_window)
                .await;
            context = context.with_recent_messages(history, self.history_window);
        }
        let messages = build_messages(&context, request.request_type, request.locale, &text);
        // The answer is written for the live position, which may differ from
        // the one the client sent.
        let answer_key = response_cache_key(
            &text,
            context.current_day,
            &context.language_id,
            request.request_type.as_str(),
        );

        // ModelCalled
        let completion = self
            .router
            .chat_completion(
                messages,
                ChatOptions {
                    tier: request.tier,
                    timeout: self.timeout,
                    ..ChatOptions::default()
                },
            )
            .await?;

        // Parsed
        let response = parse_response(&completion.raw)
            .with_metadata(completion.model.clone(), completion.data.usage);
        let degraded = is_degraded(&response);
        let stored_answer = if degraded {
            response.message.clone()
        } else {
            completion.raw.clone()
        };

        // Persisted
        let session_id = match existing {
            Some(session) => {
                self.sessions
                    .add_messages(
                        &session.id,
                        vec![
                            SessionMessage::user(session.id.clone(), text),
                            SessionMessage::assistant(session.id.clone(), stored_answer),
                        ],
                    )
                    .await?;
                session.id
            }
            None => {
                let mut session = ChatSession::new(
                    request.user_id.clone(),
                    SessionSeed {
                        day: context.current_day,
                        language_id: context.language_id.clone(),
                    },
                );
                session.messages.push(SessionMessage::user(session.id.clone(), text));
                session
                    .messages
                    .push(SessionMessage::assistant(session.id.clone(), stored_answer));
                let id = session.id.clone();
                self.sessions.insert_session(session).await?;
                id
            }
        };

        // CachedOut
        if degraded {
            debug!(user = %request.user_id, "Degraded model output, not caching");
        } else {
            self.responses.set(answer_key, response.clone(), self.response_ttl);
        }

        info!(
            user = %request.user_id,
            session = %session_id,
            model = %completion.model,
            tier = %completion.tier,
            fallback = completion.fallback_used,
            code_blocks = response.code_block_count(),
            "Chat turn answered"
        );

        Ok(AssistantReply {
            response,
            session_id: Some(session_id),
            status: ReplyStatus::Answered,
            fallback_used: completion.fallback_used,
        })
    }

    /// Call after the learner's progress or achievements change.
    pub fn on_progress_changed(&self, user_id: &str) {
        self.aggregator.invalidate_cache(user_id);
    }

    /// Hard-delete every session of `user_id` and drop their cached context.
    pub async fn forget_user(&self, user_id: &str) -> usize {
        self.aggregator.invalidate_cache(user_id);
        self.sessions.clear_user_sessions(user_id).await
    }

    pub fn cached_responses(&self) -> usize {
        self.responses.size()
    }

    pub fn clear_response_cache(&self) {
        self.responses.clear();
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub fn aggregator(&self) -> &ContextAggregator {
        &self.aggregator
    }
}

fn is_degraded(response: &AssistantResponse) -> bool {
    response.code_examples.is_none() && response.message == FALLBACK_MESSAGE
}

fn empty_message_reason(locale: Locale) -> &'static str {
    match locale {
        Locale::Ru => "Сообщение пустое. Напишите свой вопрос.",
        Locale::En => "The message is empty. Please type your question.",
    }
}
