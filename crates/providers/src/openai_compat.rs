//! OpenAI-compatible chat-completion provider.
//!
//! Works with OpenRouter, OpenAI, and any endpoint exposing
//! `/chat/completions`. The backend may answer with a single JSON object or
//! with a server-sent event stream; both are decoded into one complete
//! assistant message before `complete` returns.

use async_trait::async_trait;
use daycoach_core::error::ProviderError;
use daycoach_core::message::Message;
use daycoach_core::provider::{ProviderRequest, ProviderResponse, Usage};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DONE_SENTINEL: &str = "[DONE]";

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self::with_timeout(name, base_url, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to a default HTTP client");
                reqwest::Client::new()
            });

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// OpenRouter convenience constructor.
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": request.stream,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(format) = &request.response_format {
            body["response_format"] = format.clone();
        }
        if request.stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }
        body
    }
}

#[async_trait]
impl daycoach_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "provider '{}' has no API key",
                self.name
            )));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            stream = request.stream,
            "Sending completion request"
        );

        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if request.stream {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder.json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let event_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let text = read_body(response).await?;
        decode_completion(&text, event_stream)
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, ProviderError> {
    let mut byte_stream = response.bytes_stream();
    let mut raw = Vec::new();
    while let Some(chunk) = byte_stream.next().await {
        let bytes = chunk.map_err(|e| ProviderError::StreamInterrupted(e.to_string()))?;
        raw.extend_from_slice(&bytes);
    }
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

/// Decode a completion body into a provider response.
///
/// `event_stream` reflects the response content type. A body whose first
/// non-blank line is a `data:` field is treated as an event stream too,
/// since some proxies drop the header.
pub fn decode_completion(body: &str, event_stream: bool) -> Result<ProviderResponse, ProviderError> {
    CompletionPayload::decode(body, event_stream)?.into_response()
}

/// The two wire shapes a completion can arrive in.
enum CompletionPayload {
    Single(ApiResponse),
    Streamed(StreamedCompletion),
}

#[derive(Default)]
struct StreamedCompletion {
    model: Option<String>,
    content: String,
    usage: Option<ApiUsage>,
    chunks: usize,
    finished: bool,
}

impl CompletionPayload {
    fn decode(body: &str, event_stream: bool) -> Result<Self, ProviderError> {
        let looks_like_sse = body
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .is_some_and(|l| l.starts_with("data:"));

        if event_stream || looks_like_sse {
            return parse_event_stream(body).map(CompletionPayload::Streamed);
        }

        serde_json::from_str::<ApiResponse>(body)
            .map(CompletionPayload::Single)
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))
    }

    fn into_response(self) -> Result<ProviderResponse, ProviderError> {
        match self {
            CompletionPayload::Single(api) => {
                let choice = api
                    .choices
                    .into_iter()
                    .next()
                    .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

                Ok(ProviderResponse {
                    message: Message::assistant(choice.message.content.unwrap_or_default()),
                    usage: api.usage.map(Usage::from),
                    model: api.model,
                    metadata: serde_json::Map::new(),
                })
            }
            CompletionPayload::Streamed(stream) => {
                if stream.chunks == 0 {
                    return Err(ProviderError::InvalidResponse(
                        "Event stream carried no completion chunks".into(),
                    ));
                }
                if !stream.finished {
                    return Err(ProviderError::StreamInterrupted(format!(
                        "event stream ended without [DONE] after {} chunk(s)",
                        stream.chunks
                    )));
                }

                let mut metadata = serde_json::Map::new();
                metadata.insert("streamed".into(), serde_json::Value::Bool(true));

                Ok(ProviderResponse {
                    message: Message::assistant(stream.content),
                    usage: stream.usage.map(Usage::from),
                    model: stream.model.unwrap_or_default(),
                    metadata,
                })
            }
        }
    }
}

fn parse_event_stream(body: &str) -> Result<StreamedCompletion, ProviderError> {
    let mut out = StreamedCompletion::default();

    for line in body.lines() {
        let line = line.trim_end_matches('\r');

        // Skip blank separators and SSE comments
        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();

        if data == DONE_SENTINEL {
            out.finished = true;
            break;
        }

        match serde_json::from_str::<StreamResponse>(data) {
            Ok(chunk) => {
                out.chunks += 1;
                if out.model.is_none() {
                    out.model = chunk.model;
                }
                if let Some(usage) = chunk.usage {
                    out.usage = Some(usage);
                }
                if let Some(content) = chunk.choices.into_iter().next().and_then(|c| c.delta.content) {
                    out.content.push_str(&content);
                }
            }
            Err(e) => {
                trace!(error = %e, data, "Skipping unparseable stream chunk");
            }
        }
    }

    Ok(out)
}

// --- OpenAI API types (internal) ---

#[derive(Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

impl From<ApiUsage> for Usage {
    fn from(u: ApiUsage) -> Self {
        Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

#[derive(Deserialize)]
struct StreamResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
}
