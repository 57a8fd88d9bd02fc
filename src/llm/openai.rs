//! OpenAI-compatible chat completions adapter.
//!
//! Talks to any server exposing `POST {base_url}/v1/chat/completions`
//! (Groq's `https://api.groq.com/openai` by default) and normalizes the
//! `stream: true` SSE response into [`LlmEvent`]s. A server that ignores
//! `stream` and answers with a plain JSON completion is handled too.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tracing::debug;

use super::error::LlmError;
use super::events::{FinishReason, LlmEvent};
use super::sse::SseDecoder;
use super::types::{ChatMessage, RequestOptions};
use super::{ChatProvider, LlmEventStream};
use crate::config::ApiKey;

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Bearer token.
    pub api_key: ApiKey,
    /// Base URL without the `/v1/...` suffix.
    pub base_url: String,
    /// Model to request.
    pub model: String,
    /// Whole-request timeout, including the streamed body.
    pub timeout: Option<Duration>,
}

impl OpenAiConfig {
    /// Config for `model` on the default Groq endpoint.
    pub fn new(api_key: ApiKey, model: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: "https://api.groq.com/openai".into(),
            model: model.into(),
            timeout: None,
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Build the JSON request body for the Chat Completions API.
pub fn build_completions_request(
    model: &str,
    messages: &[ChatMessage],
    options: &RequestOptions,
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": model,
        "messages": messages,
        "stream": options.stream,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(temp) = options.temperature {
            obj.insert("temperature".into(), serde_json::json!(temp));
        }
        if let Some(max_tokens) = options.max_tokens {
            obj.insert("max_tokens".into(), serde_json::json!(max_tokens));
        }
    }

    body
}

/// Parse one streamed `data:` payload.
///
/// Malformed JSON and in-band `{"error": ...}` objects become `StreamError`.
pub fn parse_completions_chunk(data: &str) -> Vec<LlmEvent> {
    let parsed: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            return vec![LlmEvent::StreamError {
                error: format!("malformed stream chunk: {e}"),
            }];
        }
    };

    if let Some(error) = parsed.get("error") {
        return vec![LlmEvent::StreamError {
            error: extract_error_message(error),
        }];
    }

    let mut events = Vec::new();
    let choices = parsed.get("choices").and_then(|c| c.as_array());
    for choice in choices.into_iter().flatten() {
        if let Some(text) = choice
            .get("delta")
            .and_then(|d| d.get("content"))
            .and_then(|c| c.as_str())
            .filter(|t| !t.is_empty())
        {
            events.push(LlmEvent::TextDelta {
                text: text.to_owned(),
            });
        }
        if let Some(reason) = choice.get("finish_reason").and_then(|f| f.as_str()) {
            events.push(LlmEvent::StreamEnd {
                finish_reason: FinishReason::from_provider(reason),
            });
        }
    }
    events
}

/// Parse a non-streamed `chat.completion` body into the same event shape.
pub fn parse_completion_body(body: &str) -> Vec<LlmEvent> {
    let parsed: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            return vec![LlmEvent::StreamError {
                error: format!("malformed completion body: {e}"),
            }];
        }
    };

    let choice = parsed
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first());
    let Some(choice) = choice else {
        return vec![LlmEvent::StreamError {
            error: "completion has no choices".into(),
        }];
    };

    let mut events = Vec::new();
    if let Some(text) = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .filter(|t| !t.is_empty())
    {
        events.push(LlmEvent::TextDelta {
            text: text.to_owned(),
        });
    }
    let reason = choice
        .get("finish_reason")
        .and_then(|f| f.as_str())
        .unwrap_or("stop");
    events.push(LlmEvent::StreamEnd {
        finish_reason: FinishReason::from_provider(reason),
    });
    events
}

/// Pull a human-readable message out of an OpenAI-style error value.
fn extract_error_message(error: &serde_json::Value) -> String {
    error
        .get("message")
        .and_then(|m| m.as_str())
        .map(String::from)
        .unwrap_or_else(|| error.to_string())
}

/// Map an HTTP error status to the appropriate [`LlmError`].
fn map_http_error(status: reqwest::StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").map(extract_error_message))
        .unwrap_or_else(|| body.to_owned());
    match status.as_u16() {
        401 | 403 => LlmError::AuthError(format!("authentication failed: {message}")),
        429 => LlmError::RequestError(format!("rate limited: {message}")),
        _ => LlmError::ProviderError(format!("HTTP {}: {message}", status.as_u16())),
    }
}

/// Streaming chat adapter for OpenAI-compatible servers.
pub struct OpenAiAdapter {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl OpenAiAdapter {
    /// Create an adapter with its own HTTP client.
    pub fn new(config: OpenAiConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Create an adapter sharing an existing HTTP client.
    pub fn with_client(config: OpenAiConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ChatProvider for OpenAiAdapter {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        options: &RequestOptions,
    ) -> Result<LlmEventStream, LlmError> {
        if self.config.api_key.is_empty() {
            return Err(LlmError::ConfigError("chat API key is empty".into()));
        }

        let url = self.endpoint();
        let body = build_completions_request(&self.config.model, messages, options);
        debug!(url = %url, model = %self.config.model, "sending chat request");

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.expose())
            .json(&body);
        if let Some(timeout) = self.config.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body_text));
        }

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("chat-req")
            .to_owned();
        let model = self.config.model.clone();

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let body = response
                .text()
                .await
                .map_err(|e| LlmError::StreamError(format!("failed to read body: {e}")))?;
            let mut events = vec![LlmEvent::StreamStart { request_id, model }];
            events.extend(parse_completion_body(&body));
            return Ok(Box::pin(futures_util::stream::iter(events)));
        }

        Ok(Box::pin(create_event_stream(
            response.bytes_stream(),
            request_id,
            model,
        )))
    }
}

/// Internal state for the event stream.
struct StreamState {
    byte_stream: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    decoder: SseDecoder,
    start: Option<LlmEvent>,
    queued: std::collections::VecDeque<LlmEvent>,
    finished: bool,
}

/// Turn the SSE byte stream into ordered [`LlmEvent`]s.
fn create_event_stream(
    byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    request_id: String,
    model: String,
) -> impl Stream<Item = LlmEvent> + Send {
    futures_util::stream::unfold(
        StreamState {
            byte_stream: Box::pin(byte_stream),
            decoder: SseDecoder::new(),
            start: Some(LlmEvent::StreamStart { request_id, model }),
            queued: std::collections::VecDeque::new(),
            finished: false,
        },
        |mut state| async move {
            if let Some(start) = state.start.take() {
                return Some((start, state));
            }
            loop {
                if let Some(event) = state.queued.pop_front() {
                    return Some((event, state));
                }
                if state.finished {
                    return None;
                }

                match state.byte_stream.next().await {
                    Some(Ok(chunk)) => {
                        for sse in state.decoder.push(&chunk) {
                            if !sse.is_done() {
                                state.queued.extend(parse_completions_chunk(&sse.data));
                            }
                        }
                    }
                    Some(Err(e)) => {
                        state.finished = true;
                        state.queued.push_back(LlmEvent::StreamError {
                            error: format!("stream read error: {e}"),
                        });
                    }
                    None => {
                        state.finished = true;
                        if let Some(sse) = state.decoder.finish().filter(|e| !e.is_done()) {
                            state.queued.extend(parse_completions_chunk(&sse.data));
                        }
                    }
                }
            }
        },
    )
}
