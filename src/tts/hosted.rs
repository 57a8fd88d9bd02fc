//! Primary engine: OpenAI-compatible hosted speech endpoint.
//!
//! `POST {api_url}/v1/audio/speech` with `{model, voice, input,
//! response_format}`; the response is handed to [`extract_payload`].

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::PrimarySpeechEngine;
use super::payload::{SpeechPayload, extract_payload};
use crate::config::{ApiKey, PrimarySpeechConfig};
use crate::error::{PipelineError, Result};

/// Hosted WAV speech engine.
pub struct HostedSpeechEngine {
    config: PrimarySpeechConfig,
    api_key: ApiKey,
    client: reqwest::Client,
}

impl std::fmt::Debug for HostedSpeechEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedSpeechEngine")
            .field("api_url", &self.config.api_url)
            .field("model", &self.config.model)
            .field("voice", &self.config.voice)
            .finish()
    }
}

impl HostedSpeechEngine {
    /// Create an engine with its own HTTP client.
    pub fn new(config: PrimarySpeechConfig, api_key: ApiKey) -> Self {
        Self::with_client(config, api_key, reqwest::Client::new())
    }

    /// Create an engine sharing an existing HTTP client.
    pub fn with_client(
        config: PrimarySpeechConfig,
        api_key: ApiKey,
        client: reqwest::Client,
    ) -> Self {
        Self {
            config,
            api_key,
            client,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/audio/speech", self.config.api_url.trim_end_matches('/'))
    }

    /// JSON body for one synthesis request.
    pub fn request_body(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "voice": self.config.voice,
            "input": text,
            "response_format": self.config.response_format,
        })
    }
}

#[async_trait]
impl PrimarySpeechEngine for HostedSpeechEngine {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn speak(&self, text: &str) -> Result<SpeechPayload> {
        let url = self.endpoint();
        debug!(
            url = %url,
            voice = %self.config.voice,
            chars = text.len(),
            "requesting primary speech"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|e| PipelineError::SpeechSynthesis(format!("speech request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("error")
                        .and_then(|e| e.get("message"))
                        .and_then(|m| m.as_str())
                        .map(String::from)
                })
                .unwrap_or(body);
            return Err(PipelineError::SpeechSynthesis(format!(
                "speech API HTTP {}: {message}",
                status.as_u16()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await.map_err(|e| {
            PipelineError::SpeechSynthesis(format!("failed to read speech response: {e}"))
        })?;

        extract_payload(content_type.as_deref(), &body)
    }
}
