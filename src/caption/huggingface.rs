//! Hugging Face inference API captioner.
//!
//! Posts the raw image bytes to `{api_url}/models/{model_id}` and reads the
//! image-to-text task output:
//!
//! ```text
//! [{"generated_text": "a dog sitting on a couch"}]
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{CaptionCandidate, CaptionModel};
use crate::config::CaptionConfig;
use crate::error::{PipelineError, Result};
use crate::pipeline::messages::ImageInput;

/// Image-to-text task output entry.
#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
    #[serde(default)]
    score: Option<f32>,
}

/// Error body returned while a model is loading or rejects the input.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    estimated_time: Option<f64>,
}

/// Captioner backed by a hosted image-to-text model.
pub struct HfCaptioner {
    config: CaptionConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for HfCaptioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HfCaptioner")
            .field("model_id", &self.config.model_id)
            .field("api_url", &self.config.api_url)
            .finish()
    }
}

impl HfCaptioner {
    /// Create a captioner with its own HTTP client.
    pub fn new(config: CaptionConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Create a captioner sharing an existing HTTP client.
    pub fn with_client(config: CaptionConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.model_id
        )
    }
}

/// Parse a successful response body into ranked candidates.
fn parse_candidates(body: &str) -> Result<Vec<CaptionCandidate>> {
    let parsed: Vec<GeneratedText> = serde_json::from_str(body)
        .map_err(|e| PipelineError::Captioning(format!("unexpected caption response: {e}")))?;
    Ok(parsed
        .into_iter()
        .map(|entry| CaptionCandidate {
            text: entry.generated_text,
            confidence: entry.score,
        })
        .collect())
}

/// Turn a non-success response into a captioning error.
fn map_http_error(status: reqwest::StatusCode, body: &str) -> PipelineError {
    let detail = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error,
            estimated_time: Some(wait),
        }) => format!("{error} (retry in ~{wait:.0}s)"),
        Ok(ErrorBody { error, .. }) => error,
        Err(_) => body.to_owned(),
    };
    PipelineError::Captioning(format!("caption API HTTP {}: {detail}", status.as_u16()))
}

#[async_trait]
impl CaptionModel for HfCaptioner {
    fn name(&self) -> &str {
        &self.config.model_id
    }

    async fn caption(&self, image: &ImageInput) -> Result<Vec<CaptionCandidate>> {
        let mut request = self
            .client
            .post(self.endpoint())
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .header("Content-Type", image.content_type())
            .body(image.bytes().to_vec());

        if !self.config.api_token.is_empty() {
            request = request.bearer_auth(self.config.api_token.expose());
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::Captioning(format!("caption request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::Captioning(format!("caption response unreadable: {e}")))?;

        if !status.is_success() {
            return Err(map_http_error(status, &body));
        }
        parse_candidates(&body)
    }
}
