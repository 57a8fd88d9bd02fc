//! Startup: environment loading and provider construction.
//!
//! Call [`load_environment`] before reading configuration, then
//! [`build_context`] once. A missing API key fails here, never per request.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::caption::HfCaptioner;
use crate::config::AppConfig;
use crate::error::{PipelineError, Result};
use crate::llm::{OpenAiAdapter, OpenAiConfig};
use crate::pipeline::coordinator::AppContext;
use crate::story::StoryGenerator;
use crate::tts::{HostedSpeechEngine, SpeechSynthesizer, TranslateSpeechEngine};

/// Load a `.env` file from the working directory or its parents.
///
/// Returns the path that was loaded. A missing file is not an error;
/// variables already set in the process environment win.
pub fn load_environment() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!(path = %path.display(), ".env loaded");
            Some(path)
        }
        Err(e) => {
            debug!(error = %e, "no .env loaded");
            None
        }
    }
}

/// Build the shared HTTP client.
///
/// # Errors
///
/// Returns [`PipelineError::Configuration`] if the TLS backend cannot start.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("storycast/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| PipelineError::Configuration(format!("cannot build HTTP client: {e}")))
}

/// Construct every provider from `config`.
///
/// # Errors
///
/// Returns [`PipelineError::Configuration`] when the API key is missing or a
/// config value is out of range.
pub fn build_context(config: &AppConfig) -> Result<AppContext> {
    let api_key = config.require_api_key()?.clone();
    config.validate()?;

    let client = http_client()?;

    let captioner = HfCaptioner::with_client(config.caption.clone(), client.clone());

    let chat = OpenAiAdapter::with_client(
        OpenAiConfig::new(api_key.clone(), config.story.model_name.clone())
            .with_base_url(config.story.api_url.clone())
            .with_timeout(Duration::from_secs(config.story.timeout_secs)),
        client.clone(),
    );
    let story = StoryGenerator::new(Arc::new(chat), config.story.clone());

    let primary =
        HostedSpeechEngine::with_client(config.speech.primary.clone(), api_key, client.clone());
    let fallback = TranslateSpeechEngine::with_client(config.speech.fallback.clone(), client);
    let speech = SpeechSynthesizer::new(Arc::new(primary), Arc::new(fallback));

    info!(
        caption_model = %config.caption.model_id,
        story_model = %config.story.model_name,
        voice = %config.speech.primary.voice,
        "providers ready"
    );

    Ok(AppContext::new(Arc::new(captioner), story, speech))
}
