//! Configuration types for the caption → story → speech pipeline.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable holding the language-model / speech API key.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Environment variable holding the optional captioning API token.
pub const CAPTION_TOKEN_ENV: &str = "HF_TOKEN";

/// A secret that never shows up in `Debug` output or logs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The plaintext value, for building request headers only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether no (non-blank) secret is set.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("\"\"")
        } else {
            f.write_str("[REDACTED]")
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// API key shared by the story and primary speech providers.
    ///
    /// Required. `GROQ_API_KEY` in the environment overrides this value.
    pub api_key: ApiKey,
    /// Image captioning settings.
    pub caption: CaptionConfig,
    /// Story generation settings.
    pub story: StoryConfig,
    /// Speech synthesis settings.
    pub speech: SpeechConfig,
}

/// Image captioning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Base URL of the inference API.
    pub api_url: String,
    /// Captioning model repo ID.
    pub model_id: String,
    /// Optional bearer token for the inference API.
    pub api_token: ApiKey,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api-inference.huggingface.co".to_owned(),
            model_id: "Salesforce/blip-image-captioning-base".to_owned(),
            api_token: ApiKey::default(),
            timeout_secs: 60,
        }
    }
}

/// Story generation (language model) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    /// Base URL of the OpenAI-compatible chat API.
    pub api_url: String,
    /// Model to request.
    pub model_name: String,
    /// Sampling temperature (0.0 to 2.0). High on purpose: variety over repeatability.
    pub temperature: f64,
    /// Log every streamed fragment at debug level.
    pub verbose: bool,
    /// Word budget quoted in the prompt. Not enforced on the output.
    pub max_words: usize,
    /// Optional cap on generated tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Prompt sent as the single user message.
    ///
    /// `{topic}` is replaced by the caption, `{max_words}` by [`Self::max_words`].
    pub prompt_template: String,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai".to_owned(),
            model_name: "llama-3.3-70b-versatile".to_owned(),
            temperature: 1.0,
            verbose: true,
            max_words: 60,
            max_tokens: None,
            timeout_secs: 120,
            prompt_template: "You are a stand-up comedian, similar to Bill Burr. \
                              Generate a short (max {max_words} words), \
                              funny story based on: {topic}."
                .to_owned(),
        }
    }
}

/// Speech synthesis configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Hosted primary engine (WAV output).
    pub primary: PrimarySpeechConfig,
    /// Fallback engine (MP3 output).
    pub fallback: FallbackSpeechConfig,
}

/// Primary hosted text-to-speech configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimarySpeechConfig {
    /// Base URL of the OpenAI-compatible speech API.
    pub api_url: String,
    /// Speech model name.
    pub model: String,
    /// Voice name.
    pub voice: String,
    /// Requested audio encoding.
    pub response_format: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for PrimarySpeechConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai".to_owned(),
            model: "playai-tts".to_owned(),
            voice: "Aaliyah-PlayAI".to_owned(),
            response_format: "wav".to_owned(),
            timeout_secs: 60,
        }
    }
}

/// Fallback text-to-speech configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackSpeechConfig {
    /// Base URL of the translate TTS endpoint.
    pub base_url: String,
    /// Language code for the voice.
    pub lang: String,
    /// Longest text fragment sent per request.
    pub max_chunk_chars: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FallbackSpeechConfig {
    fn default() -> Self {
        Self {
            base_url: "https://translate.google.com".to_owned(),
            lang: "en".to_owned(),
            max_chunk_chars: 100,
            timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if the file cannot be read
    /// or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            PipelineError::Configuration(format!("{}: {e}", path.display()))
        })
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/storycast/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| std::env::temp_dir().join("storycast-config"))
            .join("storycast")
            .join("config.toml")
    }

    /// Load from `path`, or from the default path when it exists, or defaults.
    ///
    /// Environment overrides are applied afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given or existing default file is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::default_config_path();
                if default_path.is_file() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(key) = present(API_KEY_ENV) {
            self.api_key = ApiKey::new(key);
        }
        if let Some(token) = present(CAPTION_TOKEN_ENV) {
            self.caption.api_token = ApiKey::new(token);
        }
    }

    /// Return the required API key.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] when no key is set.
    pub fn require_api_key(&self) -> Result<&ApiKey> {
        if self.api_key.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "missing {API_KEY_ENV}: set it in the environment, a .env file, \
                 or `api_key` in the config file"
            )));
        }
        Ok(&self.api_key)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PipelineError::Configuration(msg));

        if !(0.0..=2.0).contains(&self.story.temperature) {
            return invalid(format!(
                "story.temperature must be within 0.0..=2.0, got {}",
                self.story.temperature
            ));
        }
        if self.story.model_name.trim().is_empty() {
            return invalid("story.model_name is empty".into());
        }
        if !self.story.prompt_template.contains("{topic}") {
            return invalid("story.prompt_template must contain {topic}".into());
        }
        if self.caption.model_id.trim().is_empty() {
            return invalid("caption.model_id is empty".into());
        }
        if self.speech.primary.model.trim().is_empty()
            || self.speech.primary.voice.trim().is_empty()
        {
            return invalid("speech.primary.model and speech.primary.voice must be set".into());
        }
        if self.speech.fallback.max_chunk_chars == 0 {
            return invalid("speech.fallback.max_chunk_chars must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn defaults_match_reference_models() {
        let config = AppConfig::default();
        assert_eq!(config.caption.model_id, "Salesforce/blip-image-captioning-base");
        assert_eq!(config.story.model_name, "llama-3.3-70b-versatile");
        assert!((config.story.temperature - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.speech.primary.model, "playai-tts");
        assert_eq!(config.speech.primary.voice, "Aaliyah-PlayAI");
        assert_eq!(config.speech.primary.response_format, "wav");
        assert_eq!(config.speech.fallback.max_chunk_chars, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_api_key_is_configuration_error() {
        let config = AppConfig::default();
        let err = config.require_api_key().unwrap_err();
        assert_eq!(err.code(), "CONFIG_INVALID");
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = AppConfig {
            api_key: ApiKey::new("   "),
            ..AppConfig::default()
        };
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = AppConfig {
            api_key: ApiKey::new("from-file"),
            ..AppConfig::default()
        };
        config.apply_env(|key| match key {
            API_KEY_ENV => Some("from-env".to_owned()),
            CAPTION_TOKEN_ENV => Some("hf-token".to_owned()),
            _ => None,
        });
        assert_eq!(config.api_key.expose(), "from-env");
        assert_eq!(config.caption.api_token.expose(), "hf-token");
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = AppConfig {
            api_key: ApiKey::new("from-file"),
            ..AppConfig::default()
        };
        config.apply_env(|_| Some(String::new()));
        assert_eq!(config.api_key.expose(), "from-file");
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let config = AppConfig {
            api_key: ApiKey::new("gsk_supersecret"),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("gsk_supersecret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            api_key = "k"

            [story]
            temperature = 0.4
            "#,
        )
        .unwrap();
        assert_eq!(config.api_key.expose(), "k");
        assert!((config.story.temperature - 0.4).abs() < f64::EPSILON);
        assert_eq!(config.story.model_name, "llama-3.3-70b-versatile");
        assert_eq!(config.speech.fallback.lang, "en");
    }

    #[test]
    fn validate_rejects_out_of_range_temperature() {
        let mut config = AppConfig::default();
        config.story.temperature = 3.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn validate_rejects_template_without_topic() {
        let mut config = AppConfig::default();
        config.story.prompt_template = "Tell a joke.".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_chunk_size() {
        let mut config = AppConfig::default();
        config.speech.fallback.max_chunk_chars = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = AppConfig::default_config_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.ends_with("config.toml"));
        assert!(path_str.contains("storycast"));
    }

    #[test]
    fn invalid_toml_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "story = 12").unwrap();
        let err = AppConfig::from_file(&path).unwrap_err();
        assert_eq!(err.code(), "CONFIG_INVALID");
    }

    #[test]
    fn missing_explicit_config_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = AppConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert_eq!(err.code(), "CONFIG_INVALID");
        assert!(err.to_string().contains("absent.toml"));
        assert!(err.is_fatal());
    }
}
