//! Request-side types shared by chat providers.

use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// End-user turn.
    User,
    /// Model turn.
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote it.
    pub role: Role,
    /// Plain-text content.
    pub content: String,
}

impl ChatMessage {
    /// A user-role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Sampling and transport options for one request.
///
/// ```
/// use storycast::llm::RequestOptions;
///
/// let opts = RequestOptions::new().with_temperature(1.0).with_max_tokens(256);
/// assert_eq!(opts.max_tokens, Some(256));
/// assert!(opts.stream);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Sampling temperature. `None` uses the provider default.
    pub temperature: Option<f64>,
    /// Cap on generated tokens. `None` uses the provider default.
    pub max_tokens: Option<usize>,
    /// Request a streamed response.
    pub stream: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            temperature: None,
            max_tokens: None,
            stream: true,
        }
    }
}

impl RequestOptions {
    /// Streaming request with provider defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap_or_default();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }

    #[test]
    fn defaults_stream_without_sampling_overrides() {
        let opts = RequestOptions::new();
        assert!(opts.stream);
        assert!(opts.temperature.is_none());
        assert!(opts.max_tokens.is_none());
    }
}
