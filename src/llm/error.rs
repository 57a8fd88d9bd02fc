//! Error types for chat providers.
//!
//! Codes are stable and appear as a `[CODE]` prefix in the Display output.

use crate::error::PipelineError;

/// Stable error codes for chat provider failures.
pub mod error_codes {
    /// Invalid or missing provider configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// Authentication failed (invalid/missing API key).
    pub const AUTH_FAILED: &str = "AUTH_FAILED";

    /// The HTTP request could not be sent or was rate limited.
    pub const REQUEST_FAILED: &str = "REQUEST_FAILED";

    /// The response stream broke or reported an error.
    pub const STREAM_FAILED: &str = "STREAM_FAILED";

    /// Request timed out.
    pub const TIMEOUT_ERROR: &str = "TIMEOUT_ERROR";

    /// Any other provider-side failure (non-2xx status).
    pub const PROVIDER_ERROR: &str = "PROVIDER_ERROR";
}

/// Errors produced by chat providers.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Invalid or missing configuration.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    ConfigError(String),

    /// Authentication failed.
    #[error("[{}] {}", error_codes::AUTH_FAILED, .0)]
    AuthError(String),

    /// Request could not be sent, or was rate limited.
    #[error("[{}] {}", error_codes::REQUEST_FAILED, .0)]
    RequestError(String),

    /// Streaming response failed mid-flight.
    #[error("[{}] {}", error_codes::STREAM_FAILED, .0)]
    StreamError(String),

    /// Request timed out.
    #[error("[{}] {}", error_codes::TIMEOUT_ERROR, .0)]
    TimeoutError(String),

    /// Provider returned an error status.
    #[error("[{}] {}", error_codes::PROVIDER_ERROR, .0)]
    ProviderError(String),
}

impl LlmError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => error_codes::CONFIG_INVALID,
            Self::AuthError(_) => error_codes::AUTH_FAILED,
            Self::RequestError(_) => error_codes::REQUEST_FAILED,
            Self::StreamError(_) => error_codes::STREAM_FAILED,
            Self::TimeoutError(_) => error_codes::TIMEOUT_ERROR,
            Self::ProviderError(_) => error_codes::PROVIDER_ERROR,
        }
    }

    /// Returns the inner message without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::ConfigError(m)
            | Self::AuthError(m)
            | Self::RequestError(m)
            | Self::StreamError(m)
            | Self::TimeoutError(m)
            | Self::ProviderError(m) => m,
        }
    }

    /// Whether a caller could reasonably retry.
    ///
    /// The story stage never retries; this is reported in its failure log.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConfigError(_) | Self::AuthError(_) => false,
            Self::RequestError(_)
            | Self::StreamError(_)
            | Self::TimeoutError(_)
            | Self::ProviderError(_) => true,
        }
    }

    /// Classify a transport error from `reqwest`.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TimeoutError(format!("chat request timed out: {err}"))
        } else {
            Self::RequestError(format!("chat request failed: {err}"))
        }
    }
}

impl From<LlmError> for PipelineError {
    fn from(err: LlmError) -> Self {
        PipelineError::StoryGeneration(err.to_string())
    }
}

/// Convenience alias for chat provider results.
pub type Result<T> = std::result::Result<T, LlmError>;
