//! Error types for the storycast pipeline.
//!
//! Each variant carries a stable error code (SCREAMING_SNAKE_CASE) that is
//! part of the Display output and accessible via [`PipelineError::code()`].

/// Stable error codes for programmatic error handling.
pub mod error_codes {
    /// The captioning model could not describe the image.
    pub const CAPTIONING_FAILED: &str = "CAPTIONING_FAILED";

    /// The language model stream could not be consumed.
    pub const STORY_GENERATION_FAILED: &str = "STORY_GENERATION_FAILED";

    /// Both the primary and the fallback speech engines failed.
    pub const SPEECH_SYNTHESIS_FAILED: &str = "SPEECH_SYNTHESIS_FAILED";

    /// Invalid or missing configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// Local file I/O failed.
    pub const IO_ERROR: &str = "IO_ERROR";
}

/// Top-level error type for the caption → story → speech pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Image captioning failed. Fatal: nothing downstream runs.
    #[error("[{}] {}", error_codes::CAPTIONING_FAILED, .0)]
    Captioning(String),

    /// Story generation failed. Fatal, but the caption already exists.
    #[error("[{}] {}", error_codes::STORY_GENERATION_FAILED, .0)]
    StoryGeneration(String),

    /// Speech synthesis failed on both engines. Not fatal to a pipeline run.
    #[error("[{}] {}", error_codes::SPEECH_SYNTHESIS_FAILED, .0)]
    SpeechSynthesis(String),

    /// Configuration error, raised at startup.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    Configuration(String),

    /// I/O error.
    #[error("[{}] {}", error_codes::IO_ERROR, .0)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Captioning(_) => error_codes::CAPTIONING_FAILED,
            Self::StoryGeneration(_) => error_codes::STORY_GENERATION_FAILED,
            Self::SpeechSynthesis(_) => error_codes::SPEECH_SYNTHESIS_FAILED,
            Self::Configuration(_) => error_codes::CONFIG_INVALID,
            Self::Io(_) => error_codes::IO_ERROR,
        }
    }

    /// Whether this error aborts a pipeline run.
    ///
    /// Only a synthesis failure leaves the caption and story usable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::SpeechSynthesis(_))
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_prefix() {
        let err = PipelineError::Captioning("unsupported image".into());
        let display = err.to_string();
        assert!(display.starts_with("[CAPTIONING_FAILED]"));
        assert!(display.contains("unsupported image"));
    }

    #[test]
    fn codes_match_variants() {
        assert_eq!(
            PipelineError::StoryGeneration("x".into()).code(),
            "STORY_GENERATION_FAILED"
        );
        assert_eq!(
            PipelineError::SpeechSynthesis("x".into()).code(),
            "SPEECH_SYNTHESIS_FAILED"
        );
        assert_eq!(
            PipelineError::Configuration("x".into()).code(),
            "CONFIG_INVALID"
        );
        let io = PipelineError::from(std::io::Error::other("disk full"));
        assert_eq!(io.code(), "IO_ERROR");
    }

    #[test]
    fn only_synthesis_is_non_fatal() {
        assert!(PipelineError::Captioning("x".into()).is_fatal());
        assert!(PipelineError::StoryGeneration("x".into()).is_fatal());
        assert!(PipelineError::Configuration("x".into()).is_fatal());
        assert!(!PipelineError::SpeechSynthesis("x".into()).is_fatal());
    }

    #[test]
    fn all_codes_are_screaming_snake_case() {
        let errors = [
            PipelineError::Captioning("x".into()),
            PipelineError::StoryGeneration("x".into()),
            PipelineError::SpeechSynthesis("x".into()),
            PipelineError::Configuration("x".into()),
        ];
        for err in &errors {
            let code = err.code();
            assert!(
                code.chars().all(|c| c.is_ascii_uppercase() || c == '_'),
                "code {code:?} is not SCREAMING_SNAKE_CASE"
            );
        }
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PipelineError>();
    }
}
