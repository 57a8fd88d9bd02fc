//! Primary/fallback speech orchestration.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{info, warn};

use super::payload::SpeechPayload;
use super::{FallbackSpeechEngine, PrimarySpeechEngine};
use crate::error::{PipelineError, Result};
use crate::pipeline::messages::{AudioArtifact, StoryText};

/// Which path produced the audio, or why none did.
#[derive(Debug)]
pub enum SynthesisOutcome {
    /// WAV bytes from the primary engine.
    Primary(Vec<u8>),
    /// MP3 bytes from the fallback engine.
    Fallback(Vec<u8>),
    /// Both paths failed.
    Failed(PipelineError),
}

impl SynthesisOutcome {
    /// Attach the MIME type matching the path that ran.
    ///
    /// # Errors
    ///
    /// Returns the stored error for [`SynthesisOutcome::Failed`].
    pub fn into_artifact(self) -> Result<AudioArtifact> {
        match self {
            Self::Primary(bytes) => Ok(AudioArtifact::wav(bytes)),
            Self::Fallback(bytes) => Ok(AudioArtifact::mpeg(bytes)),
            Self::Failed(err) => Err(err),
        }
    }

    /// Whether the fallback engine produced the audio.
    pub fn used_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Speech synthesis with silent fallback.
///
/// Any primary failure (transport error, undecodable payload, no audio in
/// the response) switches to the fallback engine. Only a fallback failure
/// is reported to the caller.
pub struct SpeechSynthesizer {
    primary: Arc<dyn PrimarySpeechEngine>,
    fallback: Arc<dyn FallbackSpeechEngine>,
    fallback_count: AtomicU32,
}

impl std::fmt::Debug for SpeechSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechSynthesizer")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.name())
            .field("fallback_count", &self.fallback_count())
            .finish()
    }
}

impl SpeechSynthesizer {
    /// Create a synthesizer over a primary and a fallback engine.
    pub fn new(
        primary: Arc<dyn PrimarySpeechEngine>,
        fallback: Arc<dyn FallbackSpeechEngine>,
    ) -> Self {
        Self {
            primary,
            fallback,
            fallback_count: AtomicU32::new(0),
        }
    }

    /// How many times the fallback engine has been used.
    pub fn fallback_count(&self) -> u32 {
        self.fallback_count.load(Ordering::Relaxed)
    }

    /// Run the primary engine, falling back on any failure.
    pub async fn attempt(&self, text: &StoryText) -> SynthesisOutcome {
        if text.is_empty() {
            return SynthesisOutcome::Failed(PipelineError::SpeechSynthesis(
                "no text to speak".into(),
            ));
        }

        let reason = match self.primary.speak(text.as_str()).await {
            Ok(SpeechPayload::Audio { bytes, source }) => {
                info!(
                    engine = self.primary.name(),
                    source = source.as_str(),
                    bytes = bytes.len(),
                    mime = "audio/wav",
                    "primary speech ready"
                );
                return SynthesisOutcome::Primary(bytes);
            }
            Ok(SpeechPayload::Absent) => "response carried no audio".to_owned(),
            Err(e) => e.to_string(),
        };

        self.fallback_count.fetch_add(1, Ordering::Relaxed);
        warn!(
            primary = self.primary.name(),
            fallback = self.fallback.name(),
            %reason,
            "primary speech failed, using fallback"
        );

        match self.fallback.speak(text.as_str()).await {
            Ok(bytes) if !bytes.is_empty() => {
                info!(
                    engine = self.fallback.name(),
                    bytes = bytes.len(),
                    mime = "audio/mpeg",
                    "fallback speech ready"
                );
                SynthesisOutcome::Fallback(bytes)
            }
            Ok(_) => SynthesisOutcome::Failed(PipelineError::SpeechSynthesis(
                "fallback engine returned no audio".into(),
            )),
            Err(PipelineError::SpeechSynthesis(msg)) => {
                SynthesisOutcome::Failed(PipelineError::SpeechSynthesis(msg))
            }
            Err(other) => {
                SynthesisOutcome::Failed(PipelineError::SpeechSynthesis(other.to_string()))
            }
        }
    }

    /// Synthesize `text` into an [`AudioArtifact`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::SpeechSynthesis`] when both engines fail.
    pub async fn synthesize(&self, text: &StoryText) -> Result<AudioArtifact> {
        self.attempt(text).await.into_artifact()
    }
}
