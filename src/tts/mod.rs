//! Text-to-speech with a hosted primary engine and an MP3 fallback.
//!
//! The primary engine returns WAV through an OpenAI-compatible speech API
//! whose response shape varies; [`payload`] normalizes it. When it fails
//! for any reason the [`SpeechSynthesizer`] silently switches to the
//! Google Translate fallback, which returns MP3.

mod hosted;
pub mod payload;
mod synthesizer;
mod translate;

pub use hosted::HostedSpeechEngine;
pub use payload::{PayloadSource, SpeechPayload, extract_payload};
pub use synthesizer::{SpeechSynthesizer, SynthesisOutcome};
pub use translate::{TranslateSpeechEngine, split_for_tts};

use async_trait::async_trait;

use crate::error::Result;

/// The preferred engine: WAV audio, unreliable response shape.
#[async_trait]
pub trait PrimarySpeechEngine: Send + Sync {
    /// Engine identifier for logging.
    fn name(&self) -> &str;

    /// Synthesize `text`, reporting where (or whether) audio was found.
    async fn speak(&self, text: &str) -> Result<SpeechPayload>;
}

/// The backup engine: MP3 audio.
#[async_trait]
pub trait FallbackSpeechEngine: Send + Sync {
    /// Engine identifier for logging.
    fn name(&self) -> &str;

    /// Synthesize `text` into MP3 bytes.
    async fn speak(&self, text: &str) -> Result<Vec<u8>>;
}
