//! Storycast: turn a picture into a short spoken comedy bit.
//!
//! This crate provides a three-stage pipeline:
//! Image → Caption → Story → Speech
//!
//! # Architecture
//!
//! Each stage wraps a hosted model behind a trait so it can be swapped or
//! faked in tests:
//! - **Captioning**: image-to-text model on the Hugging Face inference API
//! - **Story**: streamed chat completion from an OpenAI-compatible server
//! - **Speech**: hosted WAV voice, with Google Translate MP3 as fallback
//!
//! Captioning and story failures abort a run. Speech failures only mark the
//! audio as unavailable.

pub mod caption;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod progress;
pub mod startup;
pub mod story;
pub mod tts;

pub use config::AppConfig;
pub use error::{PipelineError, Result};
pub use pipeline::coordinator::{AppContext, PipelineCoordinator, Stage, StageFailure};
pub use pipeline::messages::{
    AudioArtifact, AudioMime, Caption, ImageInput, PipelineResult, StoryText,
};
pub use progress::{PipelineEvent, ProgressCallback};
