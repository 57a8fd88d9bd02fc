//! Pipeline orchestrator that runs the three stages in order.
//!
//! ```text
//! ImageInput ─► caption ─► story ─► speech ─► PipelineResult
//!                 fatal     fatal   non-fatal
//! ```
//!
//! Captioning and story failures abort the run with a [`StageFailure`].
//! A speech failure (both engines down) still returns the caption and the
//! story, with the audio slot holding the error.

use std::fmt;
use std::sync::Arc;

use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::caption::{CaptionModel, extract_caption};
use crate::error::PipelineError;
use crate::pipeline::messages::{Caption, ImageInput, PipelineResult};
use crate::progress::{PipelineEvent, ProgressCallback};
use crate::story::StoryGenerator;
use crate::tts::SpeechSynthesizer;

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Image to caption.
    Captioning,
    /// Caption to story.
    StoryGeneration,
    /// Story to audio.
    SpeechSynthesis,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Captioning => write!(f, "captioning"),
            Self::StoryGeneration => write!(f, "story generation"),
            Self::SpeechSynthesis => write!(f, "speech synthesis"),
        }
    }
}

/// A fatal stage failure.
///
/// When story generation fails the caption is already known and is kept so
/// the caller can still show it.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {source}")]
pub struct StageFailure {
    /// Stage that failed.
    pub stage: Stage,
    /// Caption, if captioning had already succeeded.
    pub caption: Option<Caption>,
    /// Underlying error.
    #[source]
    pub source: PipelineError,
}

/// Provider handles shared by every run.
///
/// Built once at startup (see [`crate::startup::build_context`]) and only
/// read afterwards, so one context can serve concurrent runs.
pub struct AppContext {
    /// Image captioner.
    pub captioner: Arc<dyn CaptionModel>,
    /// Story generator.
    pub story: StoryGenerator,
    /// Speech synthesizer.
    pub speech: SpeechSynthesizer,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("captioner", &self.captioner.name())
            .field("story", &self.story)
            .field("speech", &self.speech)
            .finish()
    }
}

impl AppContext {
    /// Bundle the stage providers.
    pub fn new(
        captioner: Arc<dyn CaptionModel>,
        story: StoryGenerator,
        speech: SpeechSynthesizer,
    ) -> Self {
        Self {
            captioner,
            story,
            speech,
        }
    }
}

/// Runs images through the pipeline.
pub struct PipelineCoordinator {
    context: Arc<AppContext>,
    progress: Option<ProgressCallback>,
}

impl PipelineCoordinator {
    /// Create a coordinator over a shared context.
    pub fn new(context: Arc<AppContext>) -> Self {
        Self {
            context,
            progress: None,
        }
    }

    /// Report progress events to `callback`.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// The shared provider context.
    pub fn context(&self) -> &AppContext {
        &self.context
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(callback) = &self.progress {
            callback(event);
        }
    }

    /// Caption `image`, write a story about it, and narrate the story.
    ///
    /// Stages run strictly in sequence. Returns once audio is fully
    /// materialized or known to be unavailable.
    ///
    /// # Errors
    ///
    /// Returns [`StageFailure`] if captioning or story generation fails.
    pub async fn run(&self, image: ImageInput) -> Result<PipelineResult, StageFailure> {
        let request_id = Uuid::new_v4();
        let span = info_span!("pipeline", %request_id, filename = image.filename());
        self.run_stages(image).instrument(span).await
    }

    async fn run_stages(&self, image: ImageInput) -> Result<PipelineResult, StageFailure> {
        let caption = extract_caption(self.context.captioner.as_ref(), &image)
            .await
            .map_err(|source| {
                error!(stage = %Stage::Captioning, error = %source, "pipeline aborted");
                StageFailure {
                    stage: Stage::Captioning,
                    caption: None,
                    source,
                }
            })?;
        drop(image);
        self.emit(PipelineEvent::CaptionReady {
            caption: caption.as_str().to_owned(),
        });

        let generated = self
            .context
            .story
            .generate_story_with(&caption, |fragment| {
                self.emit(PipelineEvent::StoryFragment {
                    text: fragment.to_owned(),
                });
            })
            .await;
        let story = match generated {
            Ok(story) => story,
            Err(source) => {
                error!(stage = %Stage::StoryGeneration, error = %source, "pipeline aborted");
                return Err(StageFailure {
                    stage: Stage::StoryGeneration,
                    caption: Some(caption),
                    source,
                });
            }
        };
        self.emit(PipelineEvent::StoryReady {
            story: story.as_str().to_owned(),
        });

        let audio = self.context.speech.attempt(&story).await.into_artifact();
        match &audio {
            Ok(artifact) => {
                info!(
                    mime = artifact.mime_type(),
                    bytes = artifact.bytes.len(),
                    "pipeline complete"
                );
                self.emit(PipelineEvent::AudioReady {
                    mime: artifact.mime,
                    bytes: artifact.bytes.len(),
                });
            }
            Err(e) => {
                warn!(stage = %Stage::SpeechSynthesis, error = %e, "audio unavailable");
                self.emit(PipelineEvent::AudioFailed {
                    message: e.to_string(),
                });
            }
        }

        Ok(PipelineResult {
            caption,
            story,
            audio,
        })
    }
}
