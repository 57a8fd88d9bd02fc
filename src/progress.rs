//! Progress events for a pipeline run.
//!
//! Provides callback-based reporting so a front end can show the caption
//! and the story as it streams in, while [`run`] itself still returns only
//! once every stage has finished.
//!
//! [`run`]: crate::pipeline::coordinator::PipelineCoordinator::run

use crate::pipeline::messages::AudioMime;

/// Events emitted while a pipeline run makes progress.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// The image has been captioned.
    CaptionReady {
        /// Caption text.
        caption: String,
    },

    /// A streamed story fragment arrived.
    StoryFragment {
        /// The raw fragment, before label stripping.
        text: String,
    },

    /// The story is assembled and normalized.
    StoryReady {
        /// Final story text.
        story: String,
    },

    /// Audio is available.
    AudioReady {
        /// Codec of the audio.
        mime: AudioMime,
        /// Encoded size.
        bytes: usize,
    },

    /// Audio could not be produced; caption and story are still valid.
    AudioFailed {
        /// Human-readable error description.
        message: String,
    },
}

/// Callback type for receiving pipeline events.
pub type ProgressCallback = Box<dyn Fn(PipelineEvent) + Send + Sync>;
