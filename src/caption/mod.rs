//! Image captioning.
//!
//! A [`CaptionModel`] returns ranked caption candidates for an image;
//! [`extract_caption`] keeps the highest-ranked one. There is no fallback
//! captioner: any model error aborts the pipeline.

mod huggingface;

pub use huggingface::HfCaptioner;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::pipeline::messages::{Caption, ImageInput};

/// One caption proposed by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionCandidate {
    /// Generated description.
    pub text: String,
    /// Model confidence, when the provider reports one.
    pub confidence: Option<f32>,
}

impl CaptionCandidate {
    /// Candidate without a confidence score.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }
}

/// A pretrained image-to-text model.
#[async_trait]
pub trait CaptionModel: Send + Sync {
    /// Model identifier for logging.
    fn name(&self) -> &str;

    /// Caption `image`, best candidate first.
    ///
    /// Decoding happens inside the model; corrupt or unsupported images
    /// surface here as [`PipelineError::Captioning`].
    async fn caption(&self, image: &ImageInput) -> Result<Vec<CaptionCandidate>>;
}

/// Caption `image` with `model`, keeping the first candidate.
///
/// # Errors
///
/// Returns [`PipelineError::Captioning`] if the model fails, returns no
/// candidates, or returns a blank first candidate.
pub async fn extract_caption(model: &dyn CaptionModel, image: &ImageInput) -> Result<Caption> {
    debug!(
        model = model.name(),
        filename = image.filename(),
        bytes = image.bytes().len(),
        "captioning image"
    );

    let candidates = model.caption(image).await?;
    let first = candidates.into_iter().next().ok_or_else(|| {
        PipelineError::Captioning(format!("{} returned no captions", model.name()))
    })?;

    let caption = Caption::new(&first.text)?;
    info!(caption = caption.as_str(), "caption ready");
    Ok(caption)
}
