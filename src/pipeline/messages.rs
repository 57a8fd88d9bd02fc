//! Values passed between pipeline stages.

use crate::error::{PipelineError, Result};
use std::fmt;
use std::path::Path;

/// An uploaded image: raw bytes plus the name it arrived under.
///
/// The filename is only a hint for the content type; the bytes are never
/// validated before they reach the captioning model.
#[derive(Debug, Clone)]
pub struct ImageInput {
    bytes: Vec<u8>,
    filename: String,
}

impl ImageInput {
    /// Wrap an in-memory upload.
    pub fn new(bytes: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
        }
    }

    /// Read an image from disk, keeping its file name as the hint.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { bytes, filename })
    }

    /// The raw image payload.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The original file name.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Lower-cased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }

    /// Best-effort MIME type: sniffed from the bytes, then from the extension.
    pub fn content_type(&self) -> &'static str {
        image::guess_format(&self.bytes)
            .ok()
            .or_else(|| self.extension().and_then(image::ImageFormat::from_extension))
            .map(|format| format.to_mime_type())
            .unwrap_or("application/octet-stream")
    }
}

/// A short description of the image. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption(String);

impl Caption {
    /// Build a caption from model output, trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Captioning`] when nothing is left after trimming.
    pub fn new(text: impl AsRef<str>) -> Result<Self> {
        let text = text.as_ref().trim();
        if text.is_empty() {
            return Err(PipelineError::Captioning(
                "model returned an empty caption".into(),
            ));
        }
        Ok(Self(text.to_owned()))
    }

    /// The caption text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caption in its role as story prompt input.
pub type Topic = Caption;

/// The normalized story text that gets narrated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryText(String);

impl StoryText {
    /// Normalize raw model output into story text.
    ///
    /// See [`crate::story::strip_before_colon`].
    pub fn from_raw(raw: &str) -> Self {
        Self(crate::story::strip_before_colon(raw))
    }

    /// The story text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whitespace-separated word count.
    pub fn word_count(&self) -> usize {
        self.0.split_whitespace().count()
    }

    /// Whether there is nothing to narrate.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StoryText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Codec of a synthesized audio payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioMime {
    /// WAV from the primary engine.
    Wav,
    /// MP3 from the fallback engine.
    Mpeg,
}

impl AudioMime {
    /// The MIME type string (`audio/wav` or `audio/mpeg`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mpeg => "audio/mpeg",
        }
    }

    /// File extension matching the codec.
    pub fn file_extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mpeg => "mp3",
        }
    }
}

impl fmt::Display for AudioMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully materialized narration audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    /// Encoded audio, exactly as the engine produced it.
    pub bytes: Vec<u8>,
    /// Codec of [`Self::bytes`].
    pub mime: AudioMime,
}

impl AudioArtifact {
    /// WAV audio from the primary engine.
    pub fn wav(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: AudioMime::Wav,
        }
    }

    /// MP3 audio from the fallback engine.
    pub fn mpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: AudioMime::Mpeg,
        }
    }

    /// The MIME type string.
    pub fn mime_type(&self) -> &'static str {
        self.mime.as_str()
    }
}

/// Everything one pipeline run produced.
///
/// Caption and story are always present; audio is the only stage that can
/// fail without aborting the run.
#[derive(Debug)]
pub struct PipelineResult {
    /// Image caption.
    pub caption: Caption,
    /// Narrated story.
    pub story: StoryText,
    /// Audio, or the reason it is unavailable.
    pub audio: std::result::Result<AudioArtifact, PipelineError>,
}

impl PipelineResult {
    /// Whether the audio stage succeeded.
    pub fn audio_ok(&self) -> bool {
        self.audio.is_ok()
    }

    /// The audio artifact when synthesis succeeded.
    pub fn audio(&self) -> Option<&AudioArtifact> {
        self.audio.as_ref().ok()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn content_type_sniffs_bytes_before_extension() {
        let image = ImageInput::new(PNG_MAGIC.to_vec(), "holiday.jpg");
        assert_eq!(image.content_type(), "image/png");
    }

    #[test]
    fn content_type_falls_back_to_extension() {
        let image = ImageInput::new(b"not really an image".to_vec(), "Photo.JPEG");
        assert_eq!(image.extension().as_deref(), Some("jpeg"));
        assert_eq!(image.content_type(), "image/jpeg");
    }

    #[test]
    fn content_type_unknown_is_octet_stream() {
        let image = ImageInput::new(b"???".to_vec(), "upload");
        assert_eq!(image.content_type(), "application/octet-stream");
    }

    #[tokio::test]
    async fn from_path_keeps_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dog.png");
        std::fs::write(&path, PNG_MAGIC).unwrap();
        let image = ImageInput::from_path(&path).await.unwrap();
        assert_eq!(image.filename(), "dog.png");
        assert_eq!(image.bytes(), PNG_MAGIC);
    }

    #[tokio::test]
    async fn from_path_missing_file_is_io_error() {
        let err = ImageInput::from_path(Path::new("/nonexistent/cat.png"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "IO_ERROR");
    }

    #[test]
    fn caption_is_trimmed() {
        let caption = Caption::new("  a dog sitting on a couch \n").unwrap();
        assert_eq!(caption.as_str(), "a dog sitting on a couch");
    }

    #[test]
    fn blank_caption_is_rejected() {
        let err = Caption::new(" \t ").unwrap_err();
        assert_eq!(err.code(), "CAPTIONING_FAILED");
    }

    #[test]
    fn story_text_strips_label() {
        let story = StoryText::from_raw("Story: two words");
        assert_eq!(story.as_str(), "two words");
        assert_eq!(story.word_count(), 2);
    }

    #[test]
    fn mime_strings_and_extensions() {
        assert_eq!(AudioArtifact::wav(vec![1]).mime_type(), "audio/wav");
        assert_eq!(AudioArtifact::mpeg(vec![1]).mime_type(), "audio/mpeg");
        assert_eq!(AudioMime::Wav.file_extension(), "wav");
        assert_eq!(AudioMime::Mpeg.file_extension(), "mp3");
    }
}
