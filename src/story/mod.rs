//! Story generation: caption in, short comedic narrative out.
//!
//! The language model's response is streamed, folded into one string in
//! arrival order, then normalized by [`strip_before_colon`]. Callers block
//! until the whole story is assembled; live fragments are only visible
//! through the optional callback of [`StoryGenerator::generate_story_with`].

use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::config::StoryConfig;
use crate::error::Result;
use crate::llm::{
    ChatMessage, ChatProvider, FinishReason, LlmError, LlmEvent, LlmEventStream, RequestOptions,
};
use crate::pipeline::messages::{StoryText, Topic};

/// Drop a leading `label:` from model output.
///
/// Everything up to and including the first `:` is discarded and the rest
/// is trimmed. Without a colon the whole text is trimmed. Only the first
/// colon counts, so applying this twice can strip a second label.
///
/// ```
/// use storycast::story::strip_before_colon;
///
/// assert_eq!(strip_before_colon("Story: It was late."), "It was late.");
/// assert_eq!(strip_before_colon("  no label  "), "no label");
/// assert_eq!(strip_before_colon("A: B: C"), "B: C");
/// ```
pub fn strip_before_colon(text: &str) -> String {
    match text.split_once(':') {
        Some((_, rest)) => rest.trim().to_owned(),
        None => text.trim().to_owned(),
    }
}

/// Fill the prompt template's `{topic}` and `{max_words}` placeholders.
pub fn build_prompt(template: &str, topic: &Topic, max_words: usize) -> String {
    template
        .replace("{max_words}", &max_words.to_string())
        .replace("{topic}", topic.as_str())
}

/// Fold a chat stream into the full response text.
///
/// Fragments are appended in arrival order and handed to `on_fragment` as
/// they arrive. The stream is consumed until it ends.
///
/// # Errors
///
/// Returns [`LlmError::StreamError`] on the first `StreamError` event.
pub async fn assemble_story(
    mut stream: LlmEventStream,
    mut on_fragment: impl FnMut(&str),
) -> std::result::Result<String, LlmError> {
    let mut text = String::new();

    while let Some(event) = stream.next().await {
        match event {
            LlmEvent::StreamStart { request_id, model } => {
                debug!(%request_id, %model, "story stream started");
            }
            LlmEvent::TextDelta { text: fragment } => {
                on_fragment(&fragment);
                text.push_str(&fragment);
            }
            LlmEvent::StreamEnd { finish_reason } => {
                if finish_reason == FinishReason::Stop {
                    debug!("story stream finished");
                } else {
                    warn!(%finish_reason, "story stream ended early");
                }
            }
            LlmEvent::StreamError { error } => {
                return Err(LlmError::StreamError(error));
            }
        }
    }

    Ok(text)
}

/// Produces narration text from a caption through a chat provider.
pub struct StoryGenerator {
    provider: Arc<dyn ChatProvider>,
    config: StoryConfig,
}

impl std::fmt::Debug for StoryGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryGenerator")
            .field("provider", &self.provider.name())
            .field("model", &self.provider.model())
            .field("temperature", &self.config.temperature)
            .finish()
    }
}

impl StoryGenerator {
    /// Create a generator over `provider`.
    pub fn new(provider: Arc<dyn ChatProvider>, config: StoryConfig) -> Self {
        Self { provider, config }
    }

    /// The single user message sent for `topic`.
    pub fn messages(&self, topic: &Topic) -> Vec<ChatMessage> {
        vec![ChatMessage::user(build_prompt(
            &self.config.prompt_template,
            topic,
            self.config.max_words,
        ))]
    }

    /// Sampling options derived from the config.
    pub fn request_options(&self) -> RequestOptions {
        let options = RequestOptions::new().with_temperature(self.config.temperature);
        match self.config.max_tokens {
            Some(max) => options.with_max_tokens(max),
            None => options,
        }
    }

    /// Generate a story for `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PipelineError::StoryGeneration`] if the request
    /// or the stream fails. There is no retry.
    pub async fn generate_story(&self, topic: &Topic) -> Result<StoryText> {
        self.generate_story_with(topic, |_| {}).await
    }

    /// Generate a story, passing each streamed fragment to `on_fragment`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::generate_story`].
    pub async fn generate_story_with(
        &self,
        topic: &Topic,
        mut on_fragment: impl FnMut(&str) + Send,
    ) -> Result<StoryText> {
        let messages = self.messages(topic);
        let options = self.request_options();
        let verbose = self.config.verbose;

        debug!(
            provider = self.provider.name(),
            model = self.provider.model(),
            temperature = self.config.temperature,
            "requesting story"
        );

        let streamed = match self.provider.stream_chat(&messages, &options).await {
            Ok(stream) => {
                assemble_story(stream, |fragment| {
                    if verbose {
                        debug!(fragment, "story fragment");
                    }
                    on_fragment(fragment);
                })
                .await
            }
            Err(e) => Err(e),
        };
        let raw = streamed.map_err(|e| {
            warn!(
                code = e.code(),
                retryable = e.is_retryable(),
                reason = e.message(),
                "story request failed"
            );
            e
        })?;

        let story = StoryText::from_raw(&raw);
        info!(words = story.word_count(), "story ready");
        Ok(story)
    }
}
