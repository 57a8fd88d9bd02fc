//! Streaming chat completions.
//!
//! A [`ChatProvider`] sends one conversation and returns an ordered
//! [`LlmEventStream`]. The only bundled backend is [`OpenAiAdapter`], which
//! speaks the OpenAI-compatible Chat Completions protocol over SSE.

pub mod error;
pub mod events;
pub mod openai;
pub mod sse;
pub mod types;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

pub use error::LlmError;
pub use events::{FinishReason, LlmEvent};
pub use openai::{OpenAiAdapter, OpenAiConfig};
pub use types::{ChatMessage, RequestOptions, Role};

/// A boxed stream of normalized chat events.
pub type LlmEventStream = Pin<Box<dyn Stream<Item = LlmEvent> + Send>>;

/// A backend that can stream a chat completion.
///
/// Implementations must emit events in the order the provider produced
/// them and report mid-stream failures as [`LlmEvent::StreamError`].
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider identifier for logging.
    fn name(&self) -> &str;

    /// Model that will serve requests.
    fn model(&self) -> &str;

    /// Start a completion for `messages`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] if the request cannot be sent or the provider
    /// rejects it before streaming begins.
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        options: &RequestOptions,
    ) -> Result<LlmEventStream, LlmError>;
}
