//! Normalized streaming events from chat providers.
//!
//! ```text
//! StreamStart → TextDelta* → StreamEnd
//! ```
//!
//! A transport or provider failure mid-stream shows up as `StreamError`.

/// One event in a chat completion stream, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmEvent {
    /// First event of every stream.
    StreamStart {
        /// Provider request identifier.
        request_id: String,
        /// Model serving the request.
        model: String,
    },

    /// A generated text fragment.
    TextDelta {
        /// The fragment.
        text: String,
    },

    /// The model stopped generating.
    StreamEnd {
        /// Why it stopped.
        finish_reason: FinishReason,
    },

    /// The stream broke.
    StreamError {
        /// What went wrong.
        error: String,
    },
}

/// The reason the model stopped generating output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinishReason {
    /// Natural stop.
    Stop,
    /// Hit the token limit.
    Length,
    /// Filtered by the provider.
    ContentFilter,
    /// Anything else.
    Other,
}

impl FinishReason {
    /// Map a provider `finish_reason` string.
    pub fn from_provider(reason: &str) -> Self {
        match reason {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "content_filter" => Self::ContentFilter,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::Length => write!(f, "length"),
            Self::ContentFilter => write!(f, "content_filter"),
            Self::Other => write!(f, "other"),
        }
    }
}
