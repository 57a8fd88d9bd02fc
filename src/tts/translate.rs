//! Fallback engine: Google Translate text-to-speech.
//!
//! The endpoint only accepts short inputs, so text is split on word
//! boundaries into chunks of at most `max_chunk_chars` characters. Each
//! chunk comes back as MP3 and the chunks are concatenated in order, which
//! MP3 decoders play as one stream.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::FallbackSpeechEngine;
use crate::config::FallbackSpeechConfig;
use crate::error::{PipelineError, Result};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Words are never broken unless a single word exceeds `max_chars`.
/// Whitespace runs collapse to single spaces.
pub fn split_for_tts(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// MP3 fallback speech engine.
pub struct TranslateSpeechEngine {
    config: FallbackSpeechConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for TranslateSpeechEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslateSpeechEngine")
            .field("base_url", &self.config.base_url)
            .field("lang", &self.config.lang)
            .finish()
    }
}

impl TranslateSpeechEngine {
    /// Create an engine with its own HTTP client.
    pub fn new(config: FallbackSpeechConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Create an engine sharing an existing HTTP client.
    pub fn with_client(config: FallbackSpeechConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn endpoint(&self) -> String {
        format!("{}/translate_tts", self.config.base_url.trim_end_matches('/'))
    }

    async fn fetch_chunk(&self, chunk: &str, idx: usize, total: usize) -> Result<Vec<u8>> {
        let total = total.to_string();
        let idx_str = idx.to_string();
        let textlen = chunk.chars().count().to_string();

        let response = self
            .client
            .get(self.endpoint())
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .query(&[
                ("ie", "UTF-8"),
                ("q", chunk),
                ("tl", self.config.lang.as_str()),
                ("client", "tw-ob"),
                ("total", total.as_str()),
                ("idx", idx_str.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                PipelineError::SpeechSynthesis(format!("fallback speech request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::SpeechSynthesis(format!(
                "fallback speech HTTP {} on chunk {idx}",
                status.as_u16()
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            PipelineError::SpeechSynthesis(format!("failed to read fallback speech: {e}"))
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl FallbackSpeechEngine for TranslateSpeechEngine {
    fn name(&self) -> &str {
        "translate-tts"
    }

    async fn speak(&self, text: &str) -> Result<Vec<u8>> {
        let chunks = split_for_tts(text, self.config.max_chunk_chars);
        if chunks.is_empty() {
            return Err(PipelineError::SpeechSynthesis("no text to speak".into()));
        }

        debug!(chunks = chunks.len(), lang = %self.config.lang, "requesting fallback speech");

        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            audio.extend(self.fetch_chunk(chunk, idx, chunks.len()).await?);
        }

        if audio.is_empty() {
            return Err(PipelineError::SpeechSynthesis(
                "fallback speech returned no audio".into(),
            ));
        }
        Ok(audio)
    }
}
