//! Server-Sent Events decoding for streamed chat completions.
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//!
//! data: {"choices":[{"delta":{"content":"lo"}}]}
//!
//! data: [DONE]
//! ```
//!
//! Bytes are buffered until a full line is available, so multi-byte UTF-8
//! characters split across network chunks decode correctly.

/// One dispatched SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// `data:` lines joined with `\n`.
    pub data: String,
}

impl SseEvent {
    /// Whether this is the OpenAI-style `[DONE]` terminator.
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Fields collected since the last blank line.
#[derive(Debug, Default)]
struct PendingEvent {
    data: Vec<String>,
}

impl PendingEvent {
    /// Consume one line; a blank line dispatches the pending event.
    fn feed(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.take();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        // Event names, ids and retry hints carry nothing for completions.
        if field == "data" {
            self.data.push(value.to_owned());
        }
        None
    }

    /// Emit the pending event if it carries data, and reset.
    fn take(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent { data })
    }
}

/// Incremental SSE decoder fed with raw response chunks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    pending: PendingEvent,
}

impl SseDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline).collect();
            let raw = &raw[..raw.len() - 1];
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            let line = String::from_utf8_lossy(raw);
            if let Some(event) = self.pending.feed(&line) {
                events.push(event);
            }
        }

        events
    }

    /// Flush at end of stream: an unterminated last line still counts.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let raw = raw.strip_suffix(b"\r").unwrap_or(&raw);
            let line = String::from_utf8_lossy(raw).into_owned();
            if let Some(event) = self.pending.feed(&line) {
                return Some(event);
            }
        }
        self.pending.take()
    }
}

/// Decode a complete SSE body in one go.
#[cfg(test)]
fn decode_all(body: &[u8]) -> Vec<SseEvent> {
    let mut decoder = SseDecoder::new();
    let mut events = decoder.push(body);
    events.extend(decoder.finish());
    events
}
