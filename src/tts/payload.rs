//! Normalizing primary speech responses into audio bytes.
//!
//! The hosted speech API does not guarantee where the audio lives in its
//! response. Probing happens here, once, and yields a [`SpeechPayload`]:
//!
//! 1. a JSON object is checked for `binary`, then `data`, then `content`;
//!    the first field present wins (base64 string or byte array),
//! 2. a body that is not JSON at all is taken as the audio itself,
//! 3. otherwise the payload is [`SpeechPayload::Absent`].
//!
//! A body declared or sniffed as JSON that does not parse to an object is
//! an error, never audio.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::{PipelineError, Result};

/// Where the audio bytes were found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    /// JSON `binary` field.
    Binary,
    /// JSON `data` field.
    Data,
    /// JSON `content` field.
    Content,
    /// The raw response body.
    RawBody,
}

impl PayloadSource {
    /// Short label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Data => "data",
            Self::Content => "content",
            Self::RawBody => "raw_body",
        }
    }
}

/// JSON fields probed for audio, in order.
pub const PROBE_FIELDS: [(&str, PayloadSource); 3] = [
    ("binary", PayloadSource::Binary),
    ("data", PayloadSource::Data),
    ("content", PayloadSource::Content),
];

/// Result of probing a primary speech response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechPayload {
    /// Non-empty audio bytes.
    Audio {
        /// Encoded audio, untouched.
        bytes: Vec<u8>,
        /// Where it came from.
        source: PayloadSource,
    },
    /// The response carried no audio.
    Absent,
}

impl SpeechPayload {
    fn audio(bytes: Vec<u8>, source: PayloadSource) -> Self {
        if bytes.is_empty() {
            Self::Absent
        } else {
            Self::Audio { bytes, source }
        }
    }
}

/// Probe a primary speech response body for audio.
///
/// # Errors
///
/// Returns [`PipelineError::SpeechSynthesis`] when a JSON body is not an
/// object, or when the winning JSON field cannot be decoded.
pub fn extract_payload(content_type: Option<&str>, body: &[u8]) -> Result<SpeechPayload> {
    let Some(object) = json_object(content_type, body)? else {
        return Ok(SpeechPayload::audio(body.to_vec(), PayloadSource::RawBody));
    };

    for (field, source) in PROBE_FIELDS {
        let Some(value) = object.get(field).filter(|v| !v.is_null()) else {
            continue;
        };
        let bytes = decode_field(field, value)?;
        if !bytes.is_empty() {
            return Ok(SpeechPayload::Audio { bytes, source });
        }
        break;
    }

    // A JSON envelope is not audio, so the generic read has nothing to offer.
    Ok(SpeechPayload::Absent)
}

/// Parse `body` as a JSON object when the response claims or looks like JSON.
///
/// `Ok(None)` means the body is not JSON and goes to the generic read.
fn json_object(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<Option<serde_json::Map<String, serde_json::Value>>> {
    let declared_json = content_type.is_some_and(|ct| ct.contains("json"));
    let looks_json = body
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'{' || b == b'[');
    if body.is_empty() || (!declared_json && !looks_json) {
        return Ok(None);
    }
    match serde_json::from_slice(body) {
        Ok(serde_json::Value::Object(map)) => Ok(Some(map)),
        Ok(other) => Err(PipelineError::SpeechSynthesis(format!(
            "JSON speech response is not an object: {}",
            json_kind(&other)
        ))),
        Err(e) => Err(PipelineError::SpeechSynthesis(format!(
            "malformed JSON speech response: {e}"
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Decode a payload field: base64 text (optionally a data URL) or a byte array.
fn decode_field(field: &str, value: &serde_json::Value) -> Result<Vec<u8>> {
    match value {
        serde_json::Value::String(text) => {
            let encoded = text
                .split_once(";base64,")
                .map_or(text.as_str(), |(_, rest)| rest);
            STANDARD.decode(encoded.trim()).map_err(|e| {
                PipelineError::SpeechSynthesis(format!("`{field}` is not valid base64: {e}"))
            })
        }
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| {
                        PipelineError::SpeechSynthesis(format!(
                            "`{field}` holds a non-byte value: {item}"
                        ))
                    })
            })
            .collect(),
        other => Err(PipelineError::SpeechSynthesis(format!(
            "`{field}` has unsupported type: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    const JSON: Option<&str> = Some("application/json");

    fn audio(bytes: &[u8], source: PayloadSource) -> SpeechPayload {
        SpeechPayload::Audio {
            bytes: bytes.to_vec(),
            source,
        }
    }

    #[test]
    fn raw_wav_body_is_the_audio() {
        let payload = extract_payload(Some("audio/wav"), b"RIFF....WAVE").unwrap();
        assert_eq!(payload, audio(b"RIFF....WAVE", PayloadSource::RawBody));
    }

    #[test]
    fn empty_raw_body_is_absent() {
        assert_eq!(
            extract_payload(Some("audio/wav"), b"").unwrap(),
            SpeechPayload::Absent
        );
        assert_eq!(extract_payload(None, b"").unwrap(), SpeechPayload::Absent);
    }

    #[test]
    fn binary_field_wins_over_later_fields() {
        let body = br#"{"content":"Y29udGVudA==","data":"ZGF0YQ==","binary":"YmluYXJ5"}"#;
        assert_eq!(
            extract_payload(JSON, body).unwrap(),
            audio(b"binary", PayloadSource::Binary)
        );
    }

    #[test]
    fn data_is_probed_before_content() {
        let body = br#"{"content":"Y29udGVudA==","data":"ZGF0YQ=="}"#;
        assert_eq!(
            extract_payload(JSON, body).unwrap(),
            audio(b"data", PayloadSource::Data)
        );
    }

    #[test]
    fn content_as_byte_array() {
        let body = br#"{"content":[82,73,70,70]}"#;
        assert_eq!(
            extract_payload(JSON, body).unwrap(),
            audio(b"RIFF", PayloadSource::Content)
        );
    }

    #[test]
    fn null_fields_count_as_missing() {
        let body = br#"{"binary":null,"data":"ZGF0YQ=="}"#;
        assert_eq!(
            extract_payload(JSON, body).unwrap(),
            audio(b"data", PayloadSource::Data)
        );
    }

    #[test]
    fn data_url_prefix_is_accepted() {
        let body = br#"{"data":"data:audio/wav;base64,UklGRg=="}"#;
        assert_eq!(
            extract_payload(JSON, body).unwrap(),
            audio(b"RIFF", PayloadSource::Data)
        );
    }

    #[test]
    fn empty_first_field_does_not_fall_through_to_later_fields() {
        let body = br#"{"binary":"","data":"ZGF0YQ=="}"#;
        assert_eq!(extract_payload(JSON, body).unwrap(), SpeechPayload::Absent);
    }

    #[test]
    fn json_without_known_fields_is_absent() {
        let body = br#"{"id":"speech-1","status":"ok"}"#;
        assert_eq!(extract_payload(JSON, body).unwrap(), SpeechPayload::Absent);
        // Sniffed even without a content type.
        assert_eq!(extract_payload(None, body).unwrap(), SpeechPayload::Absent);
    }

    #[test]
    fn undecodable_field_is_an_error() {
        let err = extract_payload(JSON, br#"{"binary":"***not base64***"}"#).unwrap_err();
        assert_eq!(err.code(), "SPEECH_SYNTHESIS_FAILED");

        let err = extract_payload(JSON, br#"{"data":[1,2,999]}"#).unwrap_err();
        assert!(err.to_string().contains("non-byte"));

        let err = extract_payload(JSON, br#"{"content":{"nested":true}}"#).unwrap_err();
        assert!(err.to_string().contains("unsupported type"));
    }

    #[test]
    fn declared_json_that_is_not_an_object_is_an_error() {
        let bodies: [&[u8]; 4] = [b"[1,2,3]", b"null", b"\"queued\"", b"{\"binary\":\"UklGRg"];
        for body in bodies {
            let err = extract_payload(JSON, body).unwrap_err();
            assert_eq!(err.code(), "SPEECH_SYNTHESIS_FAILED");
        }
    }

    #[test]
    fn truncated_envelope_is_never_raw_audio() {
        // Sniffed from the leading brace without any content type.
        let err = extract_payload(None, b"{\"binary\":\"UklGRg").unwrap_err();
        assert!(err.to_string().contains("malformed JSON"));
        assert!(extract_payload(None, b"[0,1]").is_err());
    }
}
