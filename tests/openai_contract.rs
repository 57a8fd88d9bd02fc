//! Chat completions contract tests.
//!
//! These tests verify the HTTP format of the OpenAI-compatible adapter
//! against a mock server: request body, auth header, SSE parsing, and
//! error mapping.

use futures_util::StreamExt;
use serde_json::json;
use storycast::config::ApiKey;
use storycast::llm::{
    ChatMessage, ChatProvider, FinishReason, LlmError, LlmEvent, OpenAiAdapter, OpenAiConfig,
    RequestOptions,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter(server: &MockServer) -> OpenAiAdapter {
    OpenAiAdapter::new(
        OpenAiConfig::new(ApiKey::new("gsk_test"), "llama-3.3-70b-versatile")
            .with_base_url(server.uri()),
    )
}

fn sse(fragments: &[&str]) -> String {
    let mut body = String::new();
    for fragment in fragments {
        let chunk = json!({"choices": [{"index": 0, "delta": {"content": fragment}}]});
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str(r#"data: {"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#);
    body.push_str("\n\n");
    body.push_str("data: [DONE]\n\n");
    body
}

async fn collect(adapter: &OpenAiAdapter, options: &RequestOptions) -> Vec<LlmEvent> {
    let stream = adapter
        .stream_chat(&[ChatMessage::user("Hello")], options)
        .await
        .unwrap();
    stream.collect().await
}

// ── request format ──

#[tokio::test]
async fn request_carries_model_messages_and_sampling() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer gsk_test"))
        .and(body_partial_json(json!({
            "model": "llama-3.3-70b-versatile",
            "messages": [{"role": "user", "content": "Hello"}],
            "stream": true,
            "temperature": 1.0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(sse(&["Hi"])))
        .expect(1)
        .mount(&server)
        .await;

    let options = RequestOptions::new().with_temperature(1.0);
    let events = collect(&adapter(&server), &options).await;
    assert!(events.contains(&LlmEvent::TextDelta { text: "Hi".into() }));
}

// ── streaming ──

#[tokio::test]
async fn streamed_fragments_arrive_in_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-request-id", "req_42")
                .set_body_string(sse(&["Story", ": My dog", " judges naps."])),
        )
        .mount(&server)
        .await;

    let events = collect(&adapter(&server), &RequestOptions::new()).await;
    assert_eq!(
        events,
        vec![
            LlmEvent::StreamStart {
                request_id: "req_42".into(),
                model: "llama-3.3-70b-versatile".into()
            },
            LlmEvent::TextDelta {
                text: "Story".into()
            },
            LlmEvent::TextDelta {
                text: ": My dog".into()
            },
            LlmEvent::TextDelta {
                text: " judges naps.".into()
            },
            LlmEvent::StreamEnd {
                finish_reason: FinishReason::Stop
            },
        ]
    );
}

#[tokio::test]
async fn plain_json_completion_is_normalized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Whole thing"},
                "finish_reason": "stop"
            }]
        })))
        .mount(&server)
        .await;

    let events = collect(&adapter(&server), &RequestOptions::new()).await;
    assert!(events.contains(&LlmEvent::TextDelta {
        text: "Whole thing".into()
    }));
}

#[tokio::test]
async fn in_band_error_surfaces_as_stream_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "data: {\"choices\":[{\"delta\":{\"content\":\"par\"}}]}\n\n\
             data: {\"error\":{\"message\":\"model overloaded\"}}\n\n",
        ))
        .mount(&server)
        .await;

    let events = collect(&adapter(&server), &RequestOptions::new()).await;
    assert_eq!(
        events.last(),
        Some(&LlmEvent::StreamError {
            error: "model overloaded".into()
        })
    );
}

// ── error mapping ──

#[tokio::test]
async fn unauthorized_maps_to_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Invalid API Key", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let result = adapter(&server)
        .stream_chat(&[ChatMessage::user("Hello")], &RequestOptions::new())
        .await;
    match result {
        Err(LlmError::AuthError(msg)) => assert!(msg.contains("Invalid API Key")),
        Err(other) => panic!("expected AuthError, got {other}"),
        Ok(_) => panic!("expected AuthError, got a stream"),
    }
}

#[tokio::test]
async fn rate_limit_maps_to_request_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate limit reached"}
        })))
        .mount(&server)
        .await;

    let result = adapter(&server)
        .stream_chat(&[ChatMessage::user("Hello")], &RequestOptions::new())
        .await;
    assert!(matches!(result, Err(LlmError::RequestError(ref m)) if m.contains("Rate limit")));
}

#[tokio::test]
async fn server_error_maps_to_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let result = adapter(&server)
        .stream_chat(&[ChatMessage::user("Hello")], &RequestOptions::new())
        .await;
    assert!(matches!(result, Err(LlmError::ProviderError(ref m)) if m.contains("500")));
}

#[tokio::test]
async fn empty_api_key_is_rejected_before_sending() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let adapter = OpenAiAdapter::new(
        OpenAiConfig::new(ApiKey::new(""), "m").with_base_url(server.uri()),
    );
    let result = adapter
        .stream_chat(&[ChatMessage::user("Hello")], &RequestOptions::new())
        .await;
    assert!(matches!(result, Err(LlmError::ConfigError(_))));
}
