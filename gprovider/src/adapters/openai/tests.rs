//! Focused unit tests for OpenAI adapter internals.

#![cfg(test)]

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::stream;
use gcommon::GenerationOptions;

use crate::{
    ChatMessage, CompletionRequest, FunctionDefinition, ProviderError, ProviderErrorKind,
    ProviderFuture, Role, SecretString,
};

use super::auth::resolve_openai_auth;
use super::provider::OpenAiProvider;
use super::serde_api::{OpenAiApiModerationResponse, build_api_request, parse_finish_reason};
use super::transport::{
    OpenAiChunkStream, OpenAiTransport, drain_sse_lines, parse_stream_payload, sse_data,
};
use super::types::{
    OpenAiAuth, OpenAiFinishReason, OpenAiModerationRequest, OpenAiModerationResponse,
    OpenAiRequest, OpenAiResponse, OpenAiStreamChunk,
};

#[derive(Debug)]
struct NoopTransport;

impl OpenAiTransport for NoopTransport {
    fn complete<'a>(
        &'a self,
        _request: OpenAiRequest,
        _auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>> {
        Box::pin(async { Err(ProviderError::other("not used")) })
    }

    fn stream<'a>(
        &'a self,
        _request: OpenAiRequest,
        _auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>> {
        Box::pin(async {
            let output = stream::iter(vec![Err(ProviderError::other("not used"))]);
            Ok(Box::pin(output) as OpenAiChunkStream<'a>)
        })
    }

    fn moderate<'a>(
        &'a self,
        _request: OpenAiModerationRequest,
        _auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiModerationResponse, ProviderError>> {
        Box::pin(async { Err(ProviderError::other("not used")) })
    }
}

fn user_request(model: &str) -> CompletionRequest {
    CompletionRequest::builder(model)
        .message(ChatMessage::new(Role::User, "hi"))
        .build()
        .expect("request should build")
}

#[test]
fn build_openai_request_falls_back_to_default_model_and_sets_stream_flag() {
    let provider = OpenAiProvider::new(Arc::new(NoopTransport)).with_fallback_model("gpt-fallback");
    let mut request = user_request("gpt-4o");
    request.model = " ".to_string();

    let built = provider.build_openai_request(request, true);
    assert_eq!(built.model, "gpt-fallback");
    assert!(built.stream);
}

#[test]
fn parse_finish_reason_maps_expected_values() {
    assert_eq!(parse_finish_reason(Some("stop")), OpenAiFinishReason::Stop);
    assert_eq!(
        parse_finish_reason(Some("length")),
        OpenAiFinishReason::Length
    );
    assert_eq!(
        parse_finish_reason(Some("function_call")),
        OpenAiFinishReason::FunctionCall
    );
    assert_eq!(
        parse_finish_reason(Some("content_filter")),
        OpenAiFinishReason::ContentFilter
    );
    assert_eq!(parse_finish_reason(None), OpenAiFinishReason::Other);
}

#[test]
fn build_api_request_carries_sampling_knobs_and_functions() {
    let openai_request = OpenAiRequest {
        model: "gpt-4o-mini".to_string(),
        messages: vec![ChatMessage::new(Role::User, "hi")],
        functions: vec![FunctionDefinition::new(
            "lookup",
            serde_json::json!({"type": "object"}),
        )],
        options: GenerationOptions::default()
            .with_temperature(0.3)
            .with_logit_bias("50256", -100.0)
            .with_stop(["END"])
            .with_user("u-1"),
        stream: false,
        request_options: Default::default(),
    };

    let api = build_api_request(openai_request).expect("request should build");
    let json = serde_json::to_value(&api).expect("request should serialize");
    assert_eq!(json["temperature"], serde_json::json!(0.3_f32));
    assert_eq!(json["logit_bias"]["50256"], serde_json::json!(-100.0));
    assert_eq!(json["stop"], serde_json::json!(["END"]));
    assert_eq!(json["user"], "u-1");
    assert_eq!(json["functions"][0]["name"], "lookup");
    assert!(json.get("top_p").is_none());
    assert_eq!(json["stream"], false);
}

#[test]
fn resolve_auth_prefers_request_credential() {
    let request_key = SecretString::new("sk-request");
    let default_key = SecretString::new("sk-default");

    let auth = resolve_openai_auth(Some(&request_key), Some(&default_key)).expect("auth");
    assert_eq!(auth, OpenAiAuth::ApiKey(request_key));

    let auth = resolve_openai_auth(None, Some(&default_key)).expect("auth");
    assert_eq!(auth, OpenAiAuth::ApiKey(default_key));

    let err = resolve_openai_auth(None, None).expect_err("missing key must fail");
    assert_eq!(err.kind, ProviderErrorKind::Authentication);
}

#[test]
fn drain_sse_lines_keeps_partial_multibyte_tail() {
    let text = "data: {\"a\":\"é\"}\ndata: [DO";
    let mut buffer = text.as_bytes().to_vec();

    let lines = drain_sse_lines(&mut buffer).expect("lines should decode");
    assert_eq!(lines, vec!["data: {\"a\":\"é\"}".to_string()]);
    assert_eq!(buffer, b"data: [DO".to_vec());

    let snowman = "☃".as_bytes();
    let mut split = b"data: ".to_vec();
    split.extend_from_slice(&snowman[..1]);
    assert!(drain_sse_lines(&mut split).expect("no full line").is_empty());
    split.extend_from_slice(&snowman[1..]);
    split.push(b'\n');
    assert_eq!(
        drain_sse_lines(&mut split).expect("line should decode"),
        vec!["data: ☃".to_string()]
    );
}

#[test]
fn sse_data_ignores_comments_and_events() {
    assert_eq!(sse_data("data: [DONE]"), Some("[DONE]"));
    assert_eq!(sse_data(": keep-alive"), None);
    assert_eq!(sse_data("event: message"), None);
}

#[test]
fn parse_stream_payload_yields_content_function_and_finish_chunks() {
    let chunks = parse_stream_payload(
        r#"{"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#,
    )
    .expect("payload should parse");
    assert_eq!(chunks, vec![OpenAiStreamChunk::ContentDelta("Hel".to_string())]);

    let chunks = parse_stream_payload(
        r#"{"choices":[{"delta":{"function_call":{"name":"lookup","arguments":"{\"id\""}},"finish_reason":null}]}"#,
    )
    .expect("payload should parse");
    assert_eq!(
        chunks,
        vec![OpenAiStreamChunk::FunctionCallDelta {
            name: Some("lookup".to_string()),
            arguments: "{\"id\"".to_string(),
        }]
    );

    let chunks = parse_stream_payload(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#)
        .expect("payload should parse");
    assert_eq!(
        chunks,
        vec![OpenAiStreamChunk::Finished(OpenAiFinishReason::Stop)]
    );

    let err = parse_stream_payload("not json").expect_err("garbage must fail");
    assert_eq!(err.kind, ProviderErrorKind::Transport);
}

#[test]
fn moderation_response_collects_flagged_categories() {
    let parsed: OpenAiApiModerationResponse = serde_json::from_str(
        r#"{"results":[{"flagged":true,"categories":{"hate":true,"violence":false,"self-harm":true}}]}"#,
    )
    .expect("moderation payload should parse");

    let response = OpenAiModerationResponse::from(parsed);
    assert_eq!(
        response.flagged_categories,
        BTreeSet::from(["hate".to_string(), "self-harm".to_string()])
    );
}
