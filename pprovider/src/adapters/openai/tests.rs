//! Focused unit tests for adapter internals.

#![cfg(test)]

use std::sync::Arc;

use futures_util::stream;

use crate::{
    ImagePayload, Message, ModelRequest, ProviderError, ProviderFuture, Role,
    SecureCredentialManager,
};

use super::provider::OpenAiProvider;
use super::serde_api::{build_api_request, parse_finish_reason};
use super::transport::{OpenAiChunkStream, OpenAiTransport, SseDecoder};
use super::types::{OpenAiAuth, OpenAiFinishReason, OpenAiRequest, OpenAiResponse, OpenAiRole};

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
}

#[test]
fn function_messages_are_sent_as_user_turns_and_model_falls_back() {
    let provider = OpenAiProvider::new(
        Arc::new(SecureCredentialManager::new()),
        Arc::new(NoopTransport),
    )
    .with_fallback_model("pet-model");
    let request = ModelRequest::new(
        "",
        vec![
            Message::new(Role::User, "feed the cat"),
            Message::new(Role::Function, "fed"),
        ],
    );

    let built = provider.build_openai_request(request, false);
    assert_eq!(built.model, "pet-model");
    assert_eq!(built.messages[1].role, OpenAiRole::User);
    assert_eq!(built.messages[1].content, "fed");
}

#[test]
fn image_messages_serialize_as_content_parts() {
    let provider = OpenAiProvider::new(
        Arc::new(SecureCredentialManager::new()),
        Arc::new(NoopTransport),
    );
    let image = ImagePayload::new("image/png", vec![1, 2, 3]);
    let request = ModelRequest::new(
        "gpt-4o",
        vec![
            Message::new(Role::System, "be cute"),
            Message::new(Role::User, "what is this?").with_image(image),
        ],
    );

    let api = build_api_request(provider.build_openai_request(request, false))
        .expect("request should build");
    let json = serde_json::to_value(&api).expect("serialize");

    assert_eq!(json["messages"][0]["content"], "be cute");
    let parts = json["messages"][1]["content"]
        .as_array()
        .expect("content parts");
    assert_eq!(parts[0]["type"], "text");
    assert_eq!(parts[0]["text"], "what is this?");
    assert_eq!(parts[1]["type"], "image_url");
    assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,AQID");
    assert!(json.get("temperature").is_none());
}

#[test]
fn parse_finish_reason_maps_expected_values() {
    assert_eq!(parse_finish_reason(Some("stop")), OpenAiFinishReason::Stop);
    assert_eq!(parse_finish_reason(Some("length")), OpenAiFinishReason::Length);
    assert_eq!(parse_finish_reason(Some("tool_calls")), OpenAiFinishReason::Other);
    assert_eq!(parse_finish_reason(None), OpenAiFinishReason::Other);
}

#[test]
fn sse_decoder_handles_split_lines_and_multibyte_characters() {
    let mut decoder = SseDecoder::default();
    let line = "data: {\"text\":\"ニャー\"}\n\n".as_bytes();
    let (head, tail) = line.split_at(16);

    assert!(decoder.push(head).expect("partial").is_empty());
    let payloads = decoder.push(tail).expect("complete line");
    assert_eq!(payloads, vec!["{\"text\":\"ニャー\"}".to_string()]);

    let payloads = decoder
        .push(b": keep-alive\ndata: [DONE]\n")
        .expect("done line");
    assert_eq!(payloads, vec!["[DONE]".to_string()]);
}
