#![cfg(all(feature = "provider-openai", feature = "provider-ollama"))]

use std::sync::{Arc, Mutex};

use futures_util::{StreamExt, stream};
use pprovider::adapters::ollama::OllamaProvider;
use pprovider::adapters::openai::{
    OpenAiAuth, OpenAiChunkStream, OpenAiFinishReason, OpenAiProvider, OpenAiRequest,
    OpenAiResponse, OpenAiStreamChunk, OpenAiTransport, OpenAiUsage,
};
use pprovider::{
    ImagePayload, Message, ModelProvider, ModelRequest, ProviderError, ProviderErrorKind,
    ProviderFuture, ProviderId, Role, SecureCredentialManager, StopReason, StreamEvent,
};

#[derive(Debug, Default)]
struct FakeTransport {
    calls: Mutex<u32>,
    captured_auth: Mutex<Option<OpenAiAuth>>,
    captured_request: Mutex<Option<OpenAiRequest>>,
}

impl FakeTransport {
    fn record(&self, request: OpenAiRequest, auth: OpenAiAuth) {
        *self.calls.lock().expect("calls lock") += 1;
        *self.captured_request.lock().expect("request lock") = Some(request);
        *self.captured_auth.lock().expect("auth lock") = Some(auth);
    }

    fn calls(&self) -> u32 {
        *self.calls.lock().expect("calls lock")
    }

    fn captured_request(&self) -> OpenAiRequest {
        self.captured_request
            .lock()
            .expect("request lock")
            .clone()
            .expect("request should be captured")
    }

    fn captured_auth(&self) -> OpenAiAuth {
        self.captured_auth
            .lock()
            .expect("auth lock")
            .clone()
            .expect("auth should be captured")
    }
}

fn canned_response(content: &str) -> OpenAiResponse {
    OpenAiResponse {
        model: "gpt-4o-mini".to_string(),
        content: content.to_string(),
        finish_reason: OpenAiFinishReason::Stop,
        usage: OpenAiUsage {
            prompt_tokens: 7,
            completion_tokens: 3,
            total_tokens: 10,
        },
    }
}

impl OpenAiTransport for FakeTransport {
    fn complete<'a>(
        &'a self,
        request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>> {
        Box::pin(async move {
            self.record(request, auth);
            Ok(canned_response("Meow! [Feed:treat]"))
        })
    }

    fn stream<'a>(
        &'a self,
        request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>> {
        Box::pin(async move {
            self.record(request, auth);
            let chunks = stream::iter(vec![
                Ok(OpenAiStreamChunk::TextDelta("Me".to_string())),
                Ok(OpenAiStreamChunk::TextDelta("ow".to_string())),
                Ok(OpenAiStreamChunk::ResponseComplete(canned_response("Meow"))),
            ]);
            Ok(Box::pin(chunks) as OpenAiChunkStream<'a>)
        })
    }
}

fn credentials_with_key() -> Arc<SecureCredentialManager> {
    let credentials = Arc::new(SecureCredentialManager::new());
    credentials
        .set_api_key("openai", "sk-live-123")
        .expect("key should set");
    credentials
}

#[tokio::test]
async fn complete_maps_response_and_sends_bearer_key() {
    let transport = Arc::new(FakeTransport::default());
    let provider = OpenAiProvider::new(credentials_with_key(), transport.clone());
    let request = ModelRequest::new(
        "gpt-4o",
        vec![
            Message::new(Role::System, "You are a cat."),
            Message::new(Role::User, "hi"),
        ],
    );

    let response = provider
        .complete(request)
        .await
        .expect("completion should succeed");
    assert_eq!(response.provider, ProviderId::OpenAi);
    assert_eq!(response.text, "Meow! [Feed:treat]");
    assert_eq!(response.stop_reason, StopReason::EndTurn);
    assert_eq!(response.usage.total_tokens, 10);

    match transport.captured_auth() {
        OpenAiAuth::Bearer(key) => assert_eq!(key.expose(), "sk-live-123"),
        other => panic!("unexpected auth: {other:?}"),
    }

    let captured = transport.captured_request();
    assert_eq!(captured.model, "gpt-4o");
    assert_eq!(captured.messages.len(), 2);
    assert!(!captured.stream);
}

#[tokio::test]
async fn stream_forwards_deltas_then_completion() {
    let transport = Arc::new(FakeTransport::default());
    let provider = OpenAiProvider::new(credentials_with_key(), transport.clone());
    let request = ModelRequest::new("", vec![Message::new(Role::User, "hi")]);

    let events = provider
        .stream(request)
        .await
        .expect("stream should open")
        .collect::<Vec<_>>()
        .await;

    assert_eq!(events.len(), 3);
    assert_eq!(
        events[0].as_ref().expect("first event"),
        &StreamEvent::TextDelta("Me".to_string())
    );
    match events[2].as_ref().expect("last event") {
        StreamEvent::ResponseComplete(response) => assert_eq!(response.text, "Meow"),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(transport.captured_request().stream);
    assert_eq!(transport.captured_request().model, "gpt-4o-mini");
}

#[tokio::test]
async fn missing_api_key_fails_before_any_transport_call() {
    let transport = Arc::new(FakeTransport::default());
    let provider = OpenAiProvider::new(Arc::new(SecureCredentialManager::new()), transport.clone());
    let request = ModelRequest::new("gpt-4o-mini", vec![Message::new(Role::User, "hi")]);

    let error = provider
        .complete(request)
        .await
        .expect_err("missing key should fail");
    assert_eq!(error.kind, ProviderErrorKind::Configuration);
    assert!(!error.retryable);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn compatible_provider_reports_its_own_id_and_key() {
    let credentials = Arc::new(SecureCredentialManager::new());
    credentials
        .set_api_key("deepseek", "ds-key")
        .expect("key should set");
    let transport = Arc::new(FakeTransport::default());
    let provider = OpenAiProvider::compatible(credentials, "deepseek", transport.clone())
        .with_image_support(false);

    let response = provider
        .complete(ModelRequest::new("deepseek-chat", vec![Message::new(Role::User, "hi")]))
        .await
        .expect("completion should succeed");
    assert_eq!(response.provider, ProviderId::OpenAiCompatible);

    let image_request = ModelRequest::new(
        "deepseek-chat",
        vec![Message::new(Role::User, "look").with_image(ImagePayload::new("image/png", vec![1]))],
    );
    let error = provider
        .complete(image_request)
        .await
        .expect_err("images are not supported");
    assert_eq!(error.kind, ProviderErrorKind::Capability);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn ollama_sends_unauthenticated_requests() {
    let transport = Arc::new(FakeTransport::default());
    let provider = OllamaProvider::new(transport.clone()).with_fallback_model("qwen2.5");

    let response = provider
        .complete(ModelRequest::new("", vec![Message::new(Role::User, "hi")]))
        .await
        .expect("completion should succeed");

    assert_eq!(response.provider, ProviderId::Ollama);
    assert_eq!(transport.captured_auth(), OpenAiAuth::None);
    assert_eq!(transport.captured_request().model, "qwen2.5");
    assert!(!provider.capabilities().images);
}
