//! Ollama provider implemented over the OpenAI-compatible transport.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;

use crate::adapters::openai::provider::build_request;
use crate::adapters::openai::{OpenAiAuth, OpenAiHttpTransport, OpenAiTransport};
use crate::http::{map_send_error, status_error};
use crate::{
    BoxedEventStream, ModelProvider, ModelRequest, ModelResponse, ProviderCapabilities,
    ProviderError, ProviderFuture, ProviderId,
};

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
pub const OLLAMA_HOST_URL: &str = "http://localhost:11434";

#[derive(Clone)]
pub struct OllamaProvider {
    transport: Arc<dyn OpenAiTransport>,
    fallback_model: String,
    images: bool,
}

impl OllamaProvider {
    pub fn new(transport: Arc<dyn OpenAiTransport>) -> Self {
        Self {
            transport,
            fallback_model: "llama3.2".to_string(),
            images: false,
        }
    }

    pub fn with_fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = model.into();
        self
    }

    /// Enable for vision models such as `llava`.
    pub fn with_image_support(mut self, images: bool) -> Self {
        self.images = images;
        self
    }

    pub fn default_http_transport(client: Client) -> OpenAiHttpTransport {
        OpenAiHttpTransport::new(client)
            .with_base_url(OLLAMA_BASE_URL)
            .with_backend_label("ollama")
    }

    fn check(&self, request: &ModelRequest) -> Result<(), ProviderError> {
        request.validate()?;
        if request.has_images() && !self.images {
            return Err(ProviderError::capability(format!(
                "ollama model '{}' is not configured for images",
                self.fallback_model
            )));
        }
        Ok(())
    }
}

impl ModelProvider for OllamaProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Ollama
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            images: self.images,
            streaming: true,
        }
    }

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
        Box::pin(async move {
            self.check(&request)?;
            let ollama_request = build_request(&self.fallback_model, request, false);
            let response = self
                .transport
                .complete(ollama_request, OpenAiAuth::None)
                .await?;

            Ok(response.into_model_response(ProviderId::Ollama))
        })
    }

    fn stream<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            self.check(&request)?;
            let ollama_request = build_request(&self.fallback_model, request, true);
            let mut chunks = self
                .transport
                .stream(ollama_request, OpenAiAuth::None)
                .await?;

            let stream = try_stream! {
                while let Some(chunk) = chunks.next().await {
                    yield chunk?.into_stream_event(ProviderId::Ollama);
                }
            };

            Ok(Box::pin(stream) as BoxedEventStream<'a>)
        })
    }
}

/// Lists locally pulled model names, sorted.
pub async fn list_ollama_models(
    client: &Client,
    host_url: &str,
) -> Result<Vec<String>, ProviderError> {
    let endpoint = format!("{}/api/tags", host_url.trim_end_matches('/'));
    let response = client.get(endpoint).send().await.map_err(map_send_error)?;

    if !response.status().is_success() {
        return Err(status_error(response, "ollama").await);
    }

    let parsed = response
        .json::<OllamaTagsResponse>()
        .await
        .map_err(map_send_error)?;

    let mut names = parsed
        .models
        .into_iter()
        .map(|model| model.name)
        .collect::<Vec<_>>();
    names.sort();
    Ok(names)
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModelTag>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelTag {
    name: String,
}
