//! OpenAI-compatible provider implementation over transport and shared models.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;

use crate::{
    BoxedEventStream, ModelProvider, ModelRequest, ModelResponse, ProviderCapabilities,
    ProviderError, ProviderFuture, ProviderId, SecureCredentialManager,
};

use super::transport::OpenAiTransport;
use super::types::{OpenAiAuth, OpenAiMessage, OpenAiRequest};

pub const OPENAI_CREDENTIAL_KEY: &str = "openai";

#[derive(Clone)]
pub struct OpenAiProvider {
    id: ProviderId,
    credentials: Arc<SecureCredentialManager>,
    credential_key: String,
    transport: Arc<dyn OpenAiTransport>,
    fallback_model: String,
    capabilities: ProviderCapabilities,
}

impl OpenAiProvider {
    pub fn new(
        credentials: Arc<SecureCredentialManager>,
        transport: Arc<dyn OpenAiTransport>,
    ) -> Self {
        Self {
            id: ProviderId::OpenAi,
            credentials,
            credential_key: OPENAI_CREDENTIAL_KEY.to_string(),
            transport,
            fallback_model: "gpt-4o-mini".to_string(),
            capabilities: ProviderCapabilities {
                images: true,
                streaming: true,
            },
        }
    }

    /// Third-party servers speaking the same wire format. The API key is read
    /// from `credential_key` in the credential manager.
    pub fn compatible(
        credentials: Arc<SecureCredentialManager>,
        credential_key: impl Into<String>,
        transport: Arc<dyn OpenAiTransport>,
    ) -> Self {
        let mut provider = Self::new(credentials, transport);
        provider.id = ProviderId::OpenAiCompatible;
        provider.credential_key = credential_key.into();
        provider
    }

    pub fn with_fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = model.into();
        self
    }

    pub fn with_image_support(mut self, images: bool) -> Self {
        self.capabilities.images = images;
        self
    }

    fn resolve_auth(&self) -> Result<OpenAiAuth, ProviderError> {
        match self.credentials.api_key(&self.credential_key)? {
            Some(key) => Ok(OpenAiAuth::Bearer(key)),
            None => Err(ProviderError::configuration(format!(
                "no API key configured for '{}'",
                self.credential_key
            ))),
        }
    }

    fn check_capabilities(&self, request: &ModelRequest) -> Result<(), ProviderError> {
        if request.has_images() && !self.capabilities.images {
            return Err(ProviderError::capability(format!(
                "{} model '{}' does not accept images",
                self.id, self.fallback_model
            )));
        }
        Ok(())
    }

    pub(crate) fn build_openai_request(
        &self,
        request: ModelRequest,
        stream: bool,
    ) -> OpenAiRequest {
        build_request(&self.fallback_model, request, stream)
    }
}

pub(crate) fn build_request(
    fallback_model: &str,
    request: ModelRequest,
    stream: bool,
) -> OpenAiRequest {
    let model = if request.model.trim().is_empty() {
        fallback_model.to_string()
    } else {
        request.model
    };

    OpenAiRequest {
        model,
        messages: request
            .messages
            .into_iter()
            .map(OpenAiMessage::from)
            .collect(),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        stream,
    }
}

impl ModelProvider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities
    }

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            self.check_capabilities(&request)?;
            let auth = self.resolve_auth()?;
            let openai_request = self.build_openai_request(request, false);
            let response = self.transport.complete(openai_request, auth).await?;
            Ok(response.into_model_response(self.id))
        })
    }

    fn stream<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            self.check_capabilities(&request)?;
            let auth = self.resolve_auth()?;
            let openai_request = self.build_openai_request(request, true);
            let mut chunks = self.transport.stream(openai_request, auth).await?;
            let id = self.id;

            let stream = try_stream! {
                while let Some(chunk) = chunks.next().await {
                    yield chunk?.into_stream_event(id);
                }
            };

            Ok(Box::pin(stream) as BoxedEventStream<'a>)
        })
    }
}
