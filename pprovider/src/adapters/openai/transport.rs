//! Chat-completions transport trait and reqwest-based HTTP implementation.

use std::pin::Pin;

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::Client;

use crate::http::{map_send_error, status_error};
use crate::{ProviderError, ProviderFuture};

use super::serde_api::{
    OpenAiApiResponse, OpenAiApiStreamResponse, build_api_request, parse_finish_reason,
};
use super::types::{
    OpenAiAuth, OpenAiFinishReason, OpenAiRequest, OpenAiResponse, OpenAiStreamChunk,
    OpenAiUsage,
};

pub type OpenAiChunkStream<'a> =
    Pin<Box<dyn Stream<Item = Result<OpenAiStreamChunk, ProviderError>> + Send + 'a>>;

pub trait OpenAiTransport: Send + Sync + std::fmt::Debug {
    fn complete<'a>(
        &'a self,
        request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>>;

    fn stream<'a>(
        &'a self,
        request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>>;
}

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Normalizes a user-entered base URL to the `/v1` API root.
///
/// ```rust
/// use pprovider::adapters::openai::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://api.example.com"), "https://api.example.com/v1");
/// assert_eq!(normalize_base_url("https://api.example.com/v1/"), "https://api.example.com/v1");
/// assert_eq!(
///     normalize_base_url("http://host/v1/chat/completions"),
///     "http://host/v1"
/// );
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("/chat/completions").unwrap_or(trimmed);

    if trimmed.ends_with("/v1") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiHttpTransport {
    client: Client,
    base_url: String,
    backend: &'static str,
}

impl OpenAiHttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: OPENAI_BASE_URL.to_string(),
            backend: "openai",
        }
    }

    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.base_url = normalize_base_url(base_url.as_ref());
        self
    }

    /// Label used in error messages.
    pub fn with_backend_label(mut self, backend: &'static str) -> Self {
        self.backend = backend;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send(
        &self,
        request: OpenAiRequest,
        auth: &OpenAiAuth,
    ) -> Result<reqwest::Response, ProviderError> {
        let api_request = build_api_request(request)?;
        let mut builder = self.client.post(self.endpoint()).json(&api_request);
        if let OpenAiAuth::Bearer(key) = auth {
            builder = builder.bearer_auth(key.expose());
        }

        let response = builder.send().await.map_err(map_send_error)?;
        if !response.status().is_success() {
            return Err(status_error(response, self.backend).await);
        }

        Ok(response)
    }
}

impl OpenAiTransport for OpenAiHttpTransport {
    fn complete<'a>(
        &'a self,
        mut request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>> {
        Box::pin(async move {
            request.stream = false;
            let response = self.send(request, &auth).await?;
            let parsed: OpenAiApiResponse = response.json().await.map_err(map_send_error)?;
            OpenAiResponse::try_from(parsed)
        })
    }

    fn stream<'a>(
        &'a self,
        mut request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>> {
        Box::pin(async move {
            request.stream = true;
            let fallback_model = request.model.clone();
            let response = self.send(request, &auth).await?;

            let stream = try_stream! {
                let mut chunks = response.bytes_stream();
                let mut decoder = SseDecoder::default();
                let mut content = String::new();
                let mut model = None::<String>;
                let mut finish_reason = OpenAiFinishReason::Other;
                let mut usage = OpenAiUsage::default();
                let mut finished = false;

                while let Some(item) = chunks.next().await {
                    let bytes = item.map_err(map_send_error)?;

                    for payload in decoder.push(&bytes)? {
                        if payload == "[DONE]" {
                            finished = true;
                            break;
                        }

                        let parsed: OpenAiApiStreamResponse = serde_json::from_str(&payload)
                            .map_err(|err| ProviderError::transport(err.to_string()))?;

                        if model.is_none() && !parsed.model.is_empty() {
                            model = Some(parsed.model.clone());
                        }

                        if let Some(reported) = parsed.usage {
                            usage = reported.into();
                        }

                        if let Some(choice) = parsed.choices.first() {
                            if let Some(delta) = &choice.delta.content
                                && !delta.is_empty()
                            {
                                content.push_str(delta);
                                yield OpenAiStreamChunk::TextDelta(delta.clone());
                            }

                            if choice.finish_reason.is_some() {
                                finish_reason =
                                    parse_finish_reason(choice.finish_reason.as_deref());
                            }
                        }
                    }

                    if finished {
                        break;
                    }
                }

                yield OpenAiStreamChunk::ResponseComplete(OpenAiResponse {
                    model: model.unwrap_or(fallback_model),
                    content,
                    finish_reason,
                    usage,
                });
            };

            Ok(Box::pin(stream) as OpenAiChunkStream<'a>)
        })
    }
}

/// Splits a server-sent-events byte stream into `data:` payloads. Bytes are
/// buffered until a full line arrives so multi-byte characters split across
/// network chunks decode correctly.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, ProviderError> {
        self.buffer.extend_from_slice(bytes);
        let mut payloads = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line = self.buffer.drain(..=newline).collect::<Vec<_>>();
            let line = std::str::from_utf8(&line)
                .map_err(|err| ProviderError::transport(err.to_string()))?
                .trim();

            if let Some(payload) = line.strip_prefix("data:") {
                payloads.push(payload.trim().to_string());
            }
        }

        Ok(payloads)
    }
}
