//! Wire-level request/response values and the HTTP transport seam.

use std::sync::Arc;
use std::time::Duration;

use pcommon::BoxFuture;
use pprovider::http::{HttpClientFactory, map_send_error};
use pprovider::{ProviderError, ProxySettings, SecretString};
use reqwest::multipart::{Form, Part};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum VoiceBody {
    Json(Value),
    Multipart(MultipartForm),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub file: Option<FilePart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, file: FilePart) -> Self {
        self.file = Some(file);
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// One outbound POST.
#[derive(Debug, Clone)]
pub struct VoiceRequest {
    pub url: String,
    pub bearer: Option<SecretString>,
    pub body: VoiceBody,
    pub timeout: Option<Duration>,
}

/// Undecoded response. Strategies interpret the body; the client only checks
/// the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.to_string()),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|value| value.to_ascii_lowercase().contains("json"))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub trait VoiceTransport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: VoiceRequest,
        proxy: Option<ProxySettings>,
    ) -> BoxFuture<'a, Result<RawResponse, ProviderError>>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpVoiceTransport {
    clients: Arc<HttpClientFactory>,
}

impl HttpVoiceTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client_factory(clients: Arc<HttpClientFactory>) -> Self {
        Self { clients }
    }
}

fn build_form(form: MultipartForm) -> Result<Form, ProviderError> {
    let mut multipart = Form::new();
    for (name, value) in form.fields {
        multipart = multipart.text(name, value);
    }

    if let Some(file) = form.file {
        let part = Part::bytes(file.data)
            .file_name(file.file_name)
            .mime_str(&file.mime_type)
            .map_err(|err| ProviderError::invalid_request(format!("audio mime type: {err}")))?;
        multipart = multipart.part(file.field, part);
    }

    Ok(multipart)
}

impl VoiceTransport for HttpVoiceTransport {
    fn send<'a>(
        &'a self,
        request: VoiceRequest,
        proxy: Option<ProxySettings>,
    ) -> BoxFuture<'a, Result<RawResponse, ProviderError>> {
        Box::pin(async move {
            let client = self.clients.client_for(proxy)?;
            let mut builder = client.post(&request.url);
            if let Some(bearer) = &request.bearer {
                builder = builder.bearer_auth(bearer.expose());
            }
            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }

            builder = match request.body {
                VoiceBody::Json(value) => builder.json(&value),
                VoiceBody::Multipart(form) => builder.multipart(build_form(form)?),
            };

            let response = builder.send().await.map_err(map_send_error)?;
            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let body = response.bytes().await.map_err(map_send_error)?.to_vec();

            Ok(RawResponse {
                status,
                content_type,
                body,
            })
        })
    }
}
