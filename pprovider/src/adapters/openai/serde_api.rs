//! Chat-completions HTTP payload serde models and conversion helpers.

use serde::{Deserialize, Serialize};

use crate::ProviderError;

use super::types::{
    OpenAiFinishReason, OpenAiMessage, OpenAiRequest, OpenAiResponse, OpenAiRole, OpenAiUsage,
};

pub(crate) fn build_api_request(request: OpenAiRequest) -> Result<OpenAiApiRequest, ProviderError> {
    let messages = request
        .messages
        .into_iter()
        .map(OpenAiApiMessage::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    if messages.is_empty() {
        return Err(ProviderError::invalid_request(
            "chat completion request requires at least one message",
        ));
    }

    Ok(OpenAiApiRequest {
        model: request.model,
        messages,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        stream: request.stream,
    })
}

pub(crate) fn parse_finish_reason(value: Option<&str>) -> OpenAiFinishReason {
    match value {
        Some("stop") => OpenAiFinishReason::Stop,
        Some("length") => OpenAiFinishReason::Length,
        Some("cancelled") => OpenAiFinishReason::Cancelled,
        _ => OpenAiFinishReason::Other,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiRequest {
    pub model: String,
    pub messages: Vec<OpenAiApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiMessage {
    pub role: &'static str,
    pub content: OpenAiApiContent,
}

/// Plain string for text-only messages, content parts when an image is attached.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum OpenAiApiContent {
    Text(String),
    Parts(Vec<OpenAiApiContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum OpenAiApiContentPart {
    Text { text: String },
    ImageUrl { image_url: OpenAiApiImageUrl },
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiImageUrl {
    pub url: String,
}

impl TryFrom<OpenAiMessage> for OpenAiApiMessage {
    type Error = ProviderError;

    fn try_from(value: OpenAiMessage) -> Result<Self, Self::Error> {
        if value.content.trim().is_empty()
            && value.image.is_none()
            && value.role != OpenAiRole::Assistant
        {
            return Err(ProviderError::invalid_request(
                "chat message content must not be empty",
            ));
        }

        let content = match value.image {
            None => OpenAiApiContent::Text(value.content),
            Some(image) => {
                let mut parts = Vec::with_capacity(2);
                if !value.content.is_empty() {
                    parts.push(OpenAiApiContentPart::Text {
                        text: value.content,
                    });
                }
                parts.push(OpenAiApiContentPart::ImageUrl {
                    image_url: OpenAiApiImageUrl {
                        url: image.to_data_url(),
                    },
                });
                OpenAiApiContent::Parts(parts)
            }
        };

        Ok(Self {
            role: value.role.as_str(),
            content,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiResponse {
    #[serde(default)]
    pub model: String,
    pub choices: Vec<OpenAiApiChoice>,
    pub usage: Option<OpenAiApiUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiChoice {
    pub message: OpenAiApiAssistantMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiAssistantMessage {
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpenAiApiUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl From<OpenAiApiUsage> for OpenAiUsage {
    fn from(value: OpenAiApiUsage) -> Self {
        Self {
            prompt_tokens: value.prompt_tokens,
            completion_tokens: value.completion_tokens,
            total_tokens: value.total_tokens,
        }
    }
}

impl TryFrom<OpenAiApiResponse> for OpenAiResponse {
    type Error = ProviderError;

    fn try_from(value: OpenAiApiResponse) -> Result<Self, Self::Error> {
        let choice = value
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::transport("chat response did not include choices"))?;

        Ok(Self {
            model: value.model,
            content: choice.message.content.unwrap_or_default(),
            finish_reason: parse_finish_reason(choice.finish_reason.as_deref()),
            usage: value.usage.unwrap_or_default().into(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiStreamResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<OpenAiApiStreamChoice>,
    pub usage: Option<OpenAiApiUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiStreamChoice {
    pub delta: OpenAiApiStreamDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiStreamDelta {
    pub content: Option<String>,
}
