//! OpenAI-compatible adapter types and provider-agnostic conversion logic.

use std::fmt::Formatter;

use crate::{
    ImagePayload, Message, ModelResponse, ProviderId, Role, SecretString, StopReason, StreamEvent,
    TokenUsage,
};

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiRequest {
    pub model: String,
    pub messages: Vec<OpenAiMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiMessage {
    pub role: OpenAiRole,
    pub content: String,
    pub image: Option<ImagePayload>,
}

impl From<Message> for OpenAiMessage {
    fn from(value: Message) -> Self {
        Self {
            role: value.role.into(),
            content: value.content,
            image: value.image,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiRole {
    System,
    User,
    Assistant,
}

impl OpenAiRole {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl From<Role> for OpenAiRole {
    fn from(value: Role) -> Self {
        match value {
            Role::System => Self::System,
            // Action results are replayed as user turns.
            Role::User | Role::Function => Self::User,
            Role::Assistant => Self::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiResponse {
    pub model: String,
    pub content: String,
    pub finish_reason: OpenAiFinishReason,
    pub usage: OpenAiUsage,
}

impl OpenAiResponse {
    pub(crate) fn into_model_response(self, provider: ProviderId) -> ModelResponse {
        ModelResponse {
            provider,
            model: self.model,
            text: self.content,
            stop_reason: self.finish_reason.into(),
            usage: self.usage.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiFinishReason {
    Stop,
    Length,
    Cancelled,
    Other,
}

impl From<OpenAiFinishReason> for StopReason {
    fn from(value: OpenAiFinishReason) -> Self {
        match value {
            OpenAiFinishReason::Stop => Self::EndTurn,
            OpenAiFinishReason::Length => Self::MaxTokens,
            OpenAiFinishReason::Cancelled => Self::Cancelled,
            OpenAiFinishReason::Other => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenAiUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl From<OpenAiUsage> for TokenUsage {
    fn from(value: OpenAiUsage) -> Self {
        Self {
            input_tokens: value.prompt_tokens,
            output_tokens: value.completion_tokens,
            total_tokens: value.total_tokens,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum OpenAiAuth {
    Bearer(SecretString),
    /// Local servers such as Ollama accept unauthenticated requests.
    None,
}

impl std::fmt::Debug for OpenAiAuth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("OpenAiAuth::Bearer([REDACTED])"),
            Self::None => f.write_str("OpenAiAuth::None"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenAiStreamChunk {
    TextDelta(String),
    ResponseComplete(OpenAiResponse),
}

impl OpenAiStreamChunk {
    pub(crate) fn into_stream_event(self, provider: ProviderId) -> StreamEvent {
        match self {
            Self::TextDelta(delta) => StreamEvent::TextDelta(delta),
            Self::ResponseComplete(response) => {
                StreamEvent::ResponseComplete(response.into_model_response(provider))
            }
        }
    }
}
