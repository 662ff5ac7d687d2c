//! Provider-agnostic message, request, and response model types.
//!
//! ```rust
//! use pprovider::{Message, ModelRequest, ProviderErrorKind, Role};
//!
//! let ok = ModelRequest::new_validated(
//!     "gpt-4o-mini",
//!     vec![Message::new(Role::User, "How is the pet feeling?")],
//! );
//! assert!(ok.is_ok());
//!
//! let err = ModelRequest::new_validated("gpt-4o-mini", Vec::new())
//!     .err()
//!     .expect("empty history should fail");
//! assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);
//! ```

use std::fmt::{Display, Formatter};
use std::time::SystemTime;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pcommon::MetadataMap;

use crate::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenAi,
    OpenAiCompatible,
    Ollama,
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let id = match self {
            Self::OpenAi => "openai",
            Self::OpenAiCompatible => "openai-compatible",
            Self::Ollama => "ollama",
        };

        f.write_str(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    System,
    User,
    Assistant,
    /// Result of an action plugin fed back to the backend.
    Function,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Function => "function",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "function" => Some(Self::Function),
            _ => None,
        }
    }
}

/// Encoded image bytes attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub media_type: String,
    pub data: Vec<u8>,
}

impl ImagePayload {
    pub fn new(media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            media_type: media_type.into(),
            data,
        }
    }

    /// Builds a payload from raw encoded bytes, sniffing the media type from the
    /// file signature. Unknown signatures are labelled `image/png`.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let media_type = sniff_media_type(&data).unwrap_or("image/png");
        Self::new(media_type, data)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.to_base64())
    }

    pub fn from_base64(
        media_type: impl Into<String>,
        encoded: &str,
    ) -> Result<Self, ProviderError> {
        let data = STANDARD.decode(encoded.trim()).map_err(|err| {
            ProviderError::invalid_request(format!("image payload is not valid base64: {err}"))
        })?;
        Ok(Self::new(media_type, data))
    }
}

fn sniff_media_type(data: &[u8]) -> Option<&'static str> {
    match data {
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}

/// One conversation entry. Equality covers the timestamp, so a message survives
/// persistence only if its timestamp does too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub image: Option<ImagePayload>,
    pub timestamp: SystemTime,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self::at(role, content, SystemTime::now())
    }

    pub fn at(role: Role, content: impl Into<String>, timestamp: SystemTime) -> Self {
        Self {
            role,
            content: content.into(),
            image: None,
            timestamp,
        }
    }

    pub fn with_image(mut self, image: ImagePayload) -> Self {
        self.image = Some(image);
        self
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    Cancelled,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn accumulate(&mut self, other: TokenUsage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProviderCapabilities {
    pub images: bool,
    pub streaming: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelResponse {
    pub provider: ProviderId,
    pub model: String,
    pub text: String,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    /// Empty means "use the adapter's fallback model".
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stream: bool,
    pub metadata: MetadataMap,
}

impl ModelRequest {
    pub fn builder(model: impl Into<String>) -> ModelRequestBuilder {
        ModelRequestBuilder::new(model)
    }

    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            stream: false,
            metadata: MetadataMap::new(),
        }
    }

    pub fn new_validated(
        model: impl Into<String>,
        messages: Vec<Message>,
    ) -> Result<Self, ProviderError> {
        let request = Self::new(model, messages);
        request.validate()?;
        Ok(request)
    }

    pub fn has_images(&self) -> bool {
        self.messages.iter().any(Message::has_image)
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.messages.is_empty() {
            return Err(ProviderError::invalid_request(
                "at least one message is required",
            ));
        }

        if let Some(max_tokens) = self.max_tokens
            && max_tokens == 0
        {
            return Err(ProviderError::invalid_request(
                "max_tokens must be greater than zero",
            ));
        }

        if let Some(temperature) = self.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(ProviderError::invalid_request(
                "temperature must be in the inclusive range 0.0..=2.0",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequestBuilder {
    request: ModelRequest,
}

impl ModelRequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            request: ModelRequest::new(model, Vec::new()),
        }
    }

    pub fn message(mut self, message: Message) -> Self {
        self.request.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.request.messages.extend(messages);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.request.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.request.max_tokens = Some(max_tokens);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.metadata.insert(key.into(), value.into());
        self
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.request.stream = stream;
        self
    }

    pub fn build(self) -> Result<ModelRequest, ProviderError> {
        self.request.validate()?;
        Ok(self.request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;

    #[test]
    fn provider_id_display_is_stable() {
        assert_eq!(ProviderId::OpenAi.to_string(), "openai");
        assert_eq!(ProviderId::OpenAiCompatible.to_string(), "openai-compatible");
        assert_eq!(ProviderId::Ollama.to_string(), "ollama");
    }

    #[test]
    fn role_names_round_trip() {
        for role in [Role::System, Role::User, Role::Assistant, Role::Function] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("tool"), None);
    }

    #[test]
    fn image_payload_sniffs_signatures() {
        let png = ImagePayload::from_bytes(vec![0x89, b'P', b'N', b'G', 0x0D]);
        assert_eq!(png.media_type, "image/png");

        let jpeg = ImagePayload::from_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]);
        assert_eq!(jpeg.media_type, "image/jpeg");
        assert!(jpeg.to_data_url().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn image_payload_base64_round_trips() {
        let image = ImagePayload::new("image/gif", vec![1, 2, 3, 250]);
        let decoded =
            ImagePayload::from_base64("image/gif", &image.to_base64()).expect("decode image");
        assert_eq!(decoded, image);

        let error = ImagePayload::from_base64("image/gif", "%%%").expect_err("bad base64");
        assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
    }

    #[test]
    fn builder_validates_generation_options() {
        let error = ModelRequest::builder("gpt-4o-mini")
            .message(Message::new(Role::User, "hi"))
            .temperature(3.5)
            .build()
            .expect_err("temperature out of range");
        assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);

        let request = ModelRequest::builder("")
            .message(Message::new(Role::User, "hi"))
            .max_tokens(64)
            .streaming(true)
            .build()
            .expect("empty model falls back in adapters");
        assert!(request.stream);
        assert_eq!(request.max_tokens, Some(64));
    }

    #[test]
    fn usage_accumulates_saturating() {
        let mut usage = TokenUsage::default();
        usage.accumulate(TokenUsage {
            input_tokens: 3,
            output_tokens: 2,
            total_tokens: 5,
        });
        usage.accumulate(TokenUsage {
            input_tokens: u32::MAX,
            output_tokens: 1,
            total_tokens: 1,
        });
        assert_eq!(usage.input_tokens, u32::MAX);
        assert_eq!(usage.total_tokens, 6);
    }
}
