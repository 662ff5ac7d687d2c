use pprovider::ProviderError;
use pprovider::adapters::openai::normalize_base_url;
use serde_json::Value;

use super::require_api_key;
use crate::settings::non_blank;
use crate::{
    AudioClip, FilePart, MultipartForm, RawResponse, TranscriptionSettings,
    TranscriptionStrategy, VoiceBody,
};

pub const WHISPER_BASE_URL: &str = "https://api.openai.com";

/// OpenAI `/v1/audio/transcriptions` (multipart upload, JSON `text`).
#[derive(Debug, Default, Clone, Copy)]
pub struct WhisperTranscription;

impl TranscriptionStrategy for WhisperTranscription {
    fn mode(&self) -> &'static str {
        "whisper"
    }

    fn validate_settings(&self, settings: &TranscriptionSettings) -> Result<(), ProviderError> {
        require_api_key(settings.api_key.as_ref(), self.mode())
    }

    fn endpoint(&self, base_url: &str) -> String {
        let base = non_blank(Some(base_url)).unwrap_or(WHISPER_BASE_URL);
        format!("{}/audio/transcriptions", normalize_base_url(base))
    }

    fn build_request_body(
        &self,
        clip: &AudioClip,
        settings: &TranscriptionSettings,
    ) -> Result<VoiceBody, ProviderError> {
        let mut form = MultipartForm::new()
            .text(
                "model",
                non_blank(settings.model.as_deref()).unwrap_or("whisper-1"),
            )
            .text("response_format", "json");

        if let Some(language) = non_blank(settings.language.as_deref()) {
            form = form.text("language", language);
        }

        for (key, value) in &settings.extra {
            if form.field(key).is_none()
                && let Some(value) = value.as_str()
            {
                form = form.text(key.as_str(), value);
            }
        }

        Ok(VoiceBody::Multipart(form.file(FilePart {
            field: "file".into(),
            file_name: clip.file_name(),
            mime_type: clip.mime_type.clone(),
            data: clip.data.clone(),
        })))
    }

    fn parse_response(&self, response: &RawResponse) -> Result<String, ProviderError> {
        let body: Value = serde_json::from_slice(&response.body).map_err(|err| {
            ProviderError::other(format!("whisper: response is not valid JSON: {err}"))
        })?;

        body.get("text")
            .and_then(Value::as_str)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| {
                ProviderError::from_status(
                    response.status,
                    response.text(),
                    "whisper: response carries no text field",
                )
            })
    }
}
