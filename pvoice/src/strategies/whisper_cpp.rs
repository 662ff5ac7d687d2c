use pprovider::ProviderError;
use serde_json::Value;

use super::require_base_url;
use crate::settings::non_blank;
use crate::{
    AudioClip, FilePart, MultipartForm, RawResponse, TranscriptionSettings,
    TranscriptionStrategy, VoiceBody,
};

/// whisper.cpp `server` example (`POST /inference`). Answers JSON `text` or
/// plain text depending on `response_format`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhisperCppTranscription;

impl TranscriptionStrategy for WhisperCppTranscription {
    fn mode(&self) -> &'static str {
        "whisper-cpp"
    }

    fn validate_settings(&self, settings: &TranscriptionSettings) -> Result<(), ProviderError> {
        require_base_url(&settings.base_url, self.mode())
    }

    fn endpoint(&self, base_url: &str) -> String {
        let base = base_url.trim().trim_end_matches('/');
        let base = base.strip_suffix("/inference").unwrap_or(base);
        format!("{base}/inference")
    }

    fn build_request_body(
        &self,
        clip: &AudioClip,
        settings: &TranscriptionSettings,
    ) -> Result<VoiceBody, ProviderError> {
        let mut form = MultipartForm::new()
            .text("temperature", "0.0")
            .text("response_format", "json");

        if let Some(language) = non_blank(settings.language.as_deref()) {
            form = form.text("language", language);
        }

        Ok(VoiceBody::Multipart(form.file(FilePart {
            field: "file".into(),
            file_name: clip.file_name(),
            mime_type: clip.mime_type.clone(),
            data: clip.data.clone(),
        })))
    }

    fn parse_response(&self, response: &RawResponse) -> Result<String, ProviderError> {
        let text = response.text();
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(body)) => match body.get("text").and_then(Value::as_str) {
                Some(text) => Ok(text.trim().to_string()),
                None => {
                    let message = body
                        .get("error")
                        .and_then(Value::as_str)
                        .unwrap_or("whisper-cpp: response carries no text field")
                        .to_string();
                    Err(ProviderError::from_status(response.status, text.clone(), message))
                }
            },
            _ => Ok(text.trim().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_json_and_plain_text() {
        let json = RawResponse::ok("application/json", br#"{"text":"meow\n"}"#.to_vec());
        let plain = RawResponse::ok("text/plain", b" meow \n".to_vec());
        assert_eq!(WhisperCppTranscription.parse_response(&json).expect("json"), "meow");
        assert_eq!(WhisperCppTranscription.parse_response(&plain).expect("plain"), "meow");
    }

    #[test]
    fn server_error_field_is_surfaced() {
        let response = RawResponse::ok(
            "application/json",
            br#"{"error":"failed to read WAV"}"#.to_vec(),
        );
        let error = WhisperCppTranscription
            .parse_response(&response)
            .expect_err("error envelope");
        assert_eq!(error.message, "failed to read WAV");
    }

    #[test]
    fn base_url_is_required() {
        let settings = TranscriptionSettings::new("whisper-cpp", "");
        assert!(WhisperCppTranscription.validate_settings(&settings).is_err());
        assert_eq!(
            WhisperCppTranscription.endpoint("http://127.0.0.1:8080/"),
            "http://127.0.0.1:8080/inference"
        );
    }
}
