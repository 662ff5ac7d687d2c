//! Built-in speech and transcription dialects.

mod gpt_sovits;
mod json_base64;
mod openai_speech;
mod whisper;
mod whisper_cpp;

use pprovider::ProviderError;
use serde_json::{Map, Value};

use crate::RawResponse;

pub use gpt_sovits::GptSovitsSpeech;
pub use json_base64::JsonBase64Speech;
pub use openai_speech::OpenAiSpeech;
pub use whisper::WhisperTranscription;
pub use whisper_cpp::WhisperCppTranscription;

pub(crate) fn require_base_url(base_url: &str, mode: &str) -> Result<(), ProviderError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::configuration(format!("{mode}: base url is required")));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ProviderError::configuration(format!(
            "{mode}: base url must start with http:// or https://"
        )));
    }
    Ok(())
}

pub(crate) fn require_api_key(
    key: Option<&pprovider::SecretString>,
    mode: &str,
) -> Result<(), ProviderError> {
    match key {
        Some(key) if !key.is_blank() => Ok(()),
        _ => Err(ProviderError::configuration(format!("{mode}: API key is required"))),
    }
}

/// Copies host-supplied extra keys into a JSON body without overriding
/// fields the dialect already set.
pub(crate) fn merge_extra(body: &mut Map<String, Value>, extra: &Map<String, Value>) {
    for (key, value) in extra {
        body.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

/// Audio bodies are returned as-is; a JSON body on a success status is the
/// backend reporting a failure in its envelope.
pub(crate) fn raw_audio(response: &RawResponse, mode: &str) -> Result<Vec<u8>, ProviderError> {
    if response.is_json() {
        let text = response.text();
        let message = pprovider::http::extract_error_message(&text)
            .unwrap_or_else(|| format!("{mode}: expected audio but received JSON"));
        return Err(ProviderError::from_status(response.status, text, message));
    }

    if response.body.is_empty() {
        return Err(ProviderError::other(format!("{mode}: empty audio response")));
    }

    Ok(response.body.clone())
}
