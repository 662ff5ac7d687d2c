use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pprovider::ProviderError;
use serde_json::{Map, Value, json};

use super::{merge_extra, require_base_url};
use crate::settings::non_blank;
use crate::{RawResponse, SpeechSettings, SpeechStrategy, VoiceBody};

/// Custom endpoints that answer with base64 audio inside a JSON envelope:
/// `{"audio": ".."}`, `{"data": {"audio": ".."}}` or `{"data": ".."}`. Raw
/// audio bodies are accepted too.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonBase64Speech;

impl SpeechStrategy for JsonBase64Speech {
    fn mode(&self) -> &'static str {
        "json-base64"
    }

    fn validate_settings(&self, settings: &SpeechSettings) -> Result<(), ProviderError> {
        require_base_url(&settings.base_url, self.mode())
    }

    /// The base url is the full endpoint for this dialect.
    fn endpoint(&self, base_url: &str) -> String {
        base_url.trim().trim_end_matches('/').to_string()
    }

    fn build_request_body(
        &self,
        text: &str,
        settings: &SpeechSettings,
    ) -> Result<VoiceBody, ProviderError> {
        let mut body = Map::new();
        body.insert("text".into(), json!(text));
        if let Some(voice) = non_blank(settings.voice.as_deref()) {
            body.insert("voice".into(), json!(voice));
        }
        if let Some(model) = non_blank(settings.model.as_deref()) {
            body.insert("model".into(), json!(model));
        }
        if let Some(language) = non_blank(settings.language.as_deref()) {
            body.insert("language".into(), json!(language));
        }
        body.insert(
            "format".into(),
            json!(non_blank(settings.format.as_deref()).unwrap_or("wav")),
        );
        if let Some(speed) = settings.speed {
            body.insert("speed".into(), json!(speed));
        }
        merge_extra(&mut body, &settings.extra);

        Ok(VoiceBody::Json(Value::Object(body)))
    }

    fn parse_response(&self, response: &RawResponse) -> Result<Vec<u8>, ProviderError> {
        let looks_like_json = response.is_json()
            || response
                .body
                .iter()
                .find(|byte| !byte.is_ascii_whitespace())
                .is_some_and(|byte| *byte == b'{');

        if !looks_like_json {
            if response.body.is_empty() {
                return Err(ProviderError::other("json-base64: empty audio response"));
            }
            return Ok(response.body.clone());
        }

        let envelope: Value = serde_json::from_slice(&response.body).map_err(|err| {
            ProviderError::other(format!("json-base64: response is not valid JSON: {err}"))
        })?;

        let encoded = envelope
            .get("audio")
            .and_then(Value::as_str)
            .or_else(|| envelope.pointer("/data/audio").and_then(Value::as_str))
            .or_else(|| envelope.get("data").and_then(Value::as_str))
            .ok_or_else(|| {
                let text = response.text();
                let message = pprovider::http::extract_error_message(&text)
                    .unwrap_or_else(|| "json-base64: response carries no audio field".to_string());
                ProviderError::from_status(response.status, text, message)
            })?;

        decode_audio(encoded)
    }
}

/// Accepts bare base64 or a `data:<mime>;base64,` URL.
fn decode_audio(encoded: &str) -> Result<Vec<u8>, ProviderError> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };

    STANDARD
        .decode(payload.trim())
        .map_err(|err| ProviderError::other(format!("json-base64: invalid base64 audio: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_prefix_is_stripped() {
        assert_eq!(
            decode_audio("data:audio/wav;base64,AQID").expect("decode"),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn envelope_without_audio_reports_backend_message() {
        let response = RawResponse::ok(
            "application/json",
            br#"{"message":"quota exceeded"}"#.to_vec(),
        );
        let error = JsonBase64Speech
            .parse_response(&response)
            .expect_err("no audio");
        assert_eq!(error.message, "quota exceeded");
    }

    #[test]
    fn endpoint_is_used_verbatim() {
        assert_eq!(
            JsonBase64Speech.endpoint(" https://tts.example.com/api/speak/ "),
            "https://tts.example.com/api/speak"
        );
    }
}
