use pprovider::ProviderError;
use pprovider::adapters::openai::normalize_base_url;
use serde_json::{Map, Value, json};

use super::{merge_extra, raw_audio, require_api_key};
use crate::settings::non_blank;
use crate::{RawResponse, SpeechSettings, SpeechStrategy, VoiceBody};

pub const OPENAI_SPEECH_BASE_URL: &str = "https://api.openai.com";

/// OpenAI `/v1/audio/speech`, also served by many compatible gateways.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenAiSpeech;

impl SpeechStrategy for OpenAiSpeech {
    fn mode(&self) -> &'static str {
        "openai"
    }

    fn validate_settings(&self, settings: &SpeechSettings) -> Result<(), ProviderError> {
        require_api_key(settings.api_key.as_ref(), self.mode())?;

        if let Some(speed) = settings.speed
            && !(0.25..=4.0).contains(&speed)
        {
            return Err(ProviderError::configuration(
                "openai: speed must be within 0.25..=4.0",
            ));
        }

        Ok(())
    }

    fn endpoint(&self, base_url: &str) -> String {
        let base = non_blank(Some(base_url)).unwrap_or(OPENAI_SPEECH_BASE_URL);
        format!("{}/audio/speech", normalize_base_url(base))
    }

    fn build_request_body(
        &self,
        text: &str,
        settings: &SpeechSettings,
    ) -> Result<VoiceBody, ProviderError> {
        let mut body = Map::new();
        body.insert(
            "model".into(),
            json!(non_blank(settings.model.as_deref()).unwrap_or("tts-1")),
        );
        body.insert("input".into(), json!(text));
        body.insert(
            "voice".into(),
            json!(non_blank(settings.voice.as_deref()).unwrap_or("alloy")),
        );
        body.insert(
            "response_format".into(),
            json!(non_blank(settings.format.as_deref()).unwrap_or("mp3")),
        );
        if let Some(speed) = settings.speed {
            body.insert("speed".into(), json!(speed));
        }
        merge_extra(&mut body, &settings.extra);

        Ok(VoiceBody::Json(Value::Object(body)))
    }

    fn parse_response(&self, response: &RawResponse) -> Result<Vec<u8>, ProviderError> {
        raw_audio(response, self.mode())
    }
}
