use pprovider::ProviderError;
use serde_json::{Map, Value, json};

use super::{merge_extra, raw_audio, require_base_url};
use crate::settings::non_blank;
use crate::{RawResponse, SpeechSettings, SpeechStrategy, VoiceBody};

/// GPT-SoVITS `api_v2.py` server (`POST /tts`). Local, unauthenticated; voice
/// cloning needs a reference clip on the server's filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct GptSovitsSpeech;

impl SpeechStrategy for GptSovitsSpeech {
    fn mode(&self) -> &'static str {
        "gpt-sovits"
    }

    fn validate_settings(&self, settings: &SpeechSettings) -> Result<(), ProviderError> {
        require_base_url(&settings.base_url, self.mode())?;

        if non_blank(settings.reference_audio.as_deref()).is_none() {
            return Err(ProviderError::configuration(
                "gpt-sovits: reference audio path is required",
            ));
        }

        Ok(())
    }

    fn endpoint(&self, base_url: &str) -> String {
        let base = base_url.trim().trim_end_matches('/');
        let base = base.strip_suffix("/tts").unwrap_or(base);
        format!("{base}/tts")
    }

    fn build_request_body(
        &self,
        text: &str,
        settings: &SpeechSettings,
    ) -> Result<VoiceBody, ProviderError> {
        let language = non_blank(settings.language.as_deref()).unwrap_or("auto");
        let mut body = Map::new();
        body.insert("text".into(), json!(text));
        body.insert("text_lang".into(), json!(language));
        body.insert(
            "ref_audio_path".into(),
            json!(non_blank(settings.reference_audio.as_deref()).unwrap_or_default()),
        );
        body.insert("prompt_lang".into(), json!(language));
        body.insert(
            "prompt_text".into(),
            json!(non_blank(settings.prompt_text.as_deref()).unwrap_or_default()),
        );
        body.insert("text_split_method".into(), json!("cut5"));
        body.insert("batch_size".into(), json!(1));
        body.insert(
            "media_type".into(),
            json!(non_blank(settings.format.as_deref()).unwrap_or("wav")),
        );
        body.insert("streaming_mode".into(), json!(false));
        if let Some(speed) = settings.speed {
            body.insert("speed_factor".into(), json!(speed));
        }
        merge_extra(&mut body, &settings.extra);

        Ok(VoiceBody::Json(Value::Object(body)))
    }

    fn parse_response(&self, response: &RawResponse) -> Result<Vec<u8>, ProviderError> {
        raw_audio(response, self.mode())
    }
}
