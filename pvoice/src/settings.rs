//! Host-supplied settings for one speech backend.
//!
//! ```rust
//! use pvoice::SpeechSettings;
//!
//! let settings: SpeechSettings = serde_json::from_str(
//!     r#"{"mode":"gpt-sovits","base_url":"http://127.0.0.1:9880","reference_audio":"ref.wav"}"#,
//! )
//! .expect("settings should parse");
//! assert_eq!(settings.mode, "gpt-sovits");
//! assert!(settings.api_key.is_none());
//! ```

use std::time::Duration;

use pprovider::SecretString;
use serde::Deserialize;
use serde_json::{Map, Value};

pub const DEFAULT_SPEECH_TIMEOUT: Duration = Duration::from_secs(60);

/// Text-to-speech settings. Unused fields are ignored by dialects that do not
/// understand them; `extra` is merged into JSON bodies verbatim.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub mode: String,
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub model: Option<String>,
    pub voice: Option<String>,
    /// Output container such as `mp3` or `wav`.
    pub format: Option<String>,
    pub speed: Option<f32>,
    pub language: Option<String>,
    /// Reference clip path for voice-cloning dialects.
    pub reference_audio: Option<String>,
    /// Transcript of `reference_audio`.
    pub prompt_text: Option<String>,
    pub extra: Map<String, Value>,
}

impl SpeechSettings {
    pub fn new(mode: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key));
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_reference_audio(mut self, path: impl Into<String>) -> Self {
        self.reference_audio = Some(path.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    pub mode: String,
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub model: Option<String>,
    /// ISO-639-1 hint; omitted lets the backend detect the language.
    pub language: Option<String>,
    pub extra: Map<String, Value>,
}

impl TranscriptionSettings {
    pub fn new(mode: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key));
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Recorded audio handed to a transcription backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl AudioClip {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    pub fn wav(data: Vec<u8>) -> Self {
        Self::new(data, "audio/wav")
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Upload file name derived from the MIME type.
    pub fn file_name(&self) -> String {
        let base = self
            .mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        let extension = match base {
            "audio/webm" => "webm",
            "audio/mp3" | "audio/mpeg" => "mp3",
            "audio/ogg" => "ogg",
            "audio/flac" => "flac",
            "audio/mp4" | "audio/m4a" => "m4a",
            _ => "wav",
        };
        format!("audio.{extension}")
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_file_names_follow_mime_type() {
        assert_eq!(AudioClip::wav(vec![1]).file_name(), "audio.wav");
        assert_eq!(
            AudioClip::new(vec![1], "audio/webm;codecs=opus").file_name(),
            "audio.webm"
        );
        assert_eq!(AudioClip::new(vec![1], "audio/mpeg").file_name(), "audio.mp3");
        assert_eq!(AudioClip::new(vec![1], "audio/x-unknown").file_name(), "audio.wav");
    }

    #[test]
    fn transcription_settings_deserialize_with_defaults() {
        let settings: TranscriptionSettings =
            serde_json::from_str(r#"{"mode":"whisper","api_key":"sk-1"}"#).expect("parse");
        assert_eq!(settings.mode, "whisper");
        assert!(settings.base_url.is_empty());
        assert_eq!(
            settings.api_key.as_ref().map(|key| key.expose()),
            Some("sk-1")
        );
        assert!(settings.extra.is_empty());
    }
}
