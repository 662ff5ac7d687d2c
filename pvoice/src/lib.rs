//! Speech synthesis and transcription behind interchangeable API dialects.
//!
//! Each dialect is a strategy with four steps: validate settings, build the
//! endpoint, build the request body, parse the response. Clients pick the
//! strategy by `settings.mode` on every call.
//!
//! ```rust
//! use pvoice::{SpeechStrategy, strategies::OpenAiSpeech};
//!
//! assert_eq!(
//!     OpenAiSpeech.endpoint("https://api.openai.com"),
//!     "https://api.openai.com/v1/audio/speech"
//! );
//! ```

mod client;
mod settings;
mod strategy;
pub mod strategies;
mod transport;

pub mod prelude {
    pub use crate::{
        AudioClip, SpeechSettings, SpeechStrategy, SpeechSynthesizer, Transcriber,
        TranscriptionSettings, TranscriptionStrategy, VoiceTransport,
    };
}

pub use client::{SpeechSynthesizer, Transcriber};
pub use settings::{AudioClip, DEFAULT_SPEECH_TIMEOUT, SpeechSettings, TranscriptionSettings};
pub use strategy::{SpeechStrategy, StrategyRegistry, TranscriptionStrategy};
pub use transport::{
    FilePart, HttpVoiceTransport, MultipartForm, RawResponse, VoiceBody, VoiceRequest,
    VoiceTransport,
};
