//! Per-dialect strategy contracts and the mode-keyed registry.

use std::sync::Arc;

use pcommon::Registry;
use pprovider::{ProviderError, SecretString};

use crate::{AudioClip, RawResponse, SpeechSettings, TranscriptionSettings, VoiceBody};

/// One text-to-speech API dialect.
pub trait SpeechStrategy: Send + Sync {
    /// Registry key, matched against [`SpeechSettings::mode`].
    fn mode(&self) -> &'static str;

    /// Fails fast, before any network traffic, on unusable settings.
    fn validate_settings(&self, settings: &SpeechSettings) -> Result<(), ProviderError>;

    /// Full request URL for a user-entered base URL.
    fn endpoint(&self, base_url: &str) -> String;

    fn build_request_body(
        &self,
        text: &str,
        settings: &SpeechSettings,
    ) -> Result<VoiceBody, ProviderError>;

    /// Extracts the audio bytes from a successful response.
    fn parse_response(&self, response: &RawResponse) -> Result<Vec<u8>, ProviderError>;

    fn bearer(&self, settings: &SpeechSettings) -> Option<SecretString> {
        settings.api_key.clone().filter(|key| !key.is_blank())
    }
}

/// One speech-to-text API dialect.
pub trait TranscriptionStrategy: Send + Sync {
    fn mode(&self) -> &'static str;

    fn validate_settings(&self, settings: &TranscriptionSettings) -> Result<(), ProviderError>;

    fn endpoint(&self, base_url: &str) -> String;

    fn build_request_body(
        &self,
        clip: &AudioClip,
        settings: &TranscriptionSettings,
    ) -> Result<VoiceBody, ProviderError>;

    fn parse_response(&self, response: &RawResponse) -> Result<String, ProviderError>;

    fn bearer(&self, settings: &TranscriptionSettings) -> Option<SecretString> {
        settings.api_key.clone().filter(|key| !key.is_blank())
    }
}

/// Strategies keyed by normalized mode id, resolved per call.
pub struct StrategyRegistry<S: ?Sized> {
    strategies: Registry<String, Arc<S>>,
}

impl<S: ?Sized> Default for StrategyRegistry<S> {
    fn default() -> Self {
        Self {
            strategies: Registry::new(),
        }
    }
}

impl<S: ?Sized> StrategyRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mode: &str, strategy: Arc<S>) -> Option<Arc<S>> {
        self.strategies.insert(normalize_mode(mode), strategy)
    }

    pub fn get(&self, mode: &str) -> Option<Arc<S>> {
        self.strategies.get(normalize_mode(mode).as_str()).cloned()
    }

    pub fn contains(&self, mode: &str) -> bool {
        self.strategies.contains_key(normalize_mode(mode).as_str())
    }

    pub fn modes(&self) -> Vec<String> {
        self.strategies.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

fn normalize_mode(mode: &str) -> String {
    mode.trim().to_ascii_lowercase().replace('_', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_ignore_case_and_separator_style() {
        let mut registry: StrategyRegistry<str> = StrategyRegistry::new();
        registry.insert("GPT_SoVITS", Arc::from("sovits"));
        registry.insert("openai", Arc::from("openai"));

        assert_eq!(registry.get("gpt-sovits").as_deref(), Some("sovits"));
        assert!(registry.contains(" OpenAI "));
        assert!(registry.get("azure").is_none());
        assert_eq!(registry.modes(), vec!["gpt-sovits", "openai"]);
    }
}
