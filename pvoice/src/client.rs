//! Speech clients that resolve a strategy per call and drive the transport.

use std::sync::Arc;
use std::time::Duration;

use pprovider::{
    NoProxy, NoopOperationHooks, ProviderError, ProviderOperationHooks, ProxyResolver,
    request_types,
};

use crate::settings::DEFAULT_SPEECH_TIMEOUT;
use crate::strategies::{
    GptSovitsSpeech, JsonBase64Speech, OpenAiSpeech, WhisperCppTranscription,
    WhisperTranscription,
};
use crate::{
    AudioClip, HttpVoiceTransport, RawResponse, SpeechSettings, SpeechStrategy, StrategyRegistry,
    TranscriptionSettings, TranscriptionStrategy, VoiceBody, VoiceRequest, VoiceTransport,
};

struct CallContext<'a> {
    backend: String,
    operation: &'static str,
    category: &'static str,
    hooks: &'a dyn ProviderOperationHooks,
    proxy: &'a dyn ProxyResolver,
    transport: &'a dyn VoiceTransport,
}

impl CallContext<'_> {
    async fn send(
        &self,
        url: String,
        bearer: Option<pprovider::SecretString>,
        body: VoiceBody,
        timeout: Duration,
    ) -> Result<RawResponse, ProviderError> {
        let request = VoiceRequest {
            url,
            bearer,
            body,
            timeout: Some(timeout),
        };

        let response = self
            .transport
            .send(request, self.proxy.proxy_for(Some(self.category)))
            .await
            .map_err(|error| self.explain_timeout(error))?;

        if !response.is_success() {
            let body = response.text();
            let message = pprovider::http::extract_error_message(&body).unwrap_or_else(|| {
                format!("{} responded with status {}", self.backend, response.status)
            });
            return Err(ProviderError::from_status(response.status, body, message));
        }

        Ok(response)
    }

    fn explain_timeout(&self, error: ProviderError) -> ProviderError {
        if !error.is_timeout() {
            return error;
        }

        let hint = match self.category {
            request_types::TTS => "retry with shorter text",
            _ => "retry with a shorter recording",
        };
        ProviderError::timeout(format!("{} timed out ({}); {hint}", self.backend, error.message))
    }

    fn finish<T>(&self, result: Result<T, ProviderError>) -> Result<T, ProviderError> {
        match &result {
            Ok(_) => self.hooks.on_success(&self.backend, self.operation, 1),
            Err(error) => self.hooks.on_failure(&self.backend, self.operation, 1, error),
        }
        result
    }
}

/// Text-to-speech client.
///
/// ```rust
/// use pvoice::SpeechSynthesizer;
///
/// let synthesizer = SpeechSynthesizer::with_http();
/// assert_eq!(synthesizer.modes(), vec!["openai", "gpt-sovits", "json-base64"]);
/// ```
pub struct SpeechSynthesizer {
    strategies: StrategyRegistry<dyn SpeechStrategy>,
    transport: Arc<dyn VoiceTransport>,
    proxy: Arc<dyn ProxyResolver>,
    hooks: Arc<dyn ProviderOperationHooks>,
    timeout: Duration,
}

impl SpeechSynthesizer {
    /// Client with the built-in dialects registered.
    pub fn new(transport: Arc<dyn VoiceTransport>) -> Self {
        let mut synthesizer = Self {
            strategies: StrategyRegistry::new(),
            transport,
            proxy: Arc::new(NoProxy),
            hooks: Arc::new(NoopOperationHooks),
            timeout: DEFAULT_SPEECH_TIMEOUT,
        };
        synthesizer.register(Arc::new(OpenAiSpeech));
        synthesizer.register(Arc::new(GptSovitsSpeech));
        synthesizer.register(Arc::new(JsonBase64Speech));
        synthesizer
    }

    pub fn with_http() -> Self {
        Self::new(Arc::new(HttpVoiceTransport::new()))
    }

    pub fn with_proxy(mut self, proxy: Arc<dyn ProxyResolver>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds or replaces the strategy for its mode.
    pub fn register(&mut self, strategy: Arc<dyn SpeechStrategy>) {
        let mode = strategy.mode();
        self.strategies.insert(mode, strategy);
    }

    pub fn modes(&self) -> Vec<String> {
        self.strategies.modes()
    }

    pub fn strategy(&self, mode: &str) -> Result<Arc<dyn SpeechStrategy>, ProviderError> {
        self.strategies.get(mode).ok_or_else(|| {
            ProviderError::configuration(format!("unknown speech mode '{}'", mode.trim()))
        })
    }

    pub async fn synthesize(
        &self,
        text: &str,
        settings: &SpeechSettings,
    ) -> Result<Vec<u8>, ProviderError> {
        if text.trim().is_empty() {
            return Err(ProviderError::invalid_request("speech text must not be empty"));
        }

        let strategy = self.strategy(&settings.mode)?;
        strategy.validate_settings(settings)?;

        let call = CallContext {
            backend: format!("tts:{}", strategy.mode()),
            operation: "synthesize",
            category: request_types::TTS,
            hooks: self.hooks.as_ref(),
            proxy: self.proxy.as_ref(),
            transport: self.transport.as_ref(),
        };
        self.hooks.on_attempt_start(&call.backend, call.operation, 1);

        let result = async {
            let body = strategy.build_request_body(text, settings)?;
            let response = call
                .send(
                    strategy.endpoint(&settings.base_url),
                    strategy.bearer(settings),
                    body,
                    self.timeout,
                )
                .await?;
            strategy.parse_response(&response)
        }
        .await;

        call.finish(result)
    }
}

/// Speech-to-text client.
pub struct Transcriber {
    strategies: StrategyRegistry<dyn TranscriptionStrategy>,
    transport: Arc<dyn VoiceTransport>,
    proxy: Arc<dyn ProxyResolver>,
    hooks: Arc<dyn ProviderOperationHooks>,
    timeout: Duration,
}

impl Transcriber {
    pub fn new(transport: Arc<dyn VoiceTransport>) -> Self {
        let mut transcriber = Self {
            strategies: StrategyRegistry::new(),
            transport,
            proxy: Arc::new(NoProxy),
            hooks: Arc::new(NoopOperationHooks),
            timeout: DEFAULT_SPEECH_TIMEOUT,
        };
        transcriber.register(Arc::new(WhisperTranscription));
        transcriber.register(Arc::new(WhisperCppTranscription));
        transcriber
    }

    pub fn with_http() -> Self {
        Self::new(Arc::new(HttpVoiceTransport::new()))
    }

    pub fn with_proxy(mut self, proxy: Arc<dyn ProxyResolver>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn register(&mut self, strategy: Arc<dyn TranscriptionStrategy>) {
        let mode = strategy.mode();
        self.strategies.insert(mode, strategy);
    }

    pub fn modes(&self) -> Vec<String> {
        self.strategies.modes()
    }

    pub fn strategy(&self, mode: &str) -> Result<Arc<dyn TranscriptionStrategy>, ProviderError> {
        self.strategies.get(mode).ok_or_else(|| {
            ProviderError::configuration(format!("unknown transcription mode '{}'", mode.trim()))
        })
    }

    pub async fn transcribe(
        &self,
        clip: &AudioClip,
        settings: &TranscriptionSettings,
    ) -> Result<String, ProviderError> {
        if clip.is_empty() {
            return Err(ProviderError::invalid_request("audio clip must not be empty"));
        }

        let strategy = self.strategy(&settings.mode)?;
        strategy.validate_settings(settings)?;

        let call = CallContext {
            backend: format!("asr:{}", strategy.mode()),
            operation: "transcribe",
            category: request_types::ASR,
            hooks: self.hooks.as_ref(),
            proxy: self.proxy.as_ref(),
            transport: self.transport.as_ref(),
        };
        self.hooks.on_attempt_start(&call.backend, call.operation, 1);

        let result = async {
            let body = strategy.build_request_body(clip, settings)?;
            let response = call
                .send(
                    strategy.endpoint(&settings.base_url),
                    strategy.bearer(settings),
                    body,
                    self.timeout,
                )
                .await?;
            strategy.parse_response(&response)
        }
        .await;

        call.finish(result)
    }
}
