use std::sync::{Arc, Mutex};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pcommon::BoxFuture;
use pprovider::{
    ProviderError, ProviderErrorKind, ProxyConfig, ProxyProtocol, ProxySettings,
};
use pvoice::strategies::{GptSovitsSpeech, JsonBase64Speech, OpenAiSpeech};
use pvoice::{
    AudioClip, RawResponse, SpeechSettings, SpeechStrategy, SpeechSynthesizer, Transcriber,
    TranscriptionSettings, VoiceBody, VoiceRequest, VoiceTransport,
};

const CANONICAL_AUDIO: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt \x10\x00\x00\x00\x01\x00";

#[derive(Default)]
struct FakeTransport {
    responses: Mutex<Vec<Result<RawResponse, ProviderError>>>,
    requests: Mutex<Vec<(VoiceRequest, Option<ProxySettings>)>>,
}

impl FakeTransport {
    fn replying(response: Result<RawResponse, ProviderError>) -> Arc<Self> {
        let transport = Self::default();
        transport
            .responses
            .lock()
            .expect("responses lock")
            .push(response);
        Arc::new(transport)
    }

    fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    fn last_request(&self) -> (VoiceRequest, Option<ProxySettings>) {
        self.requests
            .lock()
            .expect("requests lock")
            .last()
            .cloned()
            .expect("a request should be sent")
    }
}

impl VoiceTransport for FakeTransport {
    fn send<'a>(
        &'a self,
        request: VoiceRequest,
        proxy: Option<ProxySettings>,
    ) -> BoxFuture<'a, Result<RawResponse, ProviderError>> {
        Box::pin(async move {
            self.requests
                .lock()
                .expect("requests lock")
                .push((request, proxy));
            self.responses
                .lock()
                .expect("responses lock")
                .pop()
                .unwrap_or_else(|| Err(ProviderError::other("no canned response")))
        })
    }
}

#[test]
fn every_speech_dialect_recovers_the_same_audio_from_its_envelope() {
    let encoded = STANDARD.encode(CANONICAL_AUDIO);
    let cases: Vec<(Box<dyn SpeechStrategy>, RawResponse)> = vec![
        (
            Box::new(OpenAiSpeech),
            RawResponse::ok("audio/mpeg", CANONICAL_AUDIO.to_vec()),
        ),
        (
            Box::new(GptSovitsSpeech),
            RawResponse::ok("audio/wav", CANONICAL_AUDIO.to_vec()),
        ),
        (
            Box::new(JsonBase64Speech),
            RawResponse::ok("application/json", format!(r#"{{"audio":"{encoded}"}}"#)),
        ),
        (
            Box::new(JsonBase64Speech),
            RawResponse::ok(
                "application/json",
                format!(r#"{{"code":0,"data":{{"audio":"{encoded}"}}}}"#),
            ),
        ),
        (
            Box::new(JsonBase64Speech),
            RawResponse::ok("text/plain", format!(r#"{{"data":"{encoded}"}}"#)),
        ),
        (
            Box::new(JsonBase64Speech),
            RawResponse::ok("audio/wav", CANONICAL_AUDIO.to_vec()),
        ),
    ];

    for (strategy, response) in cases {
        let audio = strategy
            .parse_response(&response)
            .unwrap_or_else(|err| panic!("{} failed: {err}", strategy.mode()));
        assert_eq!(audio, CANONICAL_AUDIO, "{}", strategy.mode());
    }
}

#[tokio::test]
async fn missing_api_key_fails_without_network_calls() {
    let transport = Arc::new(FakeTransport::default());
    let synthesizer = SpeechSynthesizer::new(transport.clone());
    let transcriber = Transcriber::new(transport.clone());

    let speech_error = synthesizer
        .synthesize("hello", &SpeechSettings::new("openai", ""))
        .await
        .expect_err("openai speech needs a key");
    assert_eq!(speech_error.kind, ProviderErrorKind::Configuration);

    let blank_key = TranscriptionSettings::new("whisper", "").with_api_key("  ");
    let asr_error = transcriber
        .transcribe(&AudioClip::wav(CANONICAL_AUDIO.to_vec()), &blank_key)
        .await
        .expect_err("whisper needs a key");
    assert_eq!(asr_error.kind, ProviderErrorKind::Configuration);

    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn unknown_mode_is_a_configuration_error() {
    let transport = Arc::new(FakeTransport::default());
    let synthesizer = SpeechSynthesizer::new(transport.clone());

    let error = synthesizer
        .synthesize("hello", &SpeechSettings::new("azure", "https://x"))
        .await
        .expect_err("azure is not registered");
    assert_eq!(error.kind, ProviderErrorKind::Configuration);
    assert!(error.message.contains("azure"));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn synthesis_uses_tts_proxy_and_bearer_key() {
    let transport = FakeTransport::replying(Ok(RawResponse::ok(
        "audio/mpeg",
        CANONICAL_AUDIO.to_vec(),
    )));
    let proxy = ProxyConfig::explicit(ProxyProtocol::Socks5, "127.0.0.1:1080").only_for(&["tts"]);
    let synthesizer = SpeechSynthesizer::new(transport.clone()).with_proxy(Arc::new(proxy));
    let settings = SpeechSettings::new("OpenAI", "https://api.openai.com")
        .with_api_key("sk-voice")
        .with_voice("nova");

    let audio = synthesizer
        .synthesize("Good morning!", &settings)
        .await
        .expect("synthesis should succeed");
    assert_eq!(audio, CANONICAL_AUDIO);

    let (request, proxy) = transport.last_request();
    assert_eq!(request.url, "https://api.openai.com/v1/audio/speech");
    assert_eq!(
        request.bearer.as_ref().map(|key| key.expose()),
        Some("sk-voice")
    );
    assert_eq!(
        proxy,
        Some(ProxySettings::Explicit {
            url: "socks5://127.0.0.1:1080".to_string()
        })
    );
    match request.body {
        VoiceBody::Json(body) => assert_eq!(body["voice"], "nova"),
        other => panic!("unexpected body: {other:?}"),
    }
}

#[tokio::test]
async fn unsuccessful_status_keeps_status_and_body() {
    let transport = FakeTransport::replying(Ok(RawResponse {
        status: 500,
        content_type: Some("application/json".into()),
        body: br#"{"message":"CUDA out of memory"}"#.to_vec(),
    }));
    let synthesizer = SpeechSynthesizer::new(transport.clone());
    let settings = SpeechSettings::new("gpt-sovits", "http://127.0.0.1:9880")
        .with_reference_audio("ref.wav");

    let error = synthesizer
        .synthesize("hello", &settings)
        .await
        .expect_err("server error");
    assert_eq!(error.kind, ProviderErrorKind::Api);
    assert_eq!(error.status, Some(500));
    assert_eq!(error.message, "CUDA out of memory");
    assert!(error.body.as_deref().is_some_and(|body| body.contains("CUDA")));

    let (request, proxy) = transport.last_request();
    assert!(request.bearer.is_none());
    assert_eq!(proxy, None);
}

#[tokio::test]
async fn transport_timeouts_suggest_shorter_input() {
    let transport = FakeTransport::replying(Err(ProviderError::timeout("operation timed out")));
    let transcriber = Transcriber::new(transport);
    let settings = TranscriptionSettings::new("whisper-cpp", "http://127.0.0.1:8080");

    let error = transcriber
        .transcribe(&AudioClip::wav(CANONICAL_AUDIO.to_vec()), &settings)
        .await
        .expect_err("timeout");
    assert_eq!(error.kind, ProviderErrorKind::Timeout);
    assert!(error.message.contains("asr:whisper-cpp"));
    assert!(error.message.contains("shorter"));
}

#[tokio::test]
async fn transcription_sends_multipart_to_local_server() {
    let transport = FakeTransport::replying(Ok(RawResponse::ok(
        "application/json",
        br#"{"text":"  feed the cat  "}"#.to_vec(),
    )));
    let transcriber = Transcriber::new(transport.clone());
    let settings =
        TranscriptionSettings::new("whisper-cpp", "http://127.0.0.1:8080").with_language("en");

    let text = transcriber
        .transcribe(&AudioClip::wav(CANONICAL_AUDIO.to_vec()), &settings)
        .await
        .expect("transcription should succeed");
    assert_eq!(text, "feed the cat");

    let (request, _) = transport.last_request();
    assert_eq!(request.url, "http://127.0.0.1:8080/inference");
    match request.body {
        VoiceBody::Multipart(form) => {
            assert_eq!(form.field("language"), Some("en"));
            assert_eq!(
                form.file.expect("file part").data,
                CANONICAL_AUDIO.to_vec()
            );
        }
        other => panic!("unexpected body: {other:?}"),
    }
}
