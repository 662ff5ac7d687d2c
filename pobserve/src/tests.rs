use std::sync::{Arc, Mutex};
use std::time::Duration;

use pchat::{ChatCore, ChatError, TurnHooks, TurnPhase};
use pcommon::{SessionId, TurnId};
use pplugin::{DispatchHooks, LifecyclePhase, PluginError};
use pprovider::{
    BoxedEventStream, ModelProvider, ModelRequest, ModelResponse, ProviderCapabilities,
    ProviderError, ProviderFuture, ProviderId, ProviderOperationHooks, StopReason,
    TokenUsage,
};

use crate::{
    MetricsObservabilityHooks, SafeDispatchHooks, SafeProviderHooks, SafeTurnHooks,
    TracingObservabilityHooks,
};

fn session() -> SessionId {
    SessionId::from("session-1")
}

fn turn() -> TurnId {
    TurnId::from("turn-1")
}

fn exercise_all_callbacks<H>(hooks: &H)
where
    H: ProviderOperationHooks + DispatchHooks + TurnHooks,
{
    let provider_error = ProviderError::api(503, "overloaded");
    let plugin_error = PluginError::execution("bowl is empty").with_plugin("Feed");
    let chat_error = ChatError::timeout("backend took too long");

    ProviderOperationHooks::on_attempt_start(hooks, "openai", "complete", 1);
    hooks.on_retry_scheduled(
        "openai",
        "complete",
        1,
        Duration::from_millis(10),
        &provider_error,
    );
    ProviderOperationHooks::on_success(hooks, "openai", "complete", 2);
    ProviderOperationHooks::on_failure(hooks, "tts:gpt-sovits", "synthesize", 2, &provider_error);

    hooks.on_hook_failure("Journal", LifecyclePhase::ResponseStart, &plugin_error);
    hooks.on_action_start("Feed", "treat");
    hooks.on_action_success("Feed", Duration::from_millis(5));
    hooks.on_action_failure("Feed", &plugin_error, Duration::from_millis(5));
    hooks.on_unmatched_marker("Dance");

    hooks.on_turn_start(&session(), &turn(), false);
    hooks.on_phase_change(&session(), &turn(), TurnPhase::AwaitingBackend);
    hooks.on_turn_success(&session(), &turn(), 2, Duration::from_millis(30));
    hooks.on_turn_failure(&session(), &turn(), &chat_error, Duration::from_millis(30));
}

#[test]
fn tracing_hooks_smoke_test_all_callbacks() {
    exercise_all_callbacks(&TracingObservabilityHooks);
}

#[test]
fn metrics_hooks_smoke_test_all_callbacks() {
    exercise_all_callbacks(&MetricsObservabilityHooks);
}

#[derive(Default, Clone)]
struct RecordingHooks {
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingHooks {
    fn push(&self, event: &'static str) {
        self.events.lock().expect("events lock").push(event);
    }
}

impl ProviderOperationHooks for RecordingHooks {
    fn on_attempt_start(&self, _backend: &str, _operation: &str, _attempt: u32) {
        self.push("attempt_start");
    }

    fn on_retry_scheduled(
        &self,
        _backend: &str,
        _operation: &str,
        _attempt: u32,
        _delay: Duration,
        _error: &ProviderError,
    ) {
        self.push("retry_scheduled");
    }

    fn on_success(&self, _backend: &str, _operation: &str, _attempts: u32) {
        self.push("success");
    }

    fn on_failure(&self, _backend: &str, _operation: &str, _attempts: u32, _error: &ProviderError) {
        self.push("failure");
    }
}

impl DispatchHooks for RecordingHooks {
    fn on_hook_failure(&self, _plugin: &str, _phase: LifecyclePhase, _error: &PluginError) {
        self.push("hook_failure");
    }

    fn on_action_start(&self, _plugin: &str, _arguments: &str) {
        self.push("action_start");
    }

    fn on_action_success(&self, _plugin: &str, _elapsed: Duration) {
        self.push("action_success");
    }

    fn on_action_failure(&self, _plugin: &str, _error: &PluginError, _elapsed: Duration) {
        self.push("action_failure");
    }

    fn on_unmatched_marker(&self, _name: &str) {
        self.push("unmatched_marker");
    }
}

impl TurnHooks for RecordingHooks {
    fn on_turn_start(&self, _session: &SessionId, _turn: &TurnId, _continuation: bool) {
        self.push("turn_start");
    }

    fn on_phase_change(&self, _session: &SessionId, _turn: &TurnId, _phase: TurnPhase) {
        self.push("phase_change");
    }

    fn on_turn_success(
        &self,
        _session: &SessionId,
        _turn: &TurnId,
        _rounds: u32,
        _elapsed: Duration,
    ) {
        self.push("turn_success");
    }

    fn on_turn_failure(
        &self,
        _session: &SessionId,
        _turn: &TurnId,
        _error: &ChatError,
        _elapsed: Duration,
    ) {
        self.push("turn_failure");
    }
}

struct PanicHooks;

impl ProviderOperationHooks for PanicHooks {
    fn on_attempt_start(&self, _backend: &str, _operation: &str, _attempt: u32) {
        panic!("attempt_start panic");
    }

    fn on_failure(&self, _backend: &str, _operation: &str, _attempts: u32, _error: &ProviderError) {
        panic!("failure panic");
    }
}

impl DispatchHooks for PanicHooks {
    fn on_action_start(&self, _plugin: &str, _arguments: &str) {
        panic!("action_start panic");
    }

    fn on_unmatched_marker(&self, _name: &str) {
        panic!("unmatched_marker panic");
    }
}

impl TurnHooks for PanicHooks {
    fn on_turn_start(&self, _session: &SessionId, _turn: &TurnId, _continuation: bool) {
        panic!("turn_start panic");
    }

    fn on_phase_change(&self, _session: &SessionId, _turn: &TurnId, _phase: TurnPhase) {
        panic!("phase_change panic");
    }

    fn on_turn_success(
        &self,
        _session: &SessionId,
        _turn: &TurnId,
        _rounds: u32,
        _elapsed: Duration,
    ) {
        panic!("turn_success panic");
    }
}

#[test]
fn safe_wrappers_delegate_when_inner_succeeds() {
    let inner = RecordingHooks::default();
    let events = Arc::clone(&inner.events);

    let provider = SafeProviderHooks::new(inner.clone());
    provider.on_attempt_start("openai", "complete", 1);
    provider.on_failure(
        "openai",
        "complete",
        1,
        &ProviderError::timeout("backend timeout"),
    );

    let dispatch = SafeDispatchHooks::new(inner.clone());
    dispatch.on_action_start("Feed", "treat");
    dispatch.on_action_success("Feed", Duration::from_millis(1));
    dispatch.on_unmatched_marker("Dance");

    let turns = SafeTurnHooks::new(inner);
    turns.on_turn_start(&session(), &turn(), true);
    turns.on_turn_success(&session(), &turn(), 1, Duration::from_millis(1));

    assert_eq!(
        *events.lock().expect("events lock"),
        vec![
            "attempt_start",
            "failure",
            "action_start",
            "action_success",
            "unmatched_marker",
            "turn_start",
            "turn_success",
        ]
    );
}

#[test]
fn safe_wrappers_swallow_panics() {
    let provider = SafeProviderHooks::new(PanicHooks);
    provider.on_attempt_start("openai", "complete", 1);
    provider.on_failure(
        "openai",
        "complete",
        1,
        &ProviderError::timeout("backend timeout"),
    );

    let dispatch = SafeDispatchHooks::new(PanicHooks);
    dispatch.on_action_start("Feed", "treat");
    dispatch.on_unmatched_marker("Dance");

    let turns = SafeTurnHooks::new(PanicHooks);
    turns.on_turn_start(&session(), &turn(), false);
    turns.on_phase_change(&session(), &turn(), TurnPhase::Finalizing);
}

struct MeowProvider;

impl ModelProvider for MeowProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Ollama
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::default()
    }

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
        Box::pin(async move {
            Ok(ModelResponse {
                provider: ProviderId::Ollama,
                model: request.model,
                text: "meow [Dance:twirl]".to_string(),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        })
    }

    fn stream<'a>(
        &'a self,
        _request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move { Err(ProviderError::capability("streaming is not supported")) })
    }
}

#[tokio::test]
async fn panicking_observers_do_not_break_a_chat_turn() {
    let core = ChatCore::builder(Arc::new(MeowProvider))
        .hooks(Arc::new(SafeTurnHooks::new(PanicHooks)))
        .dispatch_hooks(Arc::new(SafeDispatchHooks::new(PanicHooks)))
        .build();

    let result = core.chat("hello").await.expect("turn completes");
    assert_eq!(result.text, "meow [Dance:twirl]");
    assert_eq!(core.turn_phase(), TurnPhase::Idle);
}
