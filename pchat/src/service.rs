//! Turn orchestration over one bound backend and one plugin registry.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use futures_timer::Delay;
use futures_util::StreamExt;
use futures_util::future::{Either, select};
use pcommon::SessionId;
use pplugin::{
    ActionResolution, ChannelModeDefinition, DEFAULT_ACTION_TIMEOUT, DispatchHooks, FailureSource,
    Plugin, PluginDispatcher, PluginRegistry, ProcessingContext, ProcessingFailure,
};
use pprovider::{
    ImagePayload, Message, ModelProvider, ModelRequest, ModelResponse, NoProxy, ProxyResolver,
    ProxySettings, Role, StopReason, StreamEvent, TokenUsage,
};
use tokio_util::sync::CancellationToken;

use crate::history::estimate_tokens;
use crate::{
    ChatError, ChatErrorKind, ChatErrorPhase, ChatHistory, ChatPolicy, ChatTurnResult,
    HistoryPersistence, HistorySnapshot, NoopTurnHooks, Record, RecordStore, ResponseEvent,
    ResponseHandler, TurnHooks, TurnPhase,
};

pub const DEFAULT_SESSION: &str = "default";

#[derive(Debug, Default)]
struct CoreState {
    history: ChatHistory,
    records: RecordStore,
    phase: TurnPhase,
    usage: TokenUsage,
    open_turn: Option<OpenTurn>,
}

/// The last user-initiated turn. Function-call continuations run inside it
/// until the next user turn starts.
#[derive(Debug)]
struct OpenTurn {
    context: ProcessingContext,
    record: Option<usize>,
}

/// Owns one conversation. Methods take `&self` so the core can be shared
/// behind an `Arc`; user turns are serialized internally.
pub struct ChatCore {
    provider: Arc<dyn ModelProvider>,
    provider_name: String,
    plugins: Arc<PluginRegistry>,
    dispatcher: PluginDispatcher,
    proxy: Arc<dyn ProxyResolver>,
    persistence: Option<Arc<dyn HistoryPersistence>>,
    session: SessionId,
    policy: ChatPolicy,
    hooks: Arc<dyn TurnHooks>,
    state: Mutex<CoreState>,
    response_handler: RwLock<Option<ResponseHandler>>,
    turn_gate: tokio::sync::Mutex<()>,
}

impl ChatCore {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self::builder(provider).build()
    }

    pub fn builder(provider: Arc<dyn ModelProvider>) -> ChatCoreBuilder {
        ChatCoreBuilder::new(provider)
    }

    pub async fn chat(&self, prompt: &str) -> Result<ChatTurnResult, ChatError> {
        self.chat_with(prompt, false).await
    }

    /// With `function_call` set, `prompt` is a function result fed back to the
    /// backend: it is sent as a `function` message and start hooks are skipped.
    /// The continuation belongs to the last user turn, so hooks see that turn's
    /// context and its record is extended instead of a new one being written.
    pub async fn chat_with(
        &self,
        prompt: &str,
        function_call: bool,
    ) -> Result<ChatTurnResult, ChatError> {
        self.run_turn(prompt, None, function_call, None).await
    }

    /// Fails with a capability error, before any backend call, when the bound
    /// backend does not accept images.
    pub async fn chat_with_image(
        &self,
        prompt: &str,
        image: Vec<u8>,
    ) -> Result<ChatTurnResult, ChatError> {
        self.run_turn(prompt, Some(ImagePayload::from_bytes(image)), false, None)
            .await
    }

    /// Cancelling `cancel` drops the in-flight backend call or action and fails
    /// the turn with `Cancelled`. Only the error hooks run afterwards.
    pub async fn chat_cancellable(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<ChatTurnResult, ChatError> {
        self.run_turn(prompt, None, false, Some(cancel)).await
    }

    /// Drops in-memory history; records are kept.
    pub fn clear_context(&self) {
        self.lock_state().history.clear();
    }

    pub fn history_for_editing(&self) -> Vec<Message> {
        self.lock_state().history.to_vec()
    }

    pub fn update_history(&self, edited: Vec<Message>) {
        self.lock_state().history.replace(edited);
    }

    pub fn chat_history(&self) -> Vec<Message> {
        self.lock_state().history.to_vec()
    }

    pub fn set_chat_history(&self, history: Vec<Message>) {
        self.lock_state().history.replace(history);
    }

    pub fn current_token_count(&self) -> usize {
        self.lock_state().history.token_count()
    }

    pub fn add_plugin(&self, plugin: Plugin) -> Result<(), ChatError> {
        self.plugins.add(plugin)?;
        Ok(())
    }

    pub fn remove_plugin(&self, name: &str) -> bool {
        self.plugins.remove(name).is_some()
    }

    pub fn plugins(&self) -> Arc<PluginRegistry> {
        Arc::clone(&self.plugins)
    }

    pub fn custom_modes(&self) -> Vec<ChannelModeDefinition> {
        self.dispatcher.custom_modes()
    }

    pub fn proxy(&self, category: Option<&str>) -> Option<ProxySettings> {
        self.proxy.proxy_for(category)
    }

    pub fn set_response_handler<F>(&self, handler: F)
    where
        F: Fn(ResponseEvent) + Send + Sync + 'static,
    {
        *self
            .response_handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
    }

    pub fn clear_response_handler(&self) {
        *self
            .response_handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn turn_phase(&self) -> TurnPhase {
        self.lock_state().phase
    }

    pub fn records(&self) -> Vec<Record> {
        self.lock_state().records.records().to_vec()
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// Cumulative usage reported by the backend across all turns.
    pub fn usage(&self) -> TokenUsage {
        self.lock_state().usage
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn policy(&self) -> &ChatPolicy {
        &self.policy
    }

    pub async fn save_history(&self) -> Result<(), ChatError> {
        let persistence = self.persistence()?;
        let snapshot = {
            let state = self.lock_state();
            HistorySnapshot {
                messages: state.history.to_vec(),
                records: state.records.records().to_vec(),
            }
        };

        persistence
            .save_snapshot(&self.session, snapshot)
            .await
            .map_err(|error| error.with_phase(ChatErrorPhase::Storage))
    }

    /// Replaces history and records with the saved snapshot. Returns `false`
    /// and leaves state untouched when nothing was saved for this session.
    pub async fn load_history(&self) -> Result<bool, ChatError> {
        let persistence = self.persistence()?;
        let snapshot = persistence
            .load_snapshot(&self.session)
            .await
            .map_err(|error| error.with_phase(ChatErrorPhase::Storage))?;

        let Some(snapshot) = snapshot else {
            return Ok(false);
        };

        let mut state = self.lock_state();
        state.history.replace(snapshot.messages);
        state.records.restore(snapshot.records);
        state.open_turn = None;
        Ok(true)
    }

    async fn run_turn(
        &self,
        prompt: &str,
        image: Option<ImagePayload>,
        continuation: bool,
        cancel: Option<&CancellationToken>,
    ) -> Result<ChatTurnResult, ChatError> {
        if prompt.trim().is_empty() {
            return Err(ChatError::invalid_request("prompt must not be empty")
                .with_phase(ChatErrorPhase::Request));
        }

        if image.is_some() && !self.provider.capabilities().images {
            return Err(ChatError::capability(format!(
                "backend '{}' does not accept images",
                self.provider_name
            ))
            .with_phase(ChatErrorPhase::Request)
            .with_backend(self.provider_name.clone()));
        }

        let _turn = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    return Err(ChatError::cancelled("turn cancelled before it started")
                        .with_phase(ChatErrorPhase::Request));
                }
                guard = self.turn_gate.lock() => guard,
            },
            None => self.turn_gate.lock().await,
        };
        let started = Instant::now();

        let open = if continuation {
            self.lock_state().open_turn.take()
        } else {
            None
        };
        let OpenTurn {
            mut context,
            mut record,
        } = open.unwrap_or_else(|| {
            let context = if continuation {
                ProcessingContext::continuation(prompt)
            } else {
                ProcessingContext::new(prompt)
            };
            OpenTurn {
                context: context.with_metadata("session", self.session.as_str()),
                record: None,
            }
        });

        self.hooks
            .on_turn_start(&self.session, context.turn_id(), continuation);

        let role = if continuation { Role::Function } else { Role::User };
        let mut first = Message::new(role, prompt);
        if let Some(image) = image {
            first = first.with_image(image);
        }

        let outcome = match ensure_live(cancel) {
            Ok(()) => {
                if !continuation {
                    self.dispatcher.processing_start(&mut context).await;
                }
                self.drive_turn(&context, first, continuation, &mut record, cancel)
                    .await
            }
            Err(error) => Err(error.with_phase(ChatErrorPhase::Lifecycle)),
        };

        let outcome = match outcome {
            Ok(result) => {
                self.hooks.on_turn_success(
                    &self.session,
                    context.turn_id(),
                    result.rounds,
                    started.elapsed(),
                );
                Ok(result)
            }
            Err(error) => {
                self.fail(&context, &error).await;
                self.hooks.on_turn_failure(
                    &self.session,
                    context.turn_id(),
                    &error,
                    started.elapsed(),
                );
                Err(error)
            }
        };

        self.lock_state().open_turn = Some(OpenTurn { context, record });
        outcome
    }

    async fn drive_turn(
        &self,
        context: &ProcessingContext,
        first: Message,
        continuation: bool,
        record: &mut Option<usize>,
        cancel: Option<&CancellationToken>,
    ) -> Result<ChatTurnResult, ChatError> {
        // Backend entry happens once per user turn; continuations resume
        // action resolution.
        let entry = if continuation {
            TurnPhase::ActionResolution
        } else {
            TurnPhase::AwaitingBackend
        };
        self.set_phase(context, entry);

        let mut pending = vec![first];
        let mut texts = Vec::new();
        let mut actions = Vec::new();
        let mut usage = TokenUsage::default();
        let mut rounds = 0_u32;

        loop {
            let request = self.compose_request(&pending)?;
            rounds += 1;

            let response = self.call_backend(request, cancel).await?;
            usage.accumulate(response.usage);
            self.commit_round(std::mem::take(&mut pending), &response);

            ensure_live(cancel).map_err(|error| error.with_phase(ChatErrorPhase::Lifecycle))?;
            self.dispatcher.response_start(context, &response.text).await;

            ensure_live(cancel)
                .map_err(|error| error.with_phase(ChatErrorPhase::ActionResolution))?;
            self.set_phase(context, TurnPhase::ActionResolution);
            let resolution = self.resolve_actions(context, &response.text, cancel).await?;
            self.emit(ResponseEvent::Complete(resolution.text.clone()));
            texts.push(resolution.text.clone());

            pending = resolution
                .follow_ups()
                .map(|(plugin, result)| Message::new(Role::Function, format!("{plugin}: {result}")))
                .collect();
            actions.extend(resolution.outcomes);

            if pending.is_empty() {
                break;
            }

            if rounds > self.policy.max_action_rounds {
                return Err(ChatError::loop_bound(format!(
                    "action follow-ups exceeded {} rounds",
                    self.policy.max_action_rounds
                ))
                .with_phase(ChatErrorPhase::ActionResolution)
                .with_backend(self.provider_name.clone()));
            }
        }

        ensure_live(cancel).map_err(|error| error.with_phase(ChatErrorPhase::Finalizing))?;
        self.set_phase(context, TurnPhase::Finalizing);
        let text = texts.join("\n");
        {
            let mut state = self.lock_state();
            let extended = record.is_some_and(|index| state.records.extend_response(index, &text));
            if !extended {
                *record = Some(state.records.len());
                state.records.append(Record::new(
                    context.user_input(),
                    text.clone(),
                    self.provider_name.clone(),
                ));
            }
        }

        self.dispatcher.processing_complete(context, &text).await;
        self.set_phase(context, TurnPhase::Idle);

        Ok(ChatTurnResult {
            turn_id: context.turn_id().clone(),
            text,
            rounds,
            usage,
            actions,
        })
    }

    /// A cancel that lands while an action runs drops the action and wins even
    /// when the action finishes in the same poll.
    async fn resolve_actions(
        &self,
        context: &ProcessingContext,
        text: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<ActionResolution, ChatError> {
        let resolution = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => None,
                resolution = self.dispatcher.resolve_actions(context, text) => Some(resolution),
            },
            None => Some(self.dispatcher.resolve_actions(context, text).await),
        };

        match resolution {
            Some(resolution) => {
                ensure_live(cancel)
                    .map_err(|error| error.with_phase(ChatErrorPhase::ActionResolution))?;
                Ok(resolution)
            }
            None => Err(ChatError::cancelled("turn cancelled during action resolution")
                .with_phase(ChatErrorPhase::ActionResolution)),
        }
    }

    fn compose_request(&self, pending: &[Message]) -> Result<ModelRequest, ChatError> {
        let system = self.system_context();
        let system_tokens = system.as_ref().map(estimate_tokens).unwrap_or_default();
        let budget = self.policy.history_token_budget.saturating_sub(system_tokens);
        let window = self.lock_state().history.request_window(pending, budget);

        let mut messages = Vec::with_capacity(window.len() + 1);
        messages.extend(system);
        messages.extend(window);

        let mut builder = ModelRequest::builder(self.policy.model.clone())
            .messages(messages)
            .streaming(self.streams())
            .metadata("session", self.session.as_str());
        if let Some(temperature) = self.policy.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = self.policy.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }

        builder.build().map_err(|error| {
            ChatError::from(error)
                .with_phase(ChatErrorPhase::Request)
                .with_backend(self.provider_name.clone())
        })
    }

    /// System prompt followed by dynamic plugin info.
    fn system_context(&self) -> Option<Message> {
        let parts = self
            .policy
            .system_prompt
            .iter()
            .map(|prompt| prompt.trim().to_string())
            .chain(self.dispatcher.dynamic_info())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>();

        (!parts.is_empty()).then(|| Message::new(Role::System, parts.join("\n\n")))
    }

    fn streams(&self) -> bool {
        self.policy.stream && self.provider.capabilities().streaming
    }

    async fn call_backend(
        &self,
        request: ModelRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<ModelResponse, ChatError> {
        let timeout = self.policy.request_timeout;
        let exchange = async {
            let call = Box::pin(self.exchange(request));
            let deadline = Box::pin(Delay::new(timeout));
            match select(call, deadline).await {
                Either::Left((result, _)) => result,
                Either::Right(_) => Err(ChatError::timeout(format!(
                    "backend did not answer within {timeout:?}"
                ))),
            }
        };

        let result = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(ChatError::cancelled(
                    "turn cancelled while awaiting the backend",
                )),
                result = exchange => result,
            },
            None => exchange.await,
        };

        result.map_err(|error| {
            error
                .with_phase(ChatErrorPhase::Backend)
                .with_backend(self.provider_name.clone())
        })
    }

    async fn exchange(&self, request: ModelRequest) -> Result<ModelResponse, ChatError> {
        if !request.stream {
            return Ok(self.provider.complete(request).await?);
        }

        let model = request.model.clone();
        let mut stream = self.provider.stream(request).await?;
        let mut text = String::new();
        let mut complete = None;

        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::TextDelta(delta) => {
                    text.push_str(&delta);
                    self.emit(ResponseEvent::Delta(delta));
                }
                StreamEvent::ResponseComplete(response) => complete = Some(response),
            }
        }

        Ok(match complete {
            Some(mut response) => {
                if response.text.is_empty() {
                    response.text = text;
                }
                response
            }
            None => ModelResponse {
                provider: self.provider.id(),
                model,
                text,
                stop_reason: StopReason::Other,
                usage: TokenUsage::default(),
            },
        })
    }

    /// History only grows after a successful backend call. The raw backend
    /// text is kept so later requests still show the marker syntax.
    fn commit_round(&self, sent: Vec<Message>, response: &ModelResponse) {
        let mut state = self.lock_state();
        state.history.extend(sent);
        state
            .history
            .push(Message::new(Role::Assistant, response.text.clone()));
        state.usage.accumulate(response.usage);
    }

    async fn fail(&self, context: &ProcessingContext, error: &ChatError) {
        self.set_phase(context, TurnPhase::Error);

        let source = match (error.kind, error.phase) {
            (ChatErrorKind::Cancelled, _) => FailureSource::Core,
            (_, Some(ChatErrorPhase::Backend | ChatErrorPhase::Request)) => {
                FailureSource::Backend(self.provider_name.clone())
            }
            _ => FailureSource::Core,
        };
        let phase = error.phase.map(ChatErrorPhase::as_str).unwrap_or("turn");
        let failure = ProcessingFailure::new(source, phase, error.message.clone());

        self.dispatcher.processing_error(context, &failure).await;
    }

    fn set_phase(&self, context: &ProcessingContext, phase: TurnPhase) {
        let changed = {
            let mut state = self.lock_state();
            let changed = state.phase != phase;
            state.phase = phase;
            changed
        };

        if changed {
            self.hooks
                .on_phase_change(&self.session, context.turn_id(), phase);
        }
    }

    fn emit(&self, event: ResponseEvent) {
        let handler = self
            .response_handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handler) = handler {
            handler(event);
        }
    }

    fn persistence(&self) -> Result<Arc<dyn HistoryPersistence>, ChatError> {
        self.persistence.clone().ok_or_else(|| {
            ChatError::configuration("no history persistence is configured")
                .with_phase(ChatErrorPhase::Storage)
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, CoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn ensure_live(cancel: Option<&CancellationToken>) -> Result<(), ChatError> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(ChatError::cancelled("turn cancelled")),
        _ => Ok(()),
    }
}

pub struct ChatCoreBuilder {
    provider: Arc<dyn ModelProvider>,
    provider_name: Option<String>,
    plugins: Option<Arc<PluginRegistry>>,
    dispatch_hooks: Option<Arc<dyn DispatchHooks>>,
    action_timeout: Duration,
    proxy: Arc<dyn ProxyResolver>,
    persistence: Option<Arc<dyn HistoryPersistence>>,
    session: SessionId,
    policy: ChatPolicy,
    hooks: Arc<dyn TurnHooks>,
    history: Vec<Message>,
}

impl ChatCoreBuilder {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            provider_name: None,
            plugins: None,
            dispatch_hooks: None,
            action_timeout: DEFAULT_ACTION_TIMEOUT,
            proxy: Arc::new(NoProxy),
            persistence: None,
            session: SessionId::new(DEFAULT_SESSION),
            policy: ChatPolicy::default(),
            hooks: Arc::new(NoopTurnHooks),
            history: Vec::new(),
        }
    }

    /// Defaults to the provider id.
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// Shares an existing registry, e.g. across a provider swap.
    pub fn plugins(mut self, plugins: Arc<PluginRegistry>) -> Self {
        self.plugins = Some(plugins);
        self
    }

    pub fn dispatch_hooks(mut self, hooks: Arc<dyn DispatchHooks>) -> Self {
        self.dispatch_hooks = Some(hooks);
        self
    }

    pub fn action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    pub fn proxy<P>(self, proxy: P) -> Self
    where
        P: ProxyResolver + 'static,
    {
        self.proxy_arc(Arc::new(proxy))
    }

    pub fn proxy_arc(mut self, proxy: Arc<dyn ProxyResolver>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn persistence(mut self, persistence: Arc<dyn HistoryPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn session(mut self, session: impl Into<SessionId>) -> Self {
        self.session = session.into();
        self
    }

    pub fn policy(mut self, policy: ChatPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn TurnHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn build(self) -> ChatCore {
        let provider_name = self
            .provider_name
            .unwrap_or_else(|| self.provider.id().to_string());
        let plugins = self.plugins.unwrap_or_default();

        let mut dispatcher =
            PluginDispatcher::new(Arc::clone(&plugins)).with_action_timeout(self.action_timeout);
        if let Some(hooks) = self.dispatch_hooks {
            dispatcher = dispatcher.with_hooks(hooks);
        }

        ChatCore {
            provider: self.provider,
            provider_name,
            plugins,
            dispatcher,
            proxy: self.proxy,
            persistence: self.persistence,
            session: self.session,
            policy: self.policy,
            hooks: self.hooks,
            state: Mutex::new(CoreState {
                history: ChatHistory::from_messages(self.history),
                ..CoreState::default()
            }),
            response_handler: RwLock::new(None),
            turn_gate: tokio::sync::Mutex::new(()),
        }
    }
}
