//! Runtime wiring helpers for chat, persistence, and voice.

use std::sync::Arc;

use pmemory::{HistoryBackendConfig, create_history_backend};
use pobserve::{SafeDispatchHooks, SafeProviderHooks, SafeTurnHooks, TracingObservabilityHooks};

use crate::{
    ChatCore, ChatCoreBuilder, ChatPolicy, HistoryPersistence, InMemoryHistoryPersistence,
    MemoryError, ModelProvider, NoProxy, PluginRegistry, ProxyResolver, SessionId,
    SpeechSynthesizer, Transcriber,
};

pub fn chat_core(provider: Arc<dyn ModelProvider>) -> ChatCore {
    ChatCore::builder(provider).build()
}

pub fn chat_core_with_persistence(
    provider: Arc<dyn ModelProvider>,
    persistence: Arc<dyn HistoryPersistence>,
) -> ChatCore {
    ChatCore::builder(provider).persistence(persistence).build()
}

pub fn in_memory_persistence() -> Arc<dyn HistoryPersistence> {
    Arc::new(InMemoryHistoryPersistence::new())
}

/// Builder with panic-safe tracing hooks on turns and plugin dispatch.
pub fn observed_chat_core(provider: Arc<dyn ModelProvider>) -> ChatCoreBuilder {
    ChatCore::builder(provider)
        .hooks(Arc::new(SafeTurnHooks::new(TracingObservabilityHooks)))
        .dispatch_hooks(Arc::new(SafeDispatchHooks::new(TracingObservabilityHooks)))
}

pub struct RuntimeOptions {
    pub session: SessionId,
    pub policy: ChatPolicy,
    pub history: HistoryBackendConfig,
    pub proxy: Arc<dyn ProxyResolver>,
    pub plugins: Arc<PluginRegistry>,
    /// Route turn, dispatch, and voice events through `tracing`.
    pub observe: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            session: SessionId::new(pchat::DEFAULT_SESSION),
            policy: ChatPolicy::default(),
            history: HistoryBackendConfig::InMemory,
            proxy: Arc::new(NoProxy),
            plugins: Arc::new(PluginRegistry::new()),
            observe: true,
        }
    }
}

/// Everything a pet frontend needs: the chat core plus voice clients that
/// share its proxy resolver.
pub struct PetRuntime {
    pub chat: Arc<ChatCore>,
    pub persistence: Arc<dyn HistoryPersistence>,
    pub speech: Arc<SpeechSynthesizer>,
    pub transcriber: Arc<Transcriber>,
    pub plugins: Arc<PluginRegistry>,
}

pub fn build_runtime(provider: Arc<dyn ModelProvider>) -> Result<PetRuntime, MemoryError> {
    build_runtime_with(provider, RuntimeOptions::default())
}

pub fn build_runtime_with(
    provider: Arc<dyn ModelProvider>,
    options: RuntimeOptions,
) -> Result<PetRuntime, MemoryError> {
    let persistence = create_history_backend(options.history)?;

    let mut builder = if options.observe {
        observed_chat_core(provider)
    } else {
        ChatCore::builder(provider)
    };
    builder = builder
        .session(options.session)
        .policy(options.policy)
        .plugins(Arc::clone(&options.plugins))
        .proxy_arc(Arc::clone(&options.proxy))
        .persistence(Arc::clone(&persistence));

    let mut speech = SpeechSynthesizer::with_http().with_proxy(Arc::clone(&options.proxy));
    let mut transcriber = Transcriber::with_http().with_proxy(options.proxy);
    if options.observe {
        speech = speech.with_hooks(Arc::new(SafeProviderHooks::new(TracingObservabilityHooks)));
        transcriber =
            transcriber.with_hooks(Arc::new(SafeProviderHooks::new(TracingObservabilityHooks)));
    }

    Ok(PetRuntime {
        chat: Arc::new(builder.build()),
        persistence,
        speech: Arc::new(speech),
        transcriber: Arc::new(transcriber),
        plugins: options.plugins,
    })
}
