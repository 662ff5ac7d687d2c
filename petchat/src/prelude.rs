//! Common imports for most petchat frontends.

pub use crate::{
    assistant_message, build_provider_from_api_key, build_provider_with_config, build_runtime,
    build_runtime_with, chat_core, chat_core_with_persistence, function_message,
    in_memory_persistence, init_tracing, observed_chat_core, parse_provider_id, persona_policy,
    system_message, user_message,
};
pub use crate::{pet_messages, pet_msg};
pub use crate::{
    CancellationToken, ChatCore, ChatError, ChatErrorKind, ChatPolicy, ChatTurnResult,
    FunctionAction, HistoryBackendConfig, HistoryPersistence, ImagePayload, LifecyclePlugin,
    Message, ModelProvider, PetRuntime, Plugin, PluginError, ProcessingContext,
    ProviderBuildConfig, ProviderError, ProviderId, ProxyConfig, ResponseEvent, Role,
    RuntimeOptions, SessionId, SpeechSettings, SpeechSynthesizer, Transcriber,
    TranscriptionSettings, TurnPhase,
};
