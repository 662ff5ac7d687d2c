//! Unified facade over the petchat workspace crates.
//!
//! This crate is designed to be the single dependency for a desktop-pet frontend.
//! It re-exports the chat core, plugin system, providers, voice clients,
//! persistence backends, and observability hooks, and adds wiring helpers and
//! message macros for common setup.
//!
//! ```rust
//! use petchat::{Role, pet_messages};
//!
//! let seed = pet_messages![
//!     system => "You are Mochi, a sleepy cat.",
//!     assistant => "*yawns*",
//! ];
//! assert_eq!(seed[1].role, Role::Assistant);
//! ```

mod macros;

pub mod prelude;
pub mod providers;
pub mod runtime;
pub mod util;

pub use pchat;
pub use pcommon;
pub use pmemory;
pub use pobserve;
pub use pplugin;
pub use pprovider;
pub use pvoice;

pub use pchat::{
    CancellationToken, ChatCore, ChatCoreBuilder, ChatError, ChatErrorKind, ChatErrorPhase,
    ChatHistory, ChatPolicy, ChatTurnResult, DEFAULT_HISTORY_TOKEN_BUDGET,
    DEFAULT_MAX_ACTION_ROUNDS, DEFAULT_REQUEST_TIMEOUT, HistoryPersistence, HistorySnapshot,
    InMemoryHistoryPersistence, NoopTurnHooks, Record, ResponseEvent, ResponseHandler,
    TurnHooks, TurnPhase, estimate_tokens,
};
pub use pcommon::{BoxFuture, MetadataMap, SessionId, TurnId};
pub use pmemory::{
    FilesystemHistoryStore, HistoryBackendConfig, MemoryError, MemoryErrorKind,
    SqliteHistoryStore, create_default_history_backend, create_history_backend,
};
pub use pobserve::{
    MetricsObservabilityHooks, SafeDispatchHooks, SafeProviderHooks, SafeTurnHooks,
    TracingObservabilityHooks,
};
pub use pplugin::{
    ActionOutcome, ActionPlugin, ChannelModeDefinition, ChannelModeProvider, DispatchHooks,
    DynamicInfoProvider, FailureSource, FunctionAction, LifecyclePhase, LifecyclePlugin,
    NoopDispatchHooks, Plugin, PluginBuilder, PluginError, PluginErrorKind, PluginFuture,
    PluginRegistry, ProcessingContext, ProcessingFailure, TurnState, parse_json_object,
    required_string, split_arguments,
};
pub use pprovider::{
    BoxedEventStream, ImagePayload, Message, ModelProvider, ModelRequest, ModelResponse,
    NoProxy, NoopOperationHooks, ProviderCapabilities, ProviderError, ProviderErrorKind,
    ProviderFuture, ProviderId, ProviderOperationHooks, ProxyConfig, ProxyProtocol,
    ProxyResolver, ProxySettings, RetryPolicy, Role, SecretString, SecureCredentialManager,
    StopReason, StreamEvent, TokenUsage, VecEventStream, execute_with_retry, request_types,
};
pub use pvoice::{
    AudioClip, SpeechSettings, SpeechStrategy, SpeechSynthesizer, Transcriber,
    TranscriptionSettings, TranscriptionStrategy, VoiceTransport,
};

pub use providers::{ProviderBuildConfig, build_provider_from_api_key, build_provider_with_config};
pub use runtime::{
    PetRuntime, RuntimeOptions, build_runtime, build_runtime_with, chat_core,
    chat_core_with_persistence, in_memory_persistence, observed_chat_core,
};
pub use util::{
    assistant_message, function_message, init_tracing, init_tracing_with, parse_provider_id,
    persona_policy, system_message, user_message,
};
