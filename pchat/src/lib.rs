//! Conversation turn orchestration: history, records, plugins, and one bound
//! backend.
//!
//! ```rust
//! use pchat::{ChatHistory, ChatPolicy, TurnPhase};
//!
//! let policy = ChatPolicy::default().with_max_action_rounds(1);
//! assert_eq!(policy.max_action_rounds, 1);
//! assert_eq!(TurnPhase::default(), TurnPhase::Idle);
//! assert_eq!(ChatHistory::new().token_count(), 0);
//! ```

mod error;
mod history;
mod hooks;
mod policy;
mod service;
mod store;
mod types;

pub mod prelude {
    pub use crate::{
        ChatCore, ChatCoreBuilder, ChatError, ChatErrorKind, ChatErrorPhase, ChatHistory,
        ChatPolicy, ChatTurnResult, HistoryPersistence, HistorySnapshot,
        InMemoryHistoryPersistence, Record, ResponseEvent, TurnHooks, TurnPhase,
    };
    pub use pcommon::{MetadataMap, SessionId, TurnId};
    pub use pplugin::{
        ActionPlugin, ChannelModeDefinition, ChannelModeProvider, DynamicInfoProvider,
        FunctionAction, LifecyclePlugin, Plugin, PluginError, PluginRegistry, ProcessingContext,
        ProcessingFailure,
    };
}

pub use service::{ChatCore, ChatCoreBuilder, DEFAULT_SESSION};
pub use error::{ChatError, ChatErrorKind, ChatErrorPhase};
pub use history::{
    ChatHistory, IMAGE_TOKENS, MESSAGE_OVERHEAD_TOKENS, estimate_tokens, estimate_total,
    fit_to_budget,
};
pub use hooks::{NoopTurnHooks, TurnHooks};
pub use policy::{
    ChatPolicy, DEFAULT_HISTORY_TOKEN_BUDGET, DEFAULT_MAX_ACTION_ROUNDS, DEFAULT_REQUEST_TIMEOUT,
};
pub use store::{
    ChatFuture, HistoryPersistence, HistorySnapshot, InMemoryHistoryPersistence, Record,
    RecordStore,
};
pub use types::{ChatTurnResult, ResponseEvent, ResponseHandler, TurnPhase};
pub use tokio_util::sync::CancellationToken;
