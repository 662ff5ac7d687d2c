//! Plugin contracts, registry, and dispatcher for the conversational core.
//!
//! A plugin is a name plus any combination of four capabilities: actions
//! triggered by `[Name:arguments]` markers, turn lifecycle hooks, dynamic
//! system-context info, and custom channel modes.

mod args;
mod context;
mod contracts;
mod dispatcher;
mod error;
mod hooks;
mod marker;
mod plugin;
mod registry;

pub mod prelude {
    pub use crate::{
        ActionPlugin, ActionResolution, ChannelModeDefinition, ChannelModeProvider,
        DynamicInfoProvider, FunctionAction, LifecyclePlugin, Plugin, PluginDispatcher,
        PluginError, PluginErrorKind, PluginFuture, PluginRegistry, ProcessingContext,
        ProcessingFailure, TurnState,
    };
}

pub use args::{
    optional_string, parse_json_object, parse_json_value, required_string, split_arguments,
};
pub use context::ProcessingContext;
pub use contracts::{
    ActionPlugin, ChannelModeDefinition, ChannelModeProvider, DynamicInfoProvider,
    FailureSource, LifecyclePhase, LifecyclePlugin, PluginFuture, ProcessingFailure, TurnState,
};
pub use dispatcher::{ActionOutcome, ActionResolution, DEFAULT_ACTION_TIMEOUT, PluginDispatcher};
pub use error::{PluginError, PluginErrorKind};
pub use hooks::{DispatchHooks, NoopDispatchHooks};
pub use marker::{ActionMarker, find_markers};
pub use plugin::{Capability, FunctionAction, Plugin, PluginBuilder, PluginDescriptor};
pub use registry::PluginRegistry;
