//! Capability contracts a plugin may implement.
//!
//! ```rust
//! use pplugin::{ChannelModeDefinition, ChannelModeProvider, DynamicInfoProvider};
//!
//! struct Weather;
//!
//! impl DynamicInfoProvider for Weather {
//!     fn dynamic_info(&self) -> Option<String> {
//!         Some("It is raining outside.".to_string())
//!     }
//! }
//!
//! impl ChannelModeProvider for Weather {
//!     fn custom_modes(&self) -> Vec<ChannelModeDefinition> {
//!         vec![ChannelModeDefinition::new("Weather:forecast", "Forecast", "Daily forecast chat")]
//!     }
//! }
//!
//! assert_eq!(Weather.custom_modes()[0].mode_name(), Some("forecast"));
//! ```

use std::any::Any;
use std::fmt::{Display, Formatter};

use pcommon::BoxFuture;

use crate::{PluginError, ProcessingContext};

pub type PluginFuture<'a, T> = BoxFuture<'a, T>;

/// Plugin-owned value stored in the turn's [`ProcessingContext`].
pub type TurnState = Box<dyn Any + Send + Sync>;

/// Invoked by `[Name:arguments]` markers in backend text.
pub trait ActionPlugin: Send + Sync {
    /// Receives the raw argument string (empty for `[Name]`). The returned text
    /// replaces the marker.
    fn function<'a>(&'a self, arguments: &'a str) -> PluginFuture<'a, Result<String, PluginError>>;

    /// When true, the result is also sent back to the backend as a function
    /// message and the reply is appended to the turn.
    fn follows_up(&self) -> bool {
        false
    }
}

/// Observes every phase of a turn. All four hooks are mandatory.
pub trait LifecyclePlugin: Send + Sync {
    /// Runs once per user-initiated turn, never for continuations. The returned
    /// state is retrievable from the context in later hooks of the same turn.
    fn on_processing_start<'a>(
        &'a self,
        context: &'a ProcessingContext,
    ) -> PluginFuture<'a, Result<Option<TurnState>, PluginError>>;

    fn on_response_start<'a>(
        &'a self,
        context: &'a ProcessingContext,
        response: &'a str,
    ) -> PluginFuture<'a, Result<(), PluginError>>;

    fn on_processing_complete<'a>(
        &'a self,
        context: &'a ProcessingContext,
        final_text: &'a str,
    ) -> PluginFuture<'a, Result<(), PluginError>>;

    fn on_processing_error<'a>(
        &'a self,
        context: &'a ProcessingContext,
        failure: &'a ProcessingFailure,
    ) -> PluginFuture<'a, Result<(), PluginError>>;
}

/// Contributes text to the outbound system context of every request.
pub trait DynamicInfoProvider: Send + Sync {
    fn dynamic_info(&self) -> Option<String>;
}

pub trait ChannelModeProvider: Send + Sync {
    fn custom_modes(&self) -> Vec<ChannelModeDefinition>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelModeDefinition {
    /// `<pluginName>:<modeName>`
    pub mode_id: String,
    pub display_name: String,
    pub description: String,
}

impl ChannelModeDefinition {
    pub fn new(
        mode_id: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            mode_id: mode_id.into(),
            display_name: display_name.into(),
            description: description.into(),
        }
    }

    pub fn plugin_name(&self) -> Option<&str> {
        self.mode_id.split_once(':').map(|(plugin, _)| plugin)
    }

    pub fn mode_name(&self) -> Option<&str> {
        self.mode_id.split_once(':').map(|(_, mode)| mode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    ProcessingStart,
    ResponseStart,
    ProcessingComplete,
    ProcessingError,
}

impl LifecyclePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProcessingStart => "processing_start",
            Self::ResponseStart => "response_start",
            Self::ProcessingComplete => "processing_complete",
            Self::ProcessingError => "processing_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureSource {
    /// A lifecycle hook or action of the named plugin.
    Plugin(String),
    /// The bound chat backend.
    Backend(String),
    /// Orchestration itself (loop bound, cancellation, storage).
    Core,
}

/// What lifecycle plugins are told in `on_processing_error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingFailure {
    pub source: FailureSource,
    pub phase: String,
    pub message: String,
}

impl ProcessingFailure {
    pub fn new(
        source: FailureSource,
        phase: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            phase: phase.into(),
            message: message.into(),
        }
    }

    pub fn from_plugin_error(phase: impl Into<String>, error: &PluginError) -> Self {
        let plugin = error.plugin.clone().unwrap_or_default();
        Self::new(FailureSource::Plugin(plugin), phase, error.message.clone())
    }

    pub fn plugin(&self) -> Option<&str> {
        match &self.source {
            FailureSource::Plugin(name) => Some(name),
            _ => None,
        }
    }
}

impl Display for ProcessingFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            FailureSource::Plugin(name) => {
                write!(f, "plugin '{}' failed in {}: {}", name, self.phase, self.message)
            }
            FailureSource::Backend(name) => {
                write!(f, "backend '{}' failed in {}: {}", name, self.phase, self.message)
            }
            FailureSource::Core => write!(f, "{} failed: {}", self.phase, self.message),
        }
    }
}
