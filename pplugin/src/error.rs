//! Plugin errors and classifications.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginErrorKind {
    /// Rejected by the registry (duplicate name, malformed mode id, ...).
    Registration,
    InvalidArguments,
    Execution,
    Timeout,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginError {
    pub kind: PluginErrorKind,
    pub message: String,
    pub plugin: Option<String>,
}

impl PluginError {
    pub fn new(kind: PluginErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            plugin: None,
        }
    }

    pub fn registration(message: impl Into<String>) -> Self {
        Self::new(PluginErrorKind::Registration, message)
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(PluginErrorKind::InvalidArguments, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(PluginErrorKind::Execution, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PluginErrorKind::Timeout, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(PluginErrorKind::Other, message)
    }

    /// Attributes the error to a plugin unless it already names one.
    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        if self.plugin.is_none() {
            self.plugin = Some(plugin.into());
        }
        self
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self.kind,
            PluginErrorKind::Registration | PluginErrorKind::InvalidArguments
        )
    }
}

impl Display for PluginError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.plugin {
            Some(plugin) => write!(f, "{:?} [plugin={}]: {}", self.kind, plugin, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for PluginError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_attribution_is_kept_once() {
        let error = PluginError::execution("bowl is empty")
            .with_plugin("Feed")
            .with_plugin("Other");
        assert_eq!(error.plugin.as_deref(), Some("Feed"));
        assert_eq!(error.to_string(), "Execution [plugin=Feed]: bowl is empty");
        assert!(!error.is_user_error());
    }

    #[test]
    fn registration_errors_are_user_errors() {
        assert!(PluginError::registration("duplicate").is_user_error());
        assert_eq!(PluginError::timeout("slow").to_string(), "Timeout: slow");
    }
}
