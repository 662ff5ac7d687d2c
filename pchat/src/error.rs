//! Chat-layer errors and classification.
//!
//! ```rust
//! use pchat::{ChatError, ChatErrorKind, ChatErrorPhase};
//! use pprovider::ProviderError;
//!
//! let error = ChatError::from(ProviderError::api(503, "busy"))
//!     .with_backend("openai")
//!     .with_phase(ChatErrorPhase::Backend);
//!
//! assert_eq!(error.kind, ChatErrorKind::Backend);
//! assert_eq!(error.status, Some(503));
//! assert!(!error.is_retryable());
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

use pplugin::PluginError;
use pprovider::{ProviderError, ProviderErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    InvalidRequest,
    Configuration,
    Transport,
    Timeout,
    /// The backend answered with an unsuccessful status.
    Backend,
    Capability,
    Plugin,
    /// Follow-up action rounds exceeded `ChatPolicy::max_action_rounds`.
    LoopBound,
    Cancelled,
    Store,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorPhase {
    Request,
    Lifecycle,
    Backend,
    ActionResolution,
    Finalizing,
    Storage,
}

impl ChatErrorPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Lifecycle => "lifecycle",
            Self::Backend => "backend",
            Self::ActionResolution => "action_resolution",
            Self::Finalizing => "finalizing",
            Self::Storage => "storage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
    pub phase: Option<ChatErrorPhase>,
    pub backend: Option<String>,
    pub provider_kind: Option<ProviderErrorKind>,
    pub status: Option<u16>,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            phase: None,
            backend: None,
            provider_kind: None,
            status: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Configuration, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Timeout, message)
    }

    pub fn capability(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Capability, message)
    }

    pub fn plugin(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Plugin, message)
    }

    pub fn loop_bound(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::LoopBound, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Cancelled, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Store, message)
    }

    pub fn with_phase(mut self, phase: ChatErrorPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ChatErrorKind::Transport | ChatErrorKind::Timeout)
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self.kind,
            ChatErrorKind::InvalidRequest | ChatErrorKind::Configuration | ChatErrorKind::Capability
        )
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(phase) = self.phase {
            write!(f, " (phase={}", phase.as_str())?;
            if let Some(backend) = &self.backend {
                write!(f, ", backend={backend}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl Error for ChatError {}

impl From<ProviderError> for ChatError {
    fn from(value: ProviderError) -> Self {
        let kind = match value.kind {
            ProviderErrorKind::Configuration => ChatErrorKind::Configuration,
            ProviderErrorKind::Capability => ChatErrorKind::Capability,
            ProviderErrorKind::Timeout => ChatErrorKind::Timeout,
            ProviderErrorKind::Transport => ChatErrorKind::Transport,
            ProviderErrorKind::InvalidRequest if value.status.is_none() => {
                ChatErrorKind::InvalidRequest
            }
            _ => ChatErrorKind::Backend,
        };

        let message = match &value.body {
            Some(body) if !body.trim().is_empty() => format!("{} ({body})", value.message),
            _ => value.message.clone(),
        };

        Self {
            kind,
            message,
            phase: None,
            backend: None,
            provider_kind: Some(value.kind),
            status: value.status,
        }
    }
}

impl From<PluginError> for ChatError {
    fn from(value: PluginError) -> Self {
        ChatError::plugin(value.to_string())
    }
}
