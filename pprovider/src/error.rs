//! Shared provider error kinds and error value helpers.
//!
//! ```rust
//! use pprovider::{ProviderError, ProviderErrorKind};
//!
//! let missing = ProviderError::configuration("api key is required");
//! assert!(!missing.retryable);
//!
//! let timeout = ProviderError::timeout("backend took too long");
//! assert!(timeout.retryable);
//!
//! let api = ProviderError::from_status(500, "{\"error\":\"boom\"}", "backend failed");
//! assert_eq!(api.kind, ProviderErrorKind::Api);
//! assert_eq!(api.status, Some(500));
//! assert_eq!(api.body.as_deref(), Some("{\"error\":\"boom\"}"));
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Missing or invalid settings, detected before any network call.
    Configuration,
    Authentication,
    RateLimited,
    InvalidRequest,
    Timeout,
    Transport,
    /// Non-success response status from the backend.
    Api,
    /// The bound backend cannot serve the requested feature.
    Capability,
    Unavailable,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub retryable: bool,
    pub status: Option<u16>,
    pub body: Option<String>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            status: None,
            body: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Configuration, message, false)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Authentication, message, false)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message, true)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message, false)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message, true)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message, true)
    }

    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::from_status(status, body, format!("backend responded with status {status}"))
    }

    pub fn capability(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Capability, message, false)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unavailable, message, true)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Other, message, false)
    }

    /// Classifies an unsuccessful HTTP status. Status and raw body are always kept.
    pub fn from_status(status: u16, body: impl Into<String>, message: impl Into<String>) -> Self {
        let error = match status {
            401 | 403 => Self::authentication(message),
            429 => Self::rate_limited(message),
            408 | 504 => Self::timeout(message),
            400 | 422 => Self::invalid_request(message),
            502 | 503 => Self::unavailable(message),
            _ => Self::new(ProviderErrorKind::Api, message, status >= 500),
        };

        error.with_status(status).with_body(body)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ProviderErrorKind::Timeout
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{:?} [status={}]: {}", self.kind, status, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ProviderError {}
