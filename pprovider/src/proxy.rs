//! Per-request-type egress resolution.
//!
//! A [`ProxyConfig`] answers "which proxy, if any, should this category of
//! request use". `None` always means a direct connection.
//!
//! ```rust
//! use pprovider::{ProxyConfig, ProxyProtocol, ProxyResolver, ProxySettings, request_types};
//!
//! let config = ProxyConfig {
//!     enabled: true,
//!     protocol: ProxyProtocol::Socks5,
//!     address: "127.0.0.1:1080".to_string(),
//!     categories: vec![request_types::TTS.to_string()],
//!     ..ProxyConfig::default()
//! };
//!
//! assert_eq!(
//!     config.proxy_for(Some("tts")),
//!     Some(ProxySettings::Explicit { url: "socks5://127.0.0.1:1080".to_string() })
//! );
//! assert_eq!(config.proxy_for(Some("chat")), None);
//! ```

use serde::Deserialize;

pub mod request_types {
    pub const CHAT: &str = "chat";
    pub const ASR: &str = "asr";
    pub const TTS: &str = "tts";
    pub const PLUGIN: &str = "plugin";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    #[default]
    Http,
    Socks5,
}

impl ProxyProtocol {
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Socks5 => "socks5",
        }
    }
}

/// Resolved egress for one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProxySettings {
    /// Use whatever the operating system environment configures.
    System,
    Explicit { url: String },
}

pub trait ProxyResolver: Send + Sync {
    fn proxy_for(&self, category: Option<&str>) -> Option<ProxySettings>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoProxy;

impl ProxyResolver for NoProxy {
    fn proxy_for(&self, _category: Option<&str>) -> Option<ProxySettings> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub enabled: bool,
    pub follow_system: bool,
    pub protocol: ProxyProtocol,
    /// `host:port`, optionally already carrying a scheme.
    pub address: String,
    pub apply_to_all: bool,
    pub categories: Vec<String>,
}

impl ProxyConfig {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn system() -> Self {
        Self {
            enabled: true,
            follow_system: true,
            apply_to_all: true,
            ..Self::default()
        }
    }

    pub fn explicit(protocol: ProxyProtocol, address: impl Into<String>) -> Self {
        Self {
            enabled: true,
            protocol,
            address: address.into(),
            apply_to_all: true,
            ..Self::default()
        }
    }

    pub fn only_for(mut self, categories: &[&str]) -> Self {
        self.apply_to_all = false;
        self.categories = categories.iter().map(|item| item.to_string()).collect();
        self
    }

    fn applies_to(&self, category: Option<&str>) -> bool {
        match category {
            None => self.apply_to_all,
            Some(category) => {
                self.apply_to_all
                    || self
                        .categories
                        .iter()
                        .any(|item| item.eq_ignore_ascii_case(category))
            }
        }
    }

    fn url(&self) -> Option<String> {
        let address = self.address.trim();
        if address.is_empty() {
            return None;
        }

        if address.contains("://") {
            Some(address.to_string())
        } else {
            Some(format!("{}://{}", self.protocol.scheme(), address))
        }
    }
}

impl ProxyResolver for ProxyConfig {
    fn proxy_for(&self, category: Option<&str>) -> Option<ProxySettings> {
        if !self.enabled || !self.applies_to(category) {
            return None;
        }

        if self.follow_system {
            return Some(ProxySettings::System);
        }

        self.url().map(|url| ProxySettings::Explicit { url })
    }
}
