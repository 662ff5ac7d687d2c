//! Redacted secrets and an in-memory API key store.
//!
//! ```rust
//! use pprovider::{SecretString, SecureCredentialManager};
//!
//! let secret = SecretString::new("sk-live");
//! assert_eq!(format!("{secret:?}"), "[REDACTED]");
//!
//! let manager = SecureCredentialManager::new();
//! manager.set_api_key("tts", "sk-voice").expect("store key");
//! let len = manager.with_api_key("tts", |key| key.len()).expect("lookup");
//! assert_eq!(len, Some(8));
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Deserializer};

use crate::ProviderError;

/// String whose contents never show up in `Debug` output and are zeroed on drop.
#[derive(PartialEq, Eq, Default)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn expose(&self) -> &str {
        self.value.as_str()
    }

    /// True when the secret is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::new)
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        // SAFETY: zero bytes are valid UTF-8 and the string is dropped right after.
        unsafe {
            self.value.as_mut_vec().fill(0);
        }
    }
}

/// API keys keyed by service name (`chat`, `tts`, `asr`, ...).
#[derive(Default)]
pub struct SecureCredentialManager {
    keys: Mutex<HashMap<String, SecretString>>,
}

impl SecureCredentialManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_api_key(
        &self,
        service: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<(), ProviderError> {
        let api_key = SecretString::new(api_key);
        if api_key.is_blank() {
            return Err(ProviderError::configuration("api key must not be empty"));
        }

        self.keys()?.insert(service.into(), api_key);
        Ok(())
    }

    pub fn has_api_key(&self, service: &str) -> Result<bool, ProviderError> {
        Ok(self.keys()?.contains_key(service))
    }

    pub fn api_key(&self, service: &str) -> Result<Option<SecretString>, ProviderError> {
        Ok(self.keys()?.get(service).cloned())
    }

    pub fn with_api_key<R>(
        &self,
        service: &str,
        f: impl FnOnce(&str) -> R,
    ) -> Result<Option<R>, ProviderError> {
        let keys = self.keys()?;
        Ok(keys.get(service).map(|secret| f(secret.expose())))
    }

    pub fn clear(&self, service: &str) -> Result<bool, ProviderError> {
        Ok(self.keys()?.remove(service).is_some())
    }

    fn keys(&self) -> Result<MutexGuard<'_, HashMap<String, SecretString>>, ProviderError> {
        self.keys
            .lock()
            .map_err(|_| ProviderError::other("credential manager lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;

    #[test]
    fn blank_keys_are_rejected_as_configuration_errors() {
        let manager = SecureCredentialManager::new();
        let error = manager.set_api_key("chat", "   ").expect_err("blank key");
        assert_eq!(error.kind, ProviderErrorKind::Configuration);
        assert!(!manager.has_api_key("chat").expect("lookup"));
    }

    #[test]
    fn keys_can_be_replaced_and_cleared() {
        let manager = SecureCredentialManager::new();
        manager.set_api_key("asr", "first").expect("store");
        manager.set_api_key("asr", "second").expect("replace");

        let key = manager.api_key("asr").expect("lookup").expect("present");
        assert_eq!(key.expose(), "second");
        assert!(manager.clear("asr").expect("clear"));
        assert!(!manager.clear("asr").expect("clear again"));
    }

    #[test]
    fn secret_deserializes_from_plain_string() {
        let secret: SecretString = serde_json::from_str("\"sk-123\"").expect("deserialize");
        assert_eq!(secret.expose(), "sk-123");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
    }
}
