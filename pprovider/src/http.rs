//! Shared reqwest client construction keyed by proxy settings.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::{Client, Proxy, Response};

use crate::{ProviderError, ProxyResolver, ProxySettings};

/// Builds and caches one [`Client`] per distinct proxy setting so connection
/// pools are reused between requests of the same category.
#[derive(Debug, Default)]
pub struct HttpClientFactory {
    timeout: Option<Duration>,
    clients: Mutex<HashMap<Option<ProxySettings>, Client>>,
}

impl HttpClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn client_for_category(
        &self,
        resolver: &dyn ProxyResolver,
        category: Option<&str>,
    ) -> Result<Client, ProviderError> {
        self.client_for(resolver.proxy_for(category))
    }

    pub fn client_for(&self, proxy: Option<ProxySettings>) -> Result<Client, ProviderError> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| ProviderError::other("http client cache lock poisoned"))?;

        if let Some(client) = clients.get(&proxy) {
            return Ok(client.clone());
        }

        let client = self.build(proxy.as_ref())?;
        clients.insert(proxy, client.clone());
        Ok(client)
    }

    fn build(&self, proxy: Option<&ProxySettings>) -> Result<Client, ProviderError> {
        let mut builder = Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match proxy {
            None => builder.no_proxy(),
            Some(ProxySettings::System) => builder,
            Some(ProxySettings::Explicit { url }) => {
                let proxy = Proxy::all(url.as_str()).map_err(|err| {
                    ProviderError::configuration(format!("invalid proxy url '{url}': {err}"))
                })?;
                builder.proxy(proxy)
            }
        };

        builder
            .build()
            .map_err(|err| ProviderError::configuration(format!("http client: {err}")))
    }
}

/// Maps a reqwest send/read failure to timeout or transport.
pub fn map_send_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::timeout(err.to_string())
    } else {
        ProviderError::transport(err.to_string())
    }
}

/// Consumes an unsuccessful response into an error that keeps status and body.
pub async fn status_error(response: Response, backend: &str) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body)
        .unwrap_or_else(|| format!("{backend} request failed with status {status}"));
    ProviderError::from_status(status, body, message)
}

/// Pulls a human message out of the common JSON error envelopes
/// (`{"error":{"message":..}}`, `{"error":".."}`, `{"message":..}`, `{"detail":..}`).
pub fn extract_error_message(body: &str) -> Option<String> {
    let value = serde_json::from_str::<serde_json::Value>(body).ok()?;
    let candidate = value
        .pointer("/error/message")
        .or_else(|| value.get("error"))
        .or_else(|| value.get("message"))
        .or_else(|| value.get("detail"))?;

    candidate.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProxyConfig;

    #[test]
    fn clients_are_cached_per_proxy_setting() {
        let factory = HttpClientFactory::new().with_timeout(Duration::from_secs(5));
        let config = ProxyConfig::disabled();

        factory
            .client_for_category(&config, Some("chat"))
            .expect("direct client");
        factory
            .client_for(Some(ProxySettings::Explicit {
                url: "http://127.0.0.1:8080".to_string(),
            }))
            .expect("proxied client");
        factory.client_for(None).expect("cached direct client");

        assert_eq!(factory.clients.lock().expect("cache lock").len(), 2);
    }

    #[test]
    fn error_envelopes_are_understood() {
        assert_eq!(
            extract_error_message(r#"{"error":{"message":"bad key"}}"#).as_deref(),
            Some("bad key")
        );
        assert_eq!(
            extract_error_message(r#"{"detail":"text is empty"}"#).as_deref(),
            Some("text is empty")
        );
        assert_eq!(extract_error_message("<html>502</html>"), None);
    }
}
