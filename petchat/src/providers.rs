//! Stable provider construction surface for facade consumers.

use std::sync::Arc;
use std::time::Duration;

use crate::{
    ModelProvider, NoProxy, ProviderError, ProviderId, ProxyResolver, SecureCredentialManager,
};

/// Credential slot used for OpenAI-compatible third-party servers.
pub const COMPATIBLE_CREDENTIAL_KEY: &str = "openai-compatible";

#[derive(Clone)]
pub struct ProviderBuildConfig {
    pub provider_id: ProviderId,
    /// Required for `openai` and `openai-compatible`; ignored by Ollama.
    pub api_key: Option<String>,
    /// Required for `openai-compatible`; optional override otherwise.
    pub base_url: Option<String>,
    pub fallback_model: Option<String>,
    /// Overrides the adapter's image capability default.
    pub images: Option<bool>,
    pub timeout: Duration,
    pub proxy: Arc<dyn ProxyResolver>,
}

impl ProviderBuildConfig {
    pub fn new(provider_id: ProviderId) -> Self {
        Self {
            provider_id,
            api_key: None,
            base_url: None,
            fallback_model: None,
            images: None,
            timeout: Duration::from_secs(90),
            proxy: Arc::new(NoProxy),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = Some(model.into());
        self
    }

    pub fn with_image_support(mut self, images: bool) -> Self {
        self.images = Some(images);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_proxy(mut self, proxy: Arc<dyn ProxyResolver>) -> Self {
        self.proxy = proxy;
        self
    }

    fn required_api_key(&self) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().map(str::trim).unwrap_or_default();
        if api_key.is_empty() {
            return Err(ProviderError::configuration(format!(
                "{} requires an API key",
                self.provider_id
            )));
        }
        Ok(api_key.to_string())
    }
}

pub fn build_provider_from_api_key(
    provider_id: ProviderId,
    api_key: impl Into<String>,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    build_provider_with_config(ProviderBuildConfig::new(provider_id).with_api_key(api_key))
}

/// Validates the configuration before any network use, then builds the adapter
/// over an HTTP client routed through the `chat` proxy category.
pub fn build_provider_with_config(
    config: ProviderBuildConfig,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    match config.provider_id {
        ProviderId::OpenAi => build_openai_provider(config),
        ProviderId::OpenAiCompatible => build_compatible_provider(config),
        ProviderId::Ollama => build_ollama_provider(config),
    }
}

#[cfg(feature = "provider-openai")]
fn chat_client(config: &ProviderBuildConfig) -> Result<reqwest::Client, ProviderError> {
    pprovider::http::HttpClientFactory::new()
        .with_timeout(config.timeout)
        .client_for_category(config.proxy.as_ref(), Some(pprovider::request_types::CHAT))
}

#[cfg(feature = "provider-openai")]
fn build_openai_provider(
    config: ProviderBuildConfig,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    use pprovider::adapters::openai::{OPENAI_CREDENTIAL_KEY, OpenAiHttpTransport, OpenAiProvider};

    let api_key = config.required_api_key()?;
    let credentials = Arc::new(SecureCredentialManager::new());
    credentials.set_api_key(OPENAI_CREDENTIAL_KEY, api_key)?;

    let mut transport = OpenAiHttpTransport::new(chat_client(&config)?);
    if let Some(base_url) = config.base_url.as_deref() {
        transport = transport.with_base_url(base_url);
    }

    let mut provider = OpenAiProvider::new(credentials, Arc::new(transport));
    if let Some(model) = config.fallback_model {
        provider = provider.with_fallback_model(model);
    }
    if let Some(images) = config.images {
        provider = provider.with_image_support(images);
    }
    Ok(Arc::new(provider))
}

#[cfg(feature = "provider-openai")]
fn build_compatible_provider(
    config: ProviderBuildConfig,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    use pprovider::adapters::openai::{OpenAiHttpTransport, OpenAiProvider};

    let Some(base_url) = config
        .base_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
    else {
        return Err(ProviderError::configuration(
            "openai-compatible requires a base url",
        ));
    };
    let api_key = config.required_api_key()?;
    let credentials = Arc::new(SecureCredentialManager::new());
    credentials.set_api_key(COMPATIBLE_CREDENTIAL_KEY, api_key)?;

    let transport = OpenAiHttpTransport::new(chat_client(&config)?)
        .with_base_url(base_url)
        .with_backend_label("openai-compatible");

    let mut provider =
        OpenAiProvider::compatible(credentials, COMPATIBLE_CREDENTIAL_KEY, Arc::new(transport));
    if let Some(model) = config.fallback_model {
        provider = provider.with_fallback_model(model);
    }
    if let Some(images) = config.images {
        provider = provider.with_image_support(images);
    }
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "provider-openai"))]
fn build_openai_provider(
    _config: ProviderBuildConfig,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    Err(ProviderError::configuration(
        "provider-openai feature is not enabled on petchat",
    ))
}

#[cfg(not(feature = "provider-openai"))]
fn build_compatible_provider(
    _config: ProviderBuildConfig,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    Err(ProviderError::configuration(
        "provider-openai feature is not enabled on petchat",
    ))
}

#[cfg(feature = "provider-ollama")]
fn build_ollama_provider(
    config: ProviderBuildConfig,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    use pprovider::adapters::ollama::OllamaProvider;

    let mut transport = OllamaProvider::default_http_transport(chat_client(&config)?);
    if let Some(base_url) = config.base_url.as_deref() {
        transport = transport.with_base_url(base_url);
    }

    let mut provider = OllamaProvider::new(Arc::new(transport));
    if let Some(model) = config.fallback_model {
        provider = provider.with_fallback_model(model);
    }
    if let Some(images) = config.images {
        provider = provider.with_image_support(images);
    }
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "provider-ollama"))]
fn build_ollama_provider(
    _config: ProviderBuildConfig,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    Err(ProviderError::configuration(
        "provider-ollama feature is not enabled on petchat",
    ))
}

/// Lists models installed on a local Ollama host.
#[cfg(feature = "provider-ollama")]
pub async fn list_ollama_models(host_url: Option<&str>) -> Result<Vec<String>, ProviderError> {
    use pprovider::adapters::ollama::{OLLAMA_HOST_URL, list_ollama_models};

    let client = pprovider::http::HttpClientFactory::new().client_for(None)?;
    list_ollama_models(&client, host_url.unwrap_or(OLLAMA_HOST_URL)).await
}
