//! Provider-agnostic chat model contracts, backend errors, and proxy resolution.
//!
//! ```rust
//! use pprovider::{Message, ModelRequest, ProviderRegistry, Role};
//!
//! let request = ModelRequest::builder("gpt-4o-mini")
//!     .message(Message::new(Role::User, "Say hi to the pet"))
//!     .temperature(0.7)
//!     .build()
//!     .expect("request should be valid");
//!
//! let registry = ProviderRegistry::new();
//! assert!(registry.is_empty());
//! assert_eq!(request.messages.len(), 1);
//! ```

pub mod adapters;
mod credentials;
mod error;
#[cfg(feature = "http")]
pub mod http;
mod model;
mod provider;
mod proxy;
mod registry;
mod resilience;
mod stream;

pub mod prelude {
    pub use crate::{
        BoxedEventStream, ImagePayload, Message, ModelProvider, ModelRequest, ModelResponse,
        NoProxy, ProviderCapabilities, ProviderError, ProviderErrorKind, ProviderFuture,
        ProviderId, ProviderRegistry, ProxyConfig, ProxyResolver, ProxySettings, Role,
        SecretString, SecureCredentialManager, StopReason, StreamEvent, TokenUsage,
    };

    #[cfg(feature = "http")]
    pub use crate::http::HttpClientFactory;
}

pub use credentials::{SecretString, SecureCredentialManager};
pub use error::{ProviderError, ProviderErrorKind};
pub use model::{
    ImagePayload, Message, ModelRequest, ModelRequestBuilder, ModelResponse,
    ProviderCapabilities, ProviderId, Role, StopReason, TokenUsage,
};
pub use provider::{ModelProvider, ProviderFuture};
pub use proxy::{NoProxy, ProxyConfig, ProxyProtocol, ProxyResolver, ProxySettings, request_types};
pub use registry::ProviderRegistry;
pub use resilience::{
    NoopOperationHooks, ProviderOperationHooks, RetryPolicy, execute_with_retry,
};
pub use stream::{BoxedEventStream, ModelEventStream, StreamEvent, VecEventStream};
