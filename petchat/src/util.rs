//! Small convenience constructors and process setup.

use tracing_subscriber::EnvFilter;

use crate::{ChatPolicy, Message, ProviderId, Role};

pub fn system_message(content: impl Into<String>) -> Message {
    Message::new(Role::System, content)
}

pub fn user_message(content: impl Into<String>) -> Message {
    Message::new(Role::User, content)
}

pub fn assistant_message(content: impl Into<String>) -> Message {
    Message::new(Role::Assistant, content)
}

pub fn function_message(content: impl Into<String>) -> Message {
    Message::new(Role::Function, content)
}

/// Policy with a persona prompt and otherwise default limits.
pub fn persona_policy(system_prompt: impl Into<String>) -> ChatPolicy {
    ChatPolicy::default().with_system_prompt(system_prompt)
}

pub fn parse_provider_id(value: &str) -> Option<ProviderId> {
    match value.trim().to_ascii_lowercase().as_str() {
        "openai" | "chatgpt" => Some(ProviderId::OpenAi),
        "openai-compatible" | "openai_compatible" | "compatible" | "custom" => {
            Some(ProviderId::OpenAiCompatible)
        }
        "ollama" | "local" => Some(ProviderId::Ollama),
        _ => None,
    }
}

/// Installs a stderr fmt subscriber filtered by `RUST_LOG`, defaulting to `info`.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing() -> bool {
    init_tracing_with("info")
}

/// Like [`init_tracing`] with a caller-chosen fallback filter.
pub fn init_tracing_with(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
