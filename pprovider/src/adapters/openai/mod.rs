pub(crate) mod provider;
mod serde_api;
mod tests;
mod transport;
mod types;

pub use provider::{OPENAI_CREDENTIAL_KEY, OpenAiProvider};
pub use transport::{OpenAiChunkStream, OpenAiHttpTransport, OpenAiTransport, normalize_base_url};
pub use types::{
    OpenAiAuth, OpenAiFinishReason, OpenAiMessage, OpenAiRequest, OpenAiResponse, OpenAiRole,
    OpenAiStreamChunk, OpenAiUsage,
};
