#[cfg(feature = "provider-ollama")]
pub mod ollama;
#[cfg(feature = "provider-openai")]
pub mod openai;
