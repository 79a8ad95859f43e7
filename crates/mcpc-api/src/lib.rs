//! OpenAI-compatible chat-completions client for mcpc.

mod client;
mod provider;
mod wire;

pub use client::ApiClient;
pub use provider::OpenAiProvider;
