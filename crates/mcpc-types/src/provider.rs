//! Provider trait for chat-completion APIs.

use crate::{ApiError, ChatRequest, ChatResponse};
use std::future::Future;
use std::pin::Pin;

/// Trait for chat-completion providers (OpenAI-compatible endpoints, mocks).
///
/// Providers translate between canonical mcpc message types and their native
/// API format. Dyn-compatible so the chat handler works with
/// `Arc<dyn Provider>`.
pub trait Provider: Send + Sync {
    /// Send the full conversation and wait for the model's complete answer.
    fn complete<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ChatResponse, ApiError>> + Send + 'a>>;

    /// Provider name for logging/display (e.g., "openai").
    fn name(&self) -> &str;
}
