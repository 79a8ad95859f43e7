//! OpenAI chat-completions provider implementation.

use crate::client::ApiClient;
use mcpc_types::{ApiError, ChatRequest, ChatResponse, Provider};
use std::future::Future;
use std::pin::Pin;

/// Provider backed by an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: ApiClient,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self {
            client: ApiClient::new(api_key, base_url)?,
        })
    }
}

impl Provider for OpenAiProvider {
    fn complete<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ChatResponse, ApiError>> + Send + 'a>> {
        Box::pin(self.client.create_chat_completion(request))
    }

    fn name(&self) -> &str {
        "openai"
    }
}
