pub mod openai_compat;

use async_trait::async_trait;

use crate::error::ChatError;
use crate::types::{CompletionResponse, Message};

/// Trait for chat completion backends.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a chat completion request.
    async fn chat(
        &self,
        messages: &[Message],
        model: &str,
        max_tokens: u32,
    ) -> Result<CompletionResponse, ChatError>;
}

/// Create a provider bound to one base URL and API token.
pub fn create_provider(api_key: &str, api_base: &str) -> Box<dyn ChatProvider> {
    Box::new(openai_compat::OpenAiCompatProvider::new(
        api_key.to_string(),
        api_base.to_string(),
    ))
}
