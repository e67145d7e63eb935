use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::error::ChatError;
use crate::types::{CompletionResponse, Message, TokenUsage};
use crate::util::{http, join_url};

use super::ChatProvider;

/// OpenAI-compatible provider.
/// Works with LiteLLM proxies, vLLM, OpenRouter and any `/chat/completions` API.
pub struct OpenAiCompatProvider {
    api_key: String,
    api_base: String,
}

impl OpenAiCompatProvider {
    pub fn new(api_key: String, api_base: String) -> Self {
        Self {
            api_key,
            api_base: api_base.trim().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    async fn chat(
        &self,
        messages: &[Message],
        model: &str,
        max_tokens: u32,
    ) -> Result<CompletionResponse, ChatError> {
        let url = join_url(&self.api_base, "/chat/completions");

        let body = json!({
            "model": model,
            "messages": messages,
            "max_tokens": max_tokens,
        });

        debug!("OpenAI-compat request to {} with model {}", url, model);

        let response = http::client()
            .post(&url)
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ChatError::from_status(status.as_u16(), text));
        }

        let data: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ChatError::Other(format!("Failed to parse response: {e}")))?;
        parse_openai_response(&data)
    }
}

/// Parse an OpenAI-format response into our CompletionResponse.
pub fn parse_openai_response(data: &serde_json::Value) -> Result<CompletionResponse, ChatError> {
    let message = data
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| ChatError::Other("No message in response".to_string()))?;

    let content = message.get("content").and_then(|v| v.as_str()).map(|s| s.to_string());
    let model = data.get("model").and_then(|v| v.as_str()).map(|s| s.to_string());

    let usage = match data.get("usage") {
        Some(u) => {
            let count = |key: &str| u.get(key).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            TokenUsage {
                prompt_tokens: count("prompt_tokens"),
                completion_tokens: count("completion_tokens"),
                total_tokens: count("total_tokens"),
            }
        }
        None => TokenUsage::default(),
    };

    Ok(CompletionResponse {
        content,
        model,
        usage,
    })
}
