use tracing::{debug, warn};

use crate::error::ChatError;
use crate::provider::ChatProvider;
use crate::types::Message;

/// Completion ceiling for every chat turn.
pub const CHAT_MAX_TOKENS: u32 = 500;

/// Ask for one completion of a single user message. No history is sent.
pub async fn complete_single_turn(
    provider: &dyn ChatProvider,
    model: &str,
    message: &str,
) -> Result<String, ChatError> {
    let messages = [Message::user(message)];
    match provider.chat(&messages, model, CHAT_MAX_TOKENS).await {
        Ok(response) => {
            debug!(
                model = response.model.as_deref().unwrap_or(model),
                tokens = response.usage.total_tokens,
                "Chat completion received"
            );
            Ok(response.content.unwrap_or_default())
        }
        Err(e) => {
            warn!("Chat completion failed: {}", e);
            Err(e)
        }
    }
}
