use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::types::{ChatCompletionRequest, Message};

/// Flattens messages into the tool's prompt: one `role: content` line per
/// message, in request order.
pub fn format(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Validates a raw request body.
///
/// `messages` must be a non-empty array of `{role, content}` objects with a
/// non-empty role; content may be empty. Any
/// other field is passed over.
pub fn parse_request(body: &Value) -> Result<ChatCompletionRequest, ApiError> {
    let raw_messages = body
        .get("messages")
        .and_then(Value::as_array)
        .ok_or(ApiError::MissingMessages)?;

    if raw_messages.is_empty() {
        return Err(ApiError::EmptyMessages);
    }

    let messages = raw_messages
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let message = Message::deserialize(raw).map_err(|e| ApiError::InvalidMessage {
                index,
                reason: e.to_string(),
            })?;
            if message.role.is_empty() {
                return Err(ApiError::InvalidMessage {
                    index,
                    reason: "role must not be empty".to_string(),
                });
            }
            Ok(message)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let stream = body.get("stream").and_then(Value::as_bool).unwrap_or(false);

    Ok(ChatCompletionRequest { messages, stream })
}
