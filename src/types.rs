//! OpenAI-compatible wire types.

use serde::{Deserialize, Serialize};

/// A chat message. Request content may be a string or a list of content
/// parts; it is flattened to text on the way in.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// Request-side content before flattening.
#[derive(Deserialize)]
#[serde(untagged)]
enum IncomingContent {
    Text(String),
    Parts(Vec<serde_json::Value>),
}

impl IncomingContent {
    /// Text parts joined by newlines. Parts of any other type (images,
    /// audio, files) carry nothing the tool can read and are skipped.
    fn flatten(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Parts(parts) => parts
                .iter()
                .filter(|part| match part.get("type").and_then(serde_json::Value::as_str) {
                    Some(kind) => kind == "text",
                    None => true,
                })
                .filter_map(|part| part.get("text").and_then(serde_json::Value::as_str))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Incoming {
            role: String,
            content: serde_json::Value,
        }

        let incoming = Incoming::deserialize(deserializer)?;
        let content = IncomingContent::deserialize(incoming.content)
            .map_err(|_| serde::de::Error::custom("content must be a string or an array of content parts"))?;

        Ok(Message {
            role: incoming.role,
            content: content.flatten(),
        })
    }
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// The fields of a chat completion request the bridge acts on. Everything
/// else in the body is accepted and ignored.
#[derive(Debug, Clone)]
pub struct ChatCompletionRequest {
    pub messages: Vec<Message>,
    pub stream: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: &'static str,
    pub created: u64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: UsageReport,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Choice {
    pub index: u32,
    pub message: Message,
    pub finish_reason: String,
}

/// Character-count approximation of token usage. Not billing accurate.
#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn approximate(prompt: &str, completion: &str) -> Self {
        let prompt_tokens = prompt.chars().count() as u64;
        let completion_tokens = completion.chars().count() as u64;
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Usage as computed by the bridge, or as reported verbatim by the tool.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum UsageReport {
    Counted(Usage),
    Reported(serde_json::Value),
}

impl Default for UsageReport {
    fn default() -> Self {
        Self::Counted(Usage::default())
    }
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: &'static str,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChoiceChunk>,
}

#[derive(Debug, Serialize)]
pub struct ChoiceChunk {
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Serialize, Default)]
pub struct Delta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ModelObject {
    pub id: String,
    pub object: &'static str,
    pub created: u64,
    pub owned_by: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ModelsListResponse {
    pub object: &'static str,
    pub data: Vec<ModelObject>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_parts_keep_only_text() {
        let message: Message = serde_json::from_value(json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image_url", "image_url": {"url": "http://x/y.png"}},
                {"type": "text", "text": "second"}
            ]
        }))
        .unwrap();
        assert_eq!(message.content, "first\nsecond");
    }

    #[test]
    fn unknown_part_types_are_skipped() {
        let message: Message = serde_json::from_value(json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "hi"},
                {"type": "input_audio", "input_audio": {"data": "AAA", "format": "wav"}},
                {"type": "file", "file": {"file_id": "f-1"}, "text": "not text"}
            ]
        }))
        .unwrap();
        assert_eq!(message.content, "hi");
    }

    #[test]
    fn non_string_content_is_rejected() {
        let err = serde_json::from_value::<Message>(json!({"role": "user", "content": 42}));
        assert!(err.is_err());
    }

    #[test]
    fn approximate_usage_counts_chars() {
        let usage = Usage::approximate("héllo", "abc");
        assert_eq!(usage, Usage { prompt_tokens: 5, completion_tokens: 3, total_tokens: 8 });
    }

    #[test]
    fn reported_usage_serializes_verbatim() {
        let usage = UsageReport::Reported(json!({"input_tokens": 7}));
        assert_eq!(serde_json::to_value(&usage).unwrap(), json!({"input_tokens": 7}));
        assert_eq!(
            serde_json::to_value(UsageReport::default()).unwrap(),
            json!({"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0})
        );
    }
}
