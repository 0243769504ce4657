mod factory;
mod open_ai;
mod workers_ai;

pub use factory::ProviderFactory;
pub use open_ai::OpenAIProvider;
pub use workers_ai::WorkersAiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{0}")]
    Config(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider answered with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    /// User turn carrying text and one inline image (`data:` URI).
    pub fn user_with_image(text: impl Into<String>, data_uri: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: data_uri.into(),
                    },
                },
            ]),
        }
    }
}

/// One model invocation, in either wire style.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelRequest {
    Messages(Vec<ChatMessage>),
    Instructions {
        instructions: String,
        input: Vec<ChatMessage>,
    },
}

/// Converts messages to the responses-API input shape, where content parts
/// are typed `input_text` / `input_image`.
pub(crate) fn responses_input(messages: &[ChatMessage]) -> Value {
    let items: Vec<Value> = messages
        .iter()
        .map(|message| {
            let content = match &message.content {
                MessageContent::Text(text) => Value::String(text.clone()),
                MessageContent::Parts(parts) => Value::Array(
                    parts
                        .iter()
                        .map(|part| match part {
                            ContentPart::Text { text } => {
                                serde_json::json!({"type": "input_text", "text": text})
                            }
                            ContentPart::ImageUrl { image_url } => {
                                serde_json::json!({"type": "input_image", "image_url": image_url.url})
                            }
                        })
                        .collect(),
                ),
            };
            serde_json::json!({"role": message.role, "content": content})
        })
        .collect();
    Value::Array(items)
}

/// Unified trait for all generative model providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai", "workers_ai")
    fn provider_name(&self) -> &str;

    /// Runs the model and returns its response envelope. Providers whose
    /// native envelope is not one of the shapes `ai::response` reads reduce
    /// it to the plain generated string.
    async fn run(&self, request: &ModelRequest) -> Result<Value, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_message_wire_shape() {
        let message = ChatMessage::user_with_image("Read this", "data:image/png;base64,AAAA");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "Read this"},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}}
                ]
            })
        );
    }

    #[test]
    fn test_responses_input_shape() {
        let input = responses_input(&[
            ChatMessage::user("plain"),
            ChatMessage::user_with_image("look", "data:image/jpeg;base64,BBBB"),
        ]);
        assert_eq!(input[0], json!({"role": "user", "content": "plain"}));
        assert_eq!(
            input[1]["content"][1],
            json!({"type": "input_image", "image_url": "data:image/jpeg;base64,BBBB"})
        );
    }

    #[test]
    fn test_history_deserializes() {
        let history: Vec<ChatMessage> = serde_json::from_value(json!([
            {"role": "user", "content": "Something with leeks"},
            {"role": "assistant", "content": "How about a tart?"}
        ]))
        .unwrap();
        assert_eq!(history[1], ChatMessage::assistant("How about a tart?"));
    }
}
