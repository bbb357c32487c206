use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

/// A backend that can run a chat completion.
///
/// Providers ask the model for a JSON object and return the raw message text;
/// decoding happens in [`crate::client::AiClient`].
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Registry key, e.g. "ollama"
    fn name(&self) -> &str;

    async fn chat(&self, messages: Vec<ChatMessage>) -> anyhow::Result<String>;
}
