use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace};

use crate::provider::Provider;
use crate::traits::{ChatMessage, ModelProvider};

/// Timeout-bounded access to the registered model providers.
pub struct AiClient {
    provider: Arc<Provider>,
    default_provider: String,
    timeout: Duration,
}

impl AiClient {
    pub fn new(provider: Arc<Provider>, default_provider: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider,
            default_provider: default_provider.into(),
            timeout,
        }
    }

    pub fn set_default_provider(&mut self, provider: impl Into<String>) {
        self.default_provider = provider.into();
    }

    pub fn provider(&self) -> Arc<Provider> {
        self.provider.clone()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Raw chat completion, bounded by the client timeout.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> anyhow::Result<String> {
        let provider = self.get_provider(None).await?;
        match tokio::time::timeout(self.timeout, provider.chat(messages)).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!(
                "{} did not answer within {:?}",
                provider.name(),
                self.timeout
            )),
        }
    }

    /// Chat completion whose reply must be a JSON object.
    pub async fn chat_json(&self, messages: Vec<ChatMessage>) -> anyhow::Result<Value> {
        let text = self.chat(messages).await?;
        trace!("model reply: {}", text);
        let value = extract_json_object(&text)?;
        debug!("decoded model reply with {} top-level keys", value.as_object().map_or(0, |o| o.len()));
        Ok(value)
    }

    async fn get_provider(&self, name: Option<&str>) -> anyhow::Result<Arc<dyn ModelProvider>> {
        if let Some(provider_name) = name {
            return self.provider.get(provider_name).await
                .ok_or_else(|| anyhow::anyhow!("Provider not found: {}", provider_name));
        }

        if let Some(provider) = self.provider.get(&self.default_provider).await {
            return Ok(provider);
        }

        // Fall back to the first registered provider
        let providers = self.provider.get_all().await;
        let first_provider = providers
            .first()
            .ok_or_else(|| anyhow::anyhow!("No AI providers configured"))?;
        self.provider.get(first_provider).await
            .ok_or_else(|| anyhow::anyhow!("Provider not found: {}", first_provider))
    }
}

/// Models sometimes wrap the object in a markdown fence or add chatter around it;
/// decode the outermost `{...}` span.
pub fn extract_json_object(text: &str) -> anyhow::Result<Value> {
    let trimmed = text.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if end > start => {
            let value: Value = serde_json::from_str(&trimmed[start..=end])?;
            if value.is_object() {
                Ok(value)
            } else {
                Err(anyhow::anyhow!("model reply is not a JSON object"))
            }
        }
        _ => Err(anyhow::anyhow!("model reply contains no JSON object")),
    }
}
