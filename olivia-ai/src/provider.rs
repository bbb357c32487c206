use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::models::ProviderConfig;
use crate::traits::{ChatMessage, ModelProvider};

fn format_messages(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|msg| {
            json!({
                "role": msg.role,
                "content": msg.content
            })
        })
        .collect()
}

/// Local Ollama server, `/api/chat` with streaming disabled
pub struct OllamaProvider {
    config: ProviderConfig,
    client: Client,
}

impl OllamaProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::new();
        Self { config, client }
    }

    fn api_base(&self) -> String {
        self.config
            .api_base
            .clone()
            .unwrap_or_else(|| "http://127.0.0.1:11434".to_string())
            .trim_end_matches('/')
            .to_string()
    }
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> anyhow::Result<String> {
        let sampling = self.config.sampling;
        let request_payload = json!({
            "model": self.config.default_model,
            "messages": format_messages(&messages),
            "stream": false,
            "format": "json",
            "options": {
                "temperature": sampling.temperature,
                "top_p": sampling.top_p,
                "seed": sampling.seed,
                "num_predict": sampling.max_tokens,
            }
        });

        let url = format!("{}/api/chat", self.api_base());
        tracing::debug!("Making API call to {}", url);

        let response = self.client
            .post(url)
            .json(&request_payload)
            .send()
            .await?
            .error_for_status()?;

        let data = response.json::<Value>().await?;

        if let Some(error) = data.get("error").and_then(|e| e.as_str()) {
            return Err(anyhow::anyhow!("API error: {}", error));
        }

        let content = data
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| anyhow::anyhow!("Response missing 'message.content'"))?
            .to_string();

        Ok(content)
    }
}

/// OpenAI-compatible `/chat/completions`
pub struct OpenAIProvider {
    config: ProviderConfig,
    client: Client,
}

impl OpenAIProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::new();
        Self { config, client }
    }
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> anyhow::Result<String> {
        let api_base = self.config.api_base.clone().unwrap_or_else(|| {
            "https://api.openai.com/v1".to_string()
        });
        let sampling = self.config.sampling;

        let request_payload = json!({
            "model": self.config.default_model,
            "messages": format_messages(&messages),
            "response_format": { "type": "json_object" },
            "temperature": sampling.temperature,
            "top_p": sampling.top_p,
            "seed": sampling.seed,
            "max_tokens": sampling.max_tokens,
        });

        tracing::debug!("Making API call to {}/chat/completions", api_base);

        let mut request = self.client
            .post(format!("{}/chat/completions", api_base.trim_end_matches('/')))
            .json(&request_payload);
        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        // Get the raw response text first for better error handling
        let response_text = request.send().await?.text().await?;
        tracing::trace!("Raw API response: {}", response_text);

        let data = serde_json::from_str::<Value>(&response_text)
            .map_err(|e| anyhow::anyhow!("API returned non-JSON response: {}", e))?;

        if let Some(error) = data.get("error") {
            let error_message = error.get("message").and_then(|m| m.as_str()).unwrap_or("Unknown error");
            return Err(anyhow::anyhow!("API error: {}", error_message));
        }

        let choices = data
            .get("choices")
            .and_then(|c| c.as_array())
            .ok_or_else(|| anyhow::anyhow!("Response missing 'choices' array"))?;

        let first = choices
            .first()
            .ok_or_else(|| anyhow::anyhow!("No completions returned"))?;

        let content = first
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| anyhow::anyhow!("Response message missing 'content'"))?
            .to_string();

        Ok(content)
    }
}

/// Registry of named providers
pub struct Provider {
    providers: Arc<RwLock<HashMap<String, Arc<dyn ModelProvider>>>>,
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider {
    pub fn new() -> Self {
        Self {
            providers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register<P: ModelProvider + 'static>(&self, provider: P) {
        self.register_arc(Arc::new(provider)).await;
    }

    pub async fn register_arc(&self, provider: Arc<dyn ModelProvider>) {
        let mut providers = self.providers.write().await;
        providers.insert(provider.name().to_string(), provider);
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn ModelProvider>> {
        let providers = self.providers.read().await;
        providers.get(name).cloned()
    }

    /// Registered names, sorted
    pub async fn get_all(&self) -> Vec<String> {
        let providers = self.providers.read().await;
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Builds the provider named by `config.provider_type`.
    pub fn from_config(config: ProviderConfig) -> anyhow::Result<Arc<dyn ModelProvider>> {
        match config.provider_type.to_lowercase().as_str() {
            "ollama" => Ok(Arc::new(OllamaProvider::new(config))),
            "openai" => Ok(Arc::new(OpenAIProvider::new(config))),
            other => Err(anyhow::anyhow!("Unknown provider type: {}", other)),
        }
    }
}
