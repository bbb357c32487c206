use serde::{Serialize, Deserialize};
use std::collections::HashMap;

/// Configuration for an AI provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// "ollama" or "openai"
    pub provider_type: String,

    /// Base URL for API requests. Providers fall back to their public default.
    pub api_base: Option<String>,

    /// Only needed by hosted providers
    pub api_key: Option<String>,

    pub default_model: String,

    #[serde(default)]
    pub sampling: SamplingOptions,

    /// Additional provider-specific configuration options
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl ProviderConfig {
    pub fn new(provider_type: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            provider_type: provider_type.into(),
            api_base: None,
            api_key: None,
            default_model: default_model.into(),
            sampling: SamplingOptions::default(),
            options: HashMap::new(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

/// Decoding parameters. Defaults keep planner output reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub seed: i64,
    pub max_tokens: u32,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            top_p: 1.0,
            seed: 42,
            max_tokens: 256,
        }
    }
}
