pub mod client;
pub mod models;
pub mod narrator;
pub mod planner;
pub mod provider;
pub mod traits;

// Re-export public APIs
pub use client::AiClient;
pub use models::{ProviderConfig, SamplingOptions};
pub use narrator::LlmNarrator;
pub use planner::LlmPlanner;
pub use provider::{OllamaProvider, OpenAIProvider, Provider};
pub use traits::{ChatMessage, ModelProvider};
