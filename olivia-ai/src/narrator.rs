use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use olivia_common::error::Error;
use olivia_common::models::NarrationRequest;
use olivia_common::traits::NarratorGateway;

use crate::client::AiClient;
use crate::traits::ChatMessage;

const NARRATOR_SYSTEM_PROMPT: &str = r#"Return ONLY JSON:
{"assistant_message":"..."}
Keep it short. If listing sessions, label them as options 1..N and include open spots.
IMPORTANT: Do NOT change any numbers (capacity/enrolled/remaining). Copy them exactly from the tool payload. Do not recalculate.
If the payload includes search_meta, be friendly and human:
- Always prioritize options at the member's primary branch first.
- If none on the requested day, gently mention options on other days at their Y.
- If suggesting nearby branches, mention approx drive minutes ONLY if drive_minutes is provided.
- Ask permission before expanding further if you already provided some options."#;

pub struct LlmNarrator {
    client: Arc<AiClient>,
}

impl LlmNarrator {
    pub fn new(client: Arc<AiClient>) -> Self {
        Self { client }
    }
}

pub fn narrator_messages(request: &NarrationRequest) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(NARRATOR_SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "User: {}\n\nAction: {}\n\nTool result:\n{}",
            request.user_message,
            request.action.as_str(),
            request.payload
        )),
    ]
}

#[async_trait]
impl NarratorGateway for LlmNarrator {
    async fn narrate(&self, request: &NarrationRequest) -> Result<String, Error> {
        let value = self
            .client
            .chat_json(narrator_messages(request))
            .await
            .map_err(|e| {
                warn!("narrator call failed: {:#}", e);
                Error::ExternalCapability(format!("narrator: {e:#}"))
            })?;

        value
            .get("assistant_message")
            .and_then(|m| m.as_str())
            .map(|m| m.trim().to_string())
            .ok_or_else(|| Error::ExternalCapability("narrator reply has no assistant_message".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use olivia_common::models::PlanAction;
    use serde_json::json;

    use crate::provider::Provider;
    use crate::traits::ModelProvider;

    struct Canned(&'static str);

    #[async_trait]
    impl ModelProvider for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn chat(&self, _messages: Vec<ChatMessage>) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    async fn narrator(reply: &'static str) -> LlmNarrator {
        let registry = Arc::new(Provider::new());
        registry.register(Canned(reply)).await;
        LlmNarrator::new(Arc::new(AiClient::new(registry, "canned", Duration::from_secs(1))))
    }

    fn request() -> NarrationRequest {
        NarrationRequest {
            action: PlanAction::Enroll,
            user_message: "option 1".into(),
            payload: json!({"enroll_result": {"remaining": 3}}),
        }
    }

    #[test]
    fn payload_is_embedded_verbatim() {
        let messages = narrator_messages(&request());
        assert!(messages[1].content.contains(r#"{"enroll_result":{"remaining":3}}"#));
        assert!(messages[1].content.contains("Action: enroll"));
    }

    #[tokio::test]
    async fn returns_trimmed_message() {
        let narrator = narrator(r#"{"assistant_message": "  You're in!  "}"#).await;
        assert_eq!(narrator.narrate(&request()).await.unwrap(), "You're in!");
    }

    #[tokio::test]
    async fn missing_message_is_an_external_error() {
        let narrator = narrator(r#"{"text": "hi"}"#).await;
        assert!(matches!(narrator.narrate(&request()).await, Err(Error::ExternalCapability(_))));
    }
}
