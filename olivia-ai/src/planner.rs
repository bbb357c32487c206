use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use olivia_common::error::Error;
use olivia_common::models::{Plan, PlannerContext, TurnRole};
use olivia_common::traits::PlannerGateway;

use crate::client::AiClient;
use crate::traits::ChatMessage;

/// Prior turns forwarded to the model, oldest first.
const HISTORY_TURNS: usize = 6;

/// Planner backed by a chat model that answers with a JSON plan.
pub struct LlmPlanner {
    client: Arc<AiClient>,
}

impl LlmPlanner {
    pub fn new(client: Arc<AiClient>) -> Self {
        Self { client }
    }
}

pub fn planner_messages(ctx: &PlannerContext) -> Vec<ChatMessage> {
    let branches: Vec<_> = ctx
        .branches
        .iter()
        .map(|b| json!({"id": b.id, "name": b.name, "aliases": b.aliases}))
        .collect();
    let offered: Vec<_> = ctx
        .offered
        .iter()
        .take(5)
        .map(|o| json!({"option": o.ordinal, "session_id": o.session_id, "label": o.label}))
        .collect();
    let pretty = |v: &serde_json::Value| serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string());

    let system = format!(
        r#"You are Olivia, a YMCA schedule assistant. Return ONLY JSON.

Current time: {now}
Today: {today}
Default "this week": {week_start}..{week_end}

Branches (use exact ids):
{branches}

UI context:
{ui}

Recent suggested options:
{offered}

Pick ONE action:
- "find_sessions"
- "enroll"
- "clarify"

Schema:
{{
  "action": "find_sessions" | "enroll" | "clarify",
  "params": {{
    "date_start": "YYYY-MM-DD or null",
    "date_end": "YYYY-MM-DD (exclusive) or null",
    "branch_ids": ["branch_id"] or null,
    "buckets": ["swim","gym","sports","kids","run","strength","mind_body"] or null,
    "tags": ["hiit","yoga","swim", ...] or null,
    "has_spots": true/false,
    "limit": 1-5
  }},
  "enroll": {{
    "session_id": "string or null",
    "option": 1-5 or null,
    "member_id": "string or null"
  }},
  "follow_up_question": "string or null"
}}

Rules:
- date_end is exclusive: a single day D is D..D+1.
- If the user says "my Y", the UI has no selected_branch_ids and you can't infer a branch confidently, use action="clarify".
- For enroll, use option if the user says "option 2"."#,
        now = ctx.now.to_rfc3339(),
        today = ctx.today,
        week_start = ctx.default_window.start,
        week_end = ctx.default_window.end,
        branches = pretty(&json!(branches)),
        ui = pretty(&json!(ctx.ui)),
        offered = pretty(&json!(offered)),
    );

    let mut messages = vec![ChatMessage::system(system)];
    let skip = ctx.history.len().saturating_sub(HISTORY_TURNS);
    for turn in ctx.history.iter().skip(skip) {
        messages.push(match turn.role {
            TurnRole::User => ChatMessage::user(turn.content.clone()),
            TurnRole::Assistant => ChatMessage::assistant(turn.content.clone()),
        });
    }
    messages.push(ChatMessage::user(ctx.message.trim()));
    messages
}

#[async_trait]
impl PlannerGateway for LlmPlanner {
    async fn plan(&self, ctx: &PlannerContext) -> Result<Plan, Error> {
        let value = self
            .client
            .chat_json(planner_messages(ctx))
            .await
            .map_err(|e| {
                warn!("planner call failed for conversation {}: {:#}", ctx.conversation_id, e);
                Error::ExternalCapability(format!("planner: {e:#}"))
            })?;
        Ok(Plan::from_planner_value(&value))
    }
}
