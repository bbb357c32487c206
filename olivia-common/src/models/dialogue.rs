// File: olivia-common/src/models/dialogue.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::branch::Branch;
use crate::models::plan::PlanAction;
use crate::models::search::DateWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserGroup {
    Member,
    FrontDesk,
}

/// Filters the client UI already has selected when the message is sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiContext {
    #[serde(default)]
    pub selected_branch_ids: Vec<String>,
    #[serde(default)]
    pub selected_buckets: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub only_has_spots: Option<bool>,
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default)]
    pub user_group: Option<UserGroup>,
    #[serde(default)]
    pub default_branch_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: TurnRole::User, content: content.into(), at: Utc::now() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: TurnRole::Assistant, content: content.into(), at: Utc::now() }
    }
}

/// Entry of the most recently offered result list. Ordinals start at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferedOption {
    pub ordinal: usize,
    pub session_id: String,
    pub label: String,
}

/// Everything the planner gets to see for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerContext {
    pub conversation_id: String,
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
    pub default_window: DateWindow,
    pub branches: Vec<Branch>,
    pub history: Vec<ChatTurn>,
    pub ui: UiContext,
    pub message: String,
    pub offered: Vec<OfferedOption>,
}

/// Raw result handed to the narrator for phrasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationRequest {
    pub action: PlanAction,
    pub user_message: String,
    pub payload: Value,
}
