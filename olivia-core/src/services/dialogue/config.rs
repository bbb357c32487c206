// File: olivia-core/src/services/dialogue/config.rs

use serde::{Deserialize, Serialize};

pub const DEFAULT_GREETING: &str = "This is Olivia with the YMCA! How may I help you?";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// Turns kept per conversation; oldest go first.
    pub history_cap: usize,
    pub default_limit: usize,
    pub max_limit: usize,
    pub default_member_id: String,
    /// Branch used for front-desk staff when nothing else is selected.
    pub front_desk_branch_id: Option<String>,
    pub greeting: String,
    /// Phrases meaning "the member's own branch"; a request using one needs a branch.
    pub home_branch_phrases: Vec<String>,
    /// Organization words ignored when matching branch names.
    pub noise_tokens: Vec<String>,
    pub default_require_spots: bool,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            history_cap: 12,
            default_limit: 5,
            max_limit: 10,
            default_member_id: "demo_member".to_string(),
            front_desk_branch_id: Some("campbell_county".to_string()),
            greeting: DEFAULT_GREETING.to_string(),
            home_branch_phrases: vec![
                "my y".to_string(),
                "my ymca".to_string(),
                "my branch".to_string(),
                "my gym".to_string(),
            ],
            noise_tokens: vec!["ymca".to_string()],
            default_require_spots: true,
        }
    }
}
