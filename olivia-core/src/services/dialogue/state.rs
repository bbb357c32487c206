// File: olivia-core/src/services/dialogue/state.rs

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use olivia_common::models::{ChatTurn, DateWindow, OfferedOption, SuggestedSession, TurnRole};

use crate::services::dialogue::render;

/// Search parameters stashed while waiting for the user to name a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSearch {
    pub original_message: String,
    pub window: DateWindow,
    pub buckets: Vec<String>,
    pub tags: Vec<String>,
    pub require_spots: bool,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialoguePhase {
    Ready,
    AwaitingBranchClarification { pending: PendingSearch },
    AwaitingEnrollmentTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Ready,
    AwaitingBranchClarification,
    AwaitingEnrollmentTarget,
}

impl DialoguePhase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            DialoguePhase::Ready => PhaseKind::Ready,
            DialoguePhase::AwaitingBranchClarification { .. } => PhaseKind::AwaitingBranchClarification,
            DialoguePhase::AwaitingEnrollmentTarget => PhaseKind::AwaitingEnrollmentTarget,
        }
    }
}

/// Per-conversation memory.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub conversation_id: String,
    history: VecDeque<ChatTurn>,
    history_cap: usize,
    pub phase: DialoguePhase,
    last_offered: Vec<OfferedOption>,
    greeted: bool,
    pub created_at: DateTime<Utc>,
    pub last_touched: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(conversation_id: impl Into<String>, history_cap: usize, now: DateTime<Utc>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            history: VecDeque::with_capacity(history_cap),
            history_cap: history_cap.max(1),
            phase: DialoguePhase::Ready,
            last_offered: Vec::new(),
            greeted: false,
            created_at: now,
            last_touched: now,
        }
    }

    pub fn push_turn(&mut self, turn: ChatTurn) {
        if turn.role == TurnRole::Assistant {
            self.greeted = true;
        }
        self.history.push_back(turn);
        while self.history.len() > self.history_cap {
            self.history.pop_front();
        }
    }

    pub fn history(&self) -> Vec<ChatTurn> {
        self.history.iter().cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// True until the first assistant reply has been recorded.
    pub fn needs_greeting(&self) -> bool {
        !self.greeted
    }

    /// Replaces the offered options with `results`, numbered from 1.
    pub fn offer(&mut self, results: &[SuggestedSession], tz: chrono_tz::Tz) {
        self.last_offered = results
            .iter()
            .enumerate()
            .map(|(i, s)| OfferedOption {
                ordinal: i + 1,
                session_id: s.session.session_id.clone(),
                label: render::option_label(&s.session, tz),
            })
            .collect();
    }

    pub fn last_offered(&self) -> &[OfferedOption] {
        &self.last_offered
    }

    /// Exact ordinal lookup; anything outside the offered set is `None`.
    pub fn resolve_ordinal(&self, ordinal: usize) -> Option<&OfferedOption> {
        self.last_offered.iter().find(|o| o.ordinal == ordinal)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_touched = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_a_bounded_ring() {
        let mut state = ConversationState::new("c1", 3, Utc::now());
        for i in 0..5 {
            state.push_turn(ChatTurn::user(format!("m{i}")));
        }
        let contents: Vec<String> = state.history().into_iter().map(|t| t.content).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
        assert!(state.needs_greeting());

        state.push_turn(ChatTurn::assistant("hi"));
        assert!(!state.needs_greeting());
        assert_eq!(state.history_len(), 3);
    }

    #[test]
    fn ordinals_never_clamp() {
        let state = ConversationState::new("c1", 12, Utc::now());
        assert!(state.resolve_ordinal(1).is_none());
        assert!(state.resolve_ordinal(0).is_none());
    }
}
