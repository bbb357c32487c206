// File: olivia-core/src/services/dialogue/mod.rs

pub mod branch_resolver;
pub mod config;
pub mod dates;
pub mod manager;
pub mod render;
pub mod state;
pub mod store;

pub use branch_resolver::{BranchMatch, BranchResolver};
pub use config::DialogueConfig;
pub use manager::{DialogueManager, TurnReply, TurnRequest};
pub use state::{ConversationState, DialoguePhase, PendingSearch, PhaseKind};
pub use store::{ConversationHandle, ConversationStore, InMemoryConversationStore};
