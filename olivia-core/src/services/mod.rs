// File: src/services/mod.rs

pub mod dialogue;
pub mod enrollment_service;
pub mod search;

pub use dialogue::{DialogueConfig, DialogueManager, TurnReply, TurnRequest};
pub use enrollment_service::EnrollmentService;
pub use search::AvailabilitySearch;
