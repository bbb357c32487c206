pub mod conversation_sweep;

pub use conversation_sweep::spawn_conversation_sweep_task;
