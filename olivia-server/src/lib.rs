//! olivia-server: HTTP surface for the scheduling assistant.

pub mod api;
pub mod args;
pub mod context;
pub mod gateways;

pub use args::Args;
pub use context::ServerContext;
