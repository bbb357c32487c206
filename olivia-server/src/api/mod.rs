// File: olivia-server/src/api/mod.rs

pub mod branches;
pub mod calendar;
pub mod chat;
pub mod enroll;
pub mod error;
pub mod search;
pub mod sessions;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::context::ServerContext;

pub type AppState = Arc<ServerContext>;

pub fn router(ctx: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/branches", get(branches::list_branches))
        .route("/calendar", get(calendar::calendar))
        .route("/sessions/{id}", get(sessions::get_session))
        .route("/search", post(search::search))
        .route("/enroll", post(enroll::enroll))
        .route("/enroll/cancel", post(enroll::cancel))
        .route("/chat", post(chat::chat));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Splits `a,b, c` into trimmed, non-empty items.
pub(crate) fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
