// File: olivia-server/src/api/chat.rs

use axum::extract::State;
use axum::Json;

use olivia_core::services::{TurnReply, TurnRequest};

use crate::api::error::{map_error, ApiResult};
use crate::api::AppState;

/// One conversational turn. Planner and narrator failures never fail the request.
pub async fn chat(
    State(ctx): State<AppState>,
    Json(request): Json<TurnRequest>,
) -> ApiResult<TurnReply> {
    let reply = ctx.dialogue.handle_turn(request).await.map_err(map_error)?;
    Ok(Json(reply))
}
