// File: olivia-server/src/api/branches.rs

use axum::extract::State;
use axum::Json;

use olivia_common::models::Branch;

use crate::api::AppState;

pub async fn list_branches(State(ctx): State<AppState>) -> Json<Vec<Branch>> {
    Json(ctx.reference.branches().to_vec())
}
