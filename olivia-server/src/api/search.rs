// File: olivia-server/src/api/search.rs

use axum::extract::State;
use axum::Json;

use olivia_common::models::{SearchOutcome, SearchQuery};

use crate::api::error::{map_error, ApiResult};
use crate::api::AppState;

pub async fn search(
    State(ctx): State<AppState>,
    Json(query): Json<SearchQuery>,
) -> ApiResult<SearchOutcome> {
    let outcome = ctx.search.search(&query).await.map_err(map_error)?;
    Ok(Json(outcome))
}
