// File: olivia-server/src/api/sessions.rs

use axum::extract::{Path, State};
use axum::Json;

use olivia_common::error::Error;
use olivia_common::models::SessionView;

use crate::api::error::{map_error, ApiResult};
use crate::api::AppState;

pub async fn get_session(
    State(ctx): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SessionView> {
    match ctx.catalog.get_session(&id).await.map_err(map_error)? {
        Some(view) => Ok(Json(view)),
        None => Err(map_error(Error::NotFound(format!("Session not found: {}", id)))),
    }
}
