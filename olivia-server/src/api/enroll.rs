// File: olivia-server/src/api/enroll.rs

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use olivia_common::models::{CancellationReceipt, EnrollmentReceipt};

use crate::api::error::{map_error, ApiResult};
use crate::api::AppState;

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub session_id: String,
    /// Falls back to the configured demo member.
    #[serde(default)]
    pub member_id: Option<String>,
}

impl EnrollRequest {
    fn member<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.member_id
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback)
    }
}

pub async fn enroll(
    State(ctx): State<AppState>,
    Json(req): Json<EnrollRequest>,
) -> ApiResult<EnrollmentReceipt> {
    let member_id = req.member(&ctx.dialogue.config().default_member_id);
    let receipt = ctx
        .enrollment
        .enroll(&req.session_id, member_id)
        .await
        .map_err(map_error)?;
    Ok(Json(receipt))
}

pub async fn cancel(
    State(ctx): State<AppState>,
    Json(req): Json<EnrollRequest>,
) -> ApiResult<CancellationReceipt> {
    let member_id = req.member(&ctx.dialogue.config().default_member_id);
    let receipt = ctx
        .enrollment
        .cancel(&req.session_id, member_id)
        .await
        .map_err(map_error)?;
    Ok(Json(receipt))
}
