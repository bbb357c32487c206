// File: olivia-server/src/api/error.rs

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use olivia_common::error::Error;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn map_error(err: Error) -> ApiError {
    let (status, code) = match &err {
        Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        Error::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        Error::Validation(_) | Error::Parse(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("request failed: {:?}", err);
    }
    (
        status,
        Json(ErrorBody {
            code: code.to_string(),
            message: err.to_string(),
        }),
    )
}
