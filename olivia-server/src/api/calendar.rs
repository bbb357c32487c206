// File: olivia-server/src/api/calendar.rs

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use olivia_common::models::{DateWindow, SessionFilter, SessionView};
use olivia_core::utils::time::window_bounds_utc;

use crate::api::error::{map_error, ApiResult};
use crate::api::{split_list, AppState};

/// Comma-separated lists, e.g. `?start=2025-01-06&end=2025-01-13&buckets=swim,yoga`.
#[derive(Debug, Deserialize)]
pub struct CalendarParams {
    pub start: NaiveDate,
    /// Exclusive; defaults to the day after `start`.
    pub end: Option<NaiveDate>,
    pub branch_ids: Option<String>,
    pub buckets: Option<String>,
    pub tags: Option<String>,
    #[serde(default)]
    pub has_spots: bool,
}

pub async fn calendar(
    State(ctx): State<AppState>,
    Query(params): Query<CalendarParams>,
) -> ApiResult<Vec<SessionView>> {
    let window = match params.end {
        Some(end) => DateWindow::new(params.start, end).map_err(map_error)?,
        None => DateWindow::single_day(params.start),
    };
    let (from, to) = window_bounds_utc(ctx.timezone, &window);
    let filter = SessionFilter::new(from, to)
        .branches(&split_list(params.branch_ids.as_deref()))
        .buckets(&split_list(params.buckets.as_deref()))
        .tags(&split_list(params.tags.as_deref()))
        .require_spots(params.has_spots);

    let sessions = ctx.catalog.list_sessions(&filter).await.map_err(map_error)?;
    debug!("calendar {} => {} sessions", window, sessions.len());
    Ok(Json(sessions))
}
