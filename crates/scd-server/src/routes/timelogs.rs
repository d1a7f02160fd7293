//! Timelog endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use scd_domain::{NewTimelog, Timelog, TimelogUpdate};

use super::{parse_uuid, PeriodQuery};
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /timelogs
pub async fn create_timelog(
    State(state): State<AppState>,
    Json(request): Json<NewTimelog>,
) -> ApiResult<(StatusCode, Json<Timelog>)> {
    let timelog = state.run(move |s| s.timelogs.create(request)).await?;
    Ok((StatusCode::CREATED, Json(timelog)))
}

/// GET /timelogs/:uid
pub async fn get_timelog(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<Json<Timelog>> {
    let timelog = state.run(move |s| s.timelogs.get_by_uid(&uid)).await?;
    Ok(Json(timelog))
}

/// PUT /timelogs/:uid
pub async fn update_timelog(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(request): Json<TimelogUpdate>,
) -> ApiResult<Json<Timelog>> {
    let timelog = state
        .run(move |s| s.timelogs.update(&uid, request))
        .await?;
    Ok(Json(timelog))
}

/// Soft delete: writes a zero-length version.
/// DELETE /timelogs/:uid
pub async fn delete_timelog(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<Json<Timelog>> {
    let timelog = state.run(move |s| s.timelogs.delete(&uid)).await?;
    Ok(Json(timelog))
}

/// Latest timelogs; with a period, only captured time recorded in it.
/// GET /contractors/:id/timelogs?start=&end=
pub async fn get_contractor_timelogs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(period): Query<PeriodQuery>,
) -> ApiResult<Json<Vec<Timelog>>> {
    let contractor_id = parse_uuid("contractor", &id)?;
    let bounds = period.bounds()?;

    let timelogs = state
        .run(move |s| match bounds {
            Some((start, end)) => s
                .timelogs
                .by_contractor_in_period(contractor_id, start, end),
            None => s.timelogs.by_contractor(contractor_id),
        })
        .await?;
    Ok(Json(timelogs))
}
