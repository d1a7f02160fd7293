//! Job endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use scd_domain::{Job, JobStatus, NewJob};
use serde::Deserialize;

use super::parse_uuid;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateJobRequest {
    pub title: String,
    pub rate: f64,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: JobStatus,
}

#[derive(Debug, Deserialize)]
pub struct ActiveJobsQuery {
    pub min_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct AsOfQuery {
    pub at: DateTime<Utc>,
}

/// Create version 1 of a job.
/// POST /jobs
pub async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<NewJob>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    let job = state.run(move |s| s.jobs.create_job(request)).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// Latest active jobs, optionally only those paying at least `min_rate`.
/// GET /jobs
pub async fn list_active_jobs(
    State(state): State<AppState>,
    Query(query): Query<ActiveJobsQuery>,
) -> ApiResult<Json<Vec<Job>>> {
    let jobs = state
        .run(move |s| match query.min_rate {
            Some(min_rate) => s.jobs.high_value_active_jobs(min_rate),
            None => s.jobs.all_active_jobs(),
        })
        .await?;
    Ok(Json(jobs))
}

/// One job version.
/// GET /jobs/:id
pub async fn get_job(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<Json<Job>> {
    let job = state.run(move |s| s.jobs.get_by_uid(&uid)).await?;
    Ok(Json(job))
}

/// New version with a changed title and rate.
/// PUT /jobs/:id (`:id` is a version uid)
pub async fn update_job(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(request): Json<UpdateJobRequest>,
) -> ApiResult<Json<Job>> {
    let job = state
        .run(move |s| s.jobs.update_job(&uid, request.title, request.rate))
        .await?;
    Ok(Json(job))
}

/// PUT /jobs/:id/status?status=...
pub async fn update_job_status(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<Job>> {
    let job = state
        .run(move |s| s.jobs.update_status(&uid, query.status))
        .await?;
    Ok(Json(job))
}

/// Soft delete: writes a version with status `deleted`.
/// DELETE /jobs/:id
pub async fn delete_job(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<Json<Job>> {
    let job = state.run(move |s| s.jobs.delete_job(&uid)).await?;
    Ok(Json(job))
}

/// GET /jobs/:id/history
pub async fn get_job_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Job>>> {
    let history = state.run(move |s| s.jobs.job_history(&id)).await?;
    Ok(Json(history))
}

/// The version current at `at`.
/// GET /jobs/:id/as-of?at=...
pub async fn get_job_as_of(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<AsOfQuery>,
) -> ApiResult<Json<Job>> {
    let job = state.run(move |s| s.jobs.job_as_of(&id, query.at)).await?;
    Ok(Json(job))
}

/// GET /companies/:id/jobs
pub async fn get_company_jobs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Job>>> {
    let company_id = parse_uuid("company", &id)?;
    let jobs = state
        .run(move |s| s.jobs.active_jobs_by_company(company_id))
        .await?;
    Ok(Json(jobs))
}

/// GET /contractors/:id/jobs
pub async fn get_contractor_jobs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Job>>> {
    let contractor_id = parse_uuid("contractor", &id)?;
    let jobs = state
        .run(move |s| s.jobs.jobs_by_contractor(contractor_id))
        .await?;
    Ok(Json(jobs))
}
