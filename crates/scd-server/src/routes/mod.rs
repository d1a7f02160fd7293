//! Route definitions for the REST API.

mod health;
mod jobs;
mod payments;
mod timelogs;

use axum::{
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Create the main application router.
///
/// `:uid` segments name a specific version and `:id` segments a business
/// entity. Under `/jobs` both are spelled `:id`, since axum needs one name per
/// position; `GET/PUT/DELETE /jobs/:id` and `/jobs/:id/status` take a version uid.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Jobs
        .route("/jobs", post(jobs::create_job).get(jobs::list_active_jobs))
        .route(
            "/jobs/:id",
            get(jobs::get_job).put(jobs::update_job).delete(jobs::delete_job),
        )
        .route("/jobs/:id/status", put(jobs::update_job_status))
        .route("/jobs/:id/history", get(jobs::get_job_history))
        .route("/jobs/:id/as-of", get(jobs::get_job_as_of))
        .route("/companies/:id/jobs", get(jobs::get_company_jobs))
        .route("/contractors/:id/jobs", get(jobs::get_contractor_jobs))
        // Timelogs
        .route("/timelogs", post(timelogs::create_timelog))
        .route(
            "/timelogs/:uid",
            get(timelogs::get_timelog)
                .put(timelogs::update_timelog)
                .delete(timelogs::delete_timelog),
        )
        .route(
            "/contractors/:id/timelogs",
            get(timelogs::get_contractor_timelogs),
        )
        // Payment line items
        .route("/payment-line-items", post(payments::create_payment))
        .route(
            "/payment-line-items/:uid",
            get(payments::get_payment)
                .put(payments::update_payment)
                .delete(payments::delete_payment),
        )
        .route("/payment-line-items/:uid/paid", post(payments::mark_paid))
        .route(
            "/contractors/:id/payment-line-items",
            get(payments::get_contractor_payments),
        )
        // Attach state
        .with_state(state)
}

/// Optional `?start=&end=` window; both bounds or neither.
#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl PeriodQuery {
    pub fn bounds(&self) -> ApiResult<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Ok(Some((start, end))),
            (None, None) => Ok(None),
            _ => Err(ApiError::validation(
                "start and end must be given together",
            )),
        }
    }
}

pub(crate) fn parse_uuid(kind: &str, raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| ApiError::bad_request(format!("invalid {} id '{}': {}", kind, raw, e)))
}

pub use health::*;
pub use jobs::*;
pub use payments::*;
pub use timelogs::*;
