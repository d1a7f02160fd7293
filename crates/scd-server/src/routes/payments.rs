//! Payment line item endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use scd_domain::{NewPaymentLineItem, PaymentLineItem, PaymentUpdate};

use super::{parse_uuid, PeriodQuery};
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /payment-line-items
pub async fn create_payment(
    State(state): State<AppState>,
    Json(request): Json<NewPaymentLineItem>,
) -> ApiResult<(StatusCode, Json<PaymentLineItem>)> {
    let item = state.run(move |s| s.payments.create(request)).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /payment-line-items/:uid
pub async fn get_payment(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<Json<PaymentLineItem>> {
    let item = state.run(move |s| s.payments.get_by_uid(&uid)).await?;
    Ok(Json(item))
}

/// PUT /payment-line-items/:uid
pub async fn update_payment(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(request): Json<PaymentUpdate>,
) -> ApiResult<Json<PaymentLineItem>> {
    let item = state
        .run(move |s| s.payments.update(&uid, request))
        .await?;
    Ok(Json(item))
}

/// Soft delete: writes a void version with amount 0.
/// DELETE /payment-line-items/:uid
pub async fn delete_payment(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<Json<PaymentLineItem>> {
    let item = state.run(move |s| s.payments.delete(&uid)).await?;
    Ok(Json(item))
}

/// POST /payment-line-items/:uid/paid
pub async fn mark_paid(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<Json<PaymentLineItem>> {
    let item = state.run(move |s| s.payments.mark_paid(&uid)).await?;
    Ok(Json(item))
}

/// GET /contractors/:id/payment-line-items?start=&end=
pub async fn get_contractor_payments(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(period): Query<PeriodQuery>,
) -> ApiResult<Json<Vec<PaymentLineItem>>> {
    let contractor_id = parse_uuid("contractor", &id)?;
    let bounds = period.bounds()?;

    let items = state
        .run(move |s| match bounds {
            Some((start, end)) => s
                .payments
                .by_contractor_in_period(contractor_id, start, end),
            None => s.payments.by_contractor(contractor_id),
        })
        .await?;
    Ok(Json(items))
}
