//! Receipts: issue, pay (idempotent), cancel, refund.
//!
//! ## Idempotent payment
//! ```text
//! POST /receipts/{id}/pay        Idempotency-Key: k-1   → 200, payment P
//! POST /receipts/{id}/pay        Idempotency-Key: k-1   → 200, payment P
//!                                                         Idempotent-Replayed: true
//! POST /receipts/{other}/pay     Idempotency-Key: k-1   → 409
//! POST /receipts/{id}/pay        (no key)               → 400
//! ```

use std::sync::Arc;

use aula_core::requests::{IssueReceiptRequest, PayReceiptRequest, ReasonRequest};
use aula_core::{Payment, Receipt, ReceiptStatus, RequestContext};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const IDEMPOTENCY_KEY: HeaderName = HeaderName::from_static("idempotency-key");
pub const IDEMPOTENT_REPLAYED: HeaderName = HeaderName::from_static("idempotent-replayed");

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/receipts", post(issue_receipt).get(list_receipts))
        .route("/receipts/{id}", get(get_receipt))
        .route("/receipts/{id}/payment", get(get_payment))
        .route("/receipts/{id}/pay", post(pay_receipt))
        .route("/receipts/{id}/cancel", post(cancel_receipt))
        .route("/receipts/{id}/refund", post(refund_receipt))
}

#[derive(Debug, Default, Deserialize)]
struct ReceiptFilter {
    status: Option<ReceiptStatus>,
    limit: Option<i64>,
}

async fn issue_receipt(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<IssueReceiptRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Receipt>)> {
    let Json(req) = body?;
    let receipt = state.db.receipts().issue(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn list_receipts(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ReceiptFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<Receipt>>> {
    let Query(filter) = params?;
    let limit = super::ListParams { limit: filter.limit }.limit_or(state.config.default_list_limit);
    Ok(Json(state.db.receipts().list(filter.status, limit).await?))
}

async fn get_receipt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Receipt>> {
    state
        .db
        .receipts()
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Receipt", id))
}

async fn get_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Payment>> {
    state
        .db
        .receipts()
        .get_payment(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Payment", id))
}

async fn pay_receipt(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<PayReceiptRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = body?;

    // A missing or unreadable header reaches the repository as an empty key,
    // which it rejects before touching the database.
    let key = headers
        .get(&IDEMPOTENCY_KEY)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let outcome = state.db.receipts().pay(&ctx, &id, req, key).await?;

    let mut response = Json(outcome.payment).into_response();
    if outcome.replayed {
        response
            .headers_mut()
            .insert(IDEMPOTENT_REPLAYED, HeaderValue::from_static("true"));
    }
    Ok(response)
}

async fn cancel_receipt(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    body: Result<Json<ReasonRequest>, JsonRejection>,
) -> ApiResult<Json<Receipt>> {
    let Json(req) = body?;
    Ok(Json(state.db.receipts().cancel(&ctx, &id, req).await?))
}

async fn refund_receipt(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    body: Result<Json<ReasonRequest>, JsonRejection>,
) -> ApiResult<Json<Receipt>> {
    let Json(req) = body?;
    Ok(Json(state.db.receipts().refund(&ctx, &id, req).await?))
}
