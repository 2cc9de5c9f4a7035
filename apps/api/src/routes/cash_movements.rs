use std::sync::Arc;

use aula_core::requests::RecordCashMovementRequest;
use aula_core::{CashMovement, RequestContext};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/cash-movements", post(record_movement))
}

async fn record_movement(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<RecordCashMovementRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CashMovement>)> {
    let Json(req) = body?;
    let movement = state.db.cash_movements().record_movement(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}
