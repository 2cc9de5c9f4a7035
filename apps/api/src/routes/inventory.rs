//! Inventory: items, FIFO movements, kardex, alerts.

use std::sync::Arc;

use aula_core::alerts::{ExpiryAlert, StockAlert};
use aula_core::fifo::Lot;
use aula_core::kardex::KardexEntry;
use aula_core::requests::{RecordInventoryMovementRequest, RegisterItemRequest};
use aula_core::{InventoryItem, MovementReceipt, RequestContext};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::ListParams;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/inventory/items", post(register_item).get(list_items))
        .route("/inventory/items/{id}", get(get_item))
        .route("/inventory/items/{id}/kardex", get(get_kardex))
        .route("/inventory/items/{id}/lots", get(get_lots))
        .route("/inventory/movements", post(record_movement))
        .route("/inventory/alerts", get(get_alerts))
}

/// Stock card of one item.
#[derive(Debug, Serialize, Deserialize)]
pub struct KardexResponse {
    pub item: InventoryItem,
    pub entries: Vec<KardexEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlertsResponse {
    pub low_stock: Vec<StockAlert>,
    pub expiring: Vec<ExpiryAlert>,
}

#[derive(Debug, Default, Deserialize)]
struct AlertParams {
    window_days: Option<i64>,
}

async fn register_item(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<RegisterItemRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<InventoryItem>)> {
    let Json(req) = body?;
    let item = state.db.inventory().register_item(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn list_items(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<InventoryItem>>> {
    let Query(params) = params?;
    let limit = params.limit_or(state.config.default_list_limit);
    Ok(Json(state.db.inventory().list(limit).await?))
}

async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<InventoryItem>> {
    state
        .db
        .inventory()
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("InventoryItem", id))
}

async fn get_kardex(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<KardexResponse>> {
    let (item, kardex) = state.db.inventory().stock_card(&id).await?;
    Ok(Json(KardexResponse {
        item,
        entries: kardex.collect(),
    }))
}

async fn get_lots(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Lot>>> {
    Ok(Json(state.db.inventory().remaining_lots(&id).await?))
}

async fn record_movement(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<RecordInventoryMovementRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MovementReceipt>)> {
    let Json(req) = body?;
    let receipt = state.db.inventory().record_movement(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Low stock plus lots expiring within `window_days` (configured default
/// when absent).
async fn get_alerts(
    State(state): State<Arc<AppState>>,
    params: Result<Query<AlertParams>, QueryRejection>,
) -> ApiResult<Json<AlertsResponse>> {
    let Query(params) = params?;
    let window = params.window_days.unwrap_or(state.config.expiry_window_days);
    if window < 0 {
        return Err(ApiError::BadRequest("window_days must not be negative".to_string()));
    }

    let alerts = state.db.alerts();
    let low_stock = alerts.low_stock().await?;
    let expiring = alerts.expiring_lots(Utc::now().date_naive(), window).await?;

    Ok(Json(AlertsResponse {
        low_stock,
        expiring,
    }))
}
