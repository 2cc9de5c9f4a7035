//! Cash desk sessions: open, inspect, audit, close.

use std::sync::Arc;

use aula_core::requests::{CloseSessionRequest, OpenSessionRequest};
use aula_core::{CashMovement, CashSession, RequestContext, SessionAudit, SessionWithMovements};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cash-sessions", post(open_session))
        .route("/cash-sessions/current", get(current_session))
        .route("/cash-sessions/{id}", get(get_session))
        .route("/cash-sessions/{id}/movements", get(list_movements))
        .route("/cash-sessions/{id}/audit", get(audit_session))
        .route("/cash-sessions/{id}/close", post(close_session))
}

async fn open_session(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<OpenSessionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CashSession>)> {
    let Json(req) = body?;
    let session = state.db.cash_sessions().open(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// The caller's own OPEN session, or `null` when they have none.
async fn current_session(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
) -> ApiResult<Json<Option<SessionWithMovements>>> {
    let current = state.db.cash_sessions().get_current(ctx.actor_id()).await?;
    Ok(Json(current))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionWithMovements>> {
    Ok(Json(state.db.cash_sessions().get_with_movements(&id).await?))
}

async fn list_movements(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<CashMovement>>> {
    Ok(Json(state.db.cash_sessions().list_movements(&id).await?))
}

async fn audit_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionAudit>> {
    Ok(Json(state.db.cash_sessions().audit(&id).await?))
}

/// `POST /cash-sessions/{id}/close?final_amount=12500&closing_notes=...`
async fn close_session(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    params: Result<Query<CloseSessionRequest>, QueryRejection>,
) -> ApiResult<Json<CashSession>> {
    let Query(req) = params?;
    let session = state.db.cash_sessions().close(&ctx, &id, req).await?;
    Ok(Json(session))
}
