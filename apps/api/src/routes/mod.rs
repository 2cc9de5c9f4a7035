//! HTTP routes.
//!
//! ```text
//! /health                                  public
//! /cash-sessions ...  /cash-movements      bearer token
//! /receipts ...                            bearer token
//! /inventory ...                           bearer token
//! ```

use std::sync::Arc;

use axum::{middleware, Router};
use serde::Deserialize;

use crate::auth::require_auth;
use crate::state::AppState;

pub mod cash_movements;
pub mod cash_sessions;
pub mod health;
pub mod inventory;
pub mod receipts;

/// Hard cap on rows returned by list endpoints.
pub const MAX_LIST_LIMIT: i64 = 500;

/// Build the full router.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .merge(cash_sessions::router())
        .merge(cash_movements::router())
        .merge(receipts::router())
        .merge(inventory::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(health::router())
        .merge(protected)
        .with_state(state)
}

/// `?limit=` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

impl ListParams {
    pub fn limit_or(&self, default: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, MAX_LIST_LIMIT)
    }
}
