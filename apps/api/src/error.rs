//! Error types for the API, and their HTTP mapping.
//!
//! ```text
//! CoreError::Validation        → 400 validation_error
//! missing / bad bearer token   → 401 unauthenticated
//! CoreError::Forbidden         → 403 forbidden
//! NotFound                     → 404 not_found
//! Conflict / unique violation  → 409 conflict
//! InvalidState                 → 422 invalid_state
//! InsufficientStock            → 422 insufficient_stock
//! storage failures             → 500 storage_error (logged, not returned)
//! ```

use aula_core::CoreError;
use aula_db::DbError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Unauthenticated(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ApiError::NotFound {
            entity,
            id: id.into(),
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ApiError::Db(err) => match err {
                DbError::Domain(core) => match core {
                    CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                    CoreError::Forbidden { .. } => (StatusCode::FORBIDDEN, "forbidden"),
                    CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
                    CoreError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
                    CoreError::InvalidState { .. } => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "invalid_state")
                    }
                    CoreError::InsufficientStock { .. } => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_stock")
                    }
                },
                DbError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
                DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                    (StatusCode::CONFLICT, "conflict")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            },
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (
            status,
            Json(ErrorBody {
                code: code.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Db(DbError::Domain(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aula_core::ValidationError;

    fn status(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_domain_errors_map_to_statuses() {
        assert_eq!(
            status(CoreError::Validation(ValidationError::required("concept")).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(CoreError::Forbidden { permission: "receipts.pay".into() }.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(CoreError::conflict("key reused").into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(CoreError::invalid_state("Receipt", "r-1", "PAID", "pay").into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(
                CoreError::InsufficientStock {
                    code: "PAPEL-A4".into(),
                    available: 3,
                    requested: 5,
                }
                .into()
            ),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(ApiError::Unauthenticated("missing token".into())),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_storage_errors_are_opaque() {
        let response = ApiError::Db(DbError::QueryFailed("disk I/O error".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
