//! JWT authentication module.
//!
//! Tokens are issued by the school's auth service and signed with a shared
//! HMAC secret. This module validates them and turns the claims into the
//! [`RequestContext`] every repository call takes.
//!
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ▼
//! require_auth ──► JwtManager::validate_access_token ──► Claims { sub, perms }
//!        │
//!        ▼
//! request.extensions: RequestContext
//! ```

use std::sync::Arc;

use aula_core::RequestContext;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

const ACCESS_TOKEN: &str = "access";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (actor id: cashier, treasurer, warehouse clerk)
    pub sub: String,

    /// Granted permission names, e.g. `receipts.pay`
    #[serde(default)]
    pub perms: Vec<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Token type ("access" or "refresh")
    pub token_type: String,
}

impl Claims {
    pub fn into_context(self) -> RequestContext {
        RequestContext::new(self.sub, self.perms)
    }
}

/// JWT token manager.
pub struct JwtManager {
    secret: String,
}

impl JwtManager {
    pub fn new(secret: impl Into<String>) -> Self {
        JwtManager {
            secret: secret.into(),
        }
    }

    /// Generate an access token. Production tokens come from the auth
    /// service; this is used by tooling and tests that share the secret.
    pub fn generate_access_token<I, S>(
        &self,
        actor_id: &str,
        perms: I,
        lifetime: Duration,
    ) -> Result<String, ApiError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = Utc::now();
        let claims = Claims {
            sub: actor_id.to_string(),
            perms: perms.into_iter().map(Into::into).collect(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: ACCESS_TOKEN.to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| ApiError::Unauthenticated(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    /// Validate that a token is an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.validate_token(token)?;

        if claims.token_type != ACCESS_TOKEN {
            return Err(ApiError::Unauthenticated("Expected access token".to_string()));
        }
        if claims.sub.trim().is_empty() {
            return Err(ApiError::Unauthenticated("Token has no subject".to_string()));
        }

        Ok(claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Middleware: reject the request unless it carries a valid access token,
/// then attach the caller's [`RequestContext`].
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthenticated("Missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Unauthenticated("Malformed authorization header".to_string()))?;

    let token = extract_bearer_token(header)
        .ok_or_else(|| ApiError::Unauthenticated("Expected a bearer token".to_string()))?;

    let claims = state.jwt.validate_access_token(token)?;
    debug!(actor = %claims.sub, perms = claims.perms.len(), "Authenticated request");

    req.extensions_mut().insert(claims.into_context());
    Ok(next.run(req).await)
}
