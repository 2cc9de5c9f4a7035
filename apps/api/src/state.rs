//! Shared application state.

use aula_db::Database;

use crate::auth::JwtManager;
use crate::config::ApiConfig;

/// State shared by every handler behind an `Arc`.
pub struct AppState {
    pub db: Database,
    pub config: ApiConfig,
    pub jwt: JwtManager,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let jwt = JwtManager::new(config.jwt_secret.clone());
        AppState { db, config, jwt }
    }
}
