//! API server configuration.
//!
//! Sources are layered, later ones winning:
//!
//! ```text
//! ApiConfig::default()  ──►  aula.toml (optional)  ──►  AULA_* environment
//! ```
//!
//! For example `AULA_PORT=9090` overrides `port = 8080` from the file.

use std::net::SocketAddr;
use std::time::Duration;

use ::config::{Config, Environment, File};
use aula_db::DbConfig;
use serde::{Deserialize, Serialize};

/// Secret used when nothing else is configured. Startup warns about it.
pub const DEV_JWT_SECRET: &str = "aula-dev-secret-change-in-production";

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Interface to bind
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size for the SQLite database
    pub max_connections: u32,

    /// How long a writer waits on a locked database, in milliseconds
    pub busy_timeout_ms: u64,

    /// HMAC secret shared with the token issuer
    pub jwt_secret: String,

    /// Expiry alert window when the request does not name one
    pub expiry_window_days: i64,

    /// Row cap for list endpoints when the request does not name one
    pub default_list_limit: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_path: "./aula.db".to_string(),
            max_connections: 5,
            busy_timeout_ms: 5_000,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            expiry_window_days: aula_core::DEFAULT_EXPIRY_WINDOW_DAYS,
            default_list_limit: 100,
        }
    }
}

impl ApiConfig {
    /// Load configuration from `aula.toml` (if present) and `AULA_*`
    /// environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_sources(Some("aula"), Environment::with_prefix("AULA"))
    }

    /// Layer the defaults, an optional config file and an environment source.
    pub fn from_sources(file: Option<&str>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&ApiConfig::default())?);
        if let Some(name) = file {
            builder = builder.add_source(File::with_name(name).required(false));
        }

        let config: ApiConfig = builder
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("database_path".to_string()));
        }
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("jwt_secret".to_string()));
        }
        if self.jwt_secret.len() < 16 {
            return Err(ConfigError::InvalidValue("jwt_secret".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".to_string()));
        }
        if self.expiry_window_days < 0 {
            return Err(ConfigError::InvalidValue("expiry_window_days".to_string()));
        }
        if self.default_list_limit <= 0 {
            return Err(ConfigError::InvalidValue("default_list_limit".to_string()));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("host".to_string()))
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}
