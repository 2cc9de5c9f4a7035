//! # Aula API
//!
//! HTTP surface of the Aula financial integrity core.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           API Server                                    │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │ Cash sessions  │  │  Receipts      │  │  Inventory                 ││
//! │  │                │  │                │  │                            ││
//! │  │ • open / close │  │ • issue        │  │ • register item            ││
//! │  │ • current      │  │ • pay (idem-   │  │ • ENTRY/EXIT/TRANSFER/ADJ  ││
//! │  │ • audit        │  │   potent)      │  │ • kardex, lots             ││
//! │  │ • movements    │  │ • cancel/refund│  │ • low stock / expiry alerts││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  require_auth: Bearer JWT ──► RequestContext (actor, perms)      │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                               │                                         │
//! │                               ▼                                         │
//! │                    aula-db repositories (SQLite)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config::ApiConfig`]. Environment variables:
//! - `AULA_HOST`, `AULA_PORT` - bind address (default: 127.0.0.1:8080)
//! - `AULA_DATABASE_PATH` - SQLite file (default: ./aula.db)
//! - `AULA_JWT_SECRET` - HMAC secret shared with the token issuer
//! - `AULA_EXPIRY_WINDOW_DAYS` - default expiry alert window (default: 30)

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::AppState;
