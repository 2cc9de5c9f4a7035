//! # aula-db: Database Layer for the Aula Financial Core
//!
//! This crate owns every transaction boundary of the system. It uses SQLite
//! for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Aula Data Flow                                   │
//! │                                                                         │
//! │  HTTP handler (POST /receipts/{id}/pay)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     aula-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ CashSession    │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ CashMovement   │    │ 001_initial_ │  │   │
//! │  │   │ WAL, FKs,     │    │ Receipt        │    │ schema.sql   │  │   │
//! │  │   │ busy timeout  │    │ Inventory      │    │              │  │   │
//! │  │   └───────────────┘    │ Alert          │    └──────────────┘  │   │
//! │  │                        └────────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (aula.db)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (cash, receipts, inventory)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aula_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/aula.db")).await?;
//!
//! let session = db.cash_sessions().open(&ctx, request).await?;
//! let kardex = db.inventory().kardex(&item_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    AlertRepository, CashMovementRepository, CashSessionRepository, InventoryRepository,
    ReceiptRepository,
};
