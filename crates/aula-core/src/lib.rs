//! # aula-core: Pure Business Logic for the Aula Financial Core
//!
//! This crate is the **heart** of the treasury and logistics backend. It
//! contains all business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Aula Architecture                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web frontend (school admin)                  │   │
//! │  │    Cash desk ──► Receipts ──► Payments ──► Warehouse kardex     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP + bearer token                    │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/api (axum)                              │   │
//! │  │    /cash-sessions, /receipts, /inventory                        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ aula-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  types   │ │  money   │ │   fifo   │ │validation│          │   │
//! │  │   │ Session  │ │  Money   │ │ LotQueue │ │ DNI/RUC  │          │   │
//! │  │   │ Receipt  │ │          │ │  kardex  │ │ requests │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    aula-db (Database Layer)                     │   │
//! │  │        SQLite transactions, migrations, repositories            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (CashSession, Receipt, InventoryItem, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Field rules and DNI/RUC checksums
//! - [`requests`] - Typed operation inputs, validated before any write
//! - [`context`] - Request context and permission names
//! - [`fifo`] - FIFO lot queue and movement planning
//! - [`kardex`] - Running stock card
//! - [`alerts`] - Low-stock and expiry alerts
//!
//! ## Example Usage
//!
//! ```rust
//! use aula_core::fifo::{Lot, LotQueue};
//! use chrono::Utc;
//!
//! let mut queue = LotQueue::new();
//! for (id, qty, cost) in [("e1", 100, 1_000), ("e2", 50, 1_200)] {
//!     queue.push(Lot {
//!         source_movement_id: id.to_string(),
//!         quantity: qty,
//!         unit_cost_cents: cost,
//!         batch_number: None,
//!         expiry_date: None,
//!         received_at: Utc::now(),
//!     });
//! }
//!
//! let exit = queue.consume(120).expect("enough stock");
//! assert_eq!(exit.total_cost.cents(), 124_000); // S/ 1,240.00 realized
//! assert_eq!(queue.total_value().cents(), 36_000); // 30 units left at S/ 12.00
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod alerts;
pub mod context;
pub mod error;
pub mod fifo;
pub mod kardex;
pub mod money;
pub mod requests;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use context::RequestContext;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest amount accepted on any single money field (S/ 10,000,000.00).
///
/// Keeps session totals and stock values far from i64 overflow.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000;

/// Largest quantity accepted on a single inventory movement.
pub const MAX_MOVEMENT_QUANTITY: i64 = 1_000_000;

/// Default window for expiry alerts, in days.
pub const DEFAULT_EXPIRY_WINDOW_DAYS: i64 = 30;
