//! # Repository Module
//!
//! Database repository implementations for the Aula financial core.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Repository per Aggregate                         │
//! │                                                                         │
//! │  HTTP handler                                                           │
//! │       │                                                                 │
//! │       │  db.receipts().pay(&ctx, id, req, key)                          │
//! │       ▼                                                                 │
//! │  ReceiptRepository                                                      │
//! │  ├── validate request, check permission   (nothing written yet)        │
//! │  ├── BEGIN, first statement is a write     (aggregate is locked)        │
//! │  ├── read, decide, write                                                │
//! │  └── COMMIT                                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! │  Sessions, receipts and items are independent: no transaction spans    │
//! │  two aggregates except the two items of a transfer.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CashSessionRepository`] - Open, close, read and audit cash sessions
//! - [`CashMovementRepository`] - Append-only cash ledger
//! - [`ReceiptRepository`] - Receipts, idempotent payments, cancel/refund
//! - [`InventoryRepository`] - Items, FIFO movements, kardex
//! - [`AlertRepository`] - Low-stock and expiry alerts

pub mod alerts;
pub mod cash_movement;
pub mod cash_session;
pub mod inventory;
pub mod receipt;
mod sequence;

pub use alerts::AlertRepository;
pub use cash_movement::CashMovementRepository;
pub use cash_session::CashSessionRepository;
pub use inventory::InventoryRepository;
pub use receipt::ReceiptRepository;
