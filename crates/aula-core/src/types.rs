//! # Domain Types
//!
//! Core domain types of the Aula financial core.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  TREASURY                                                               │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │  CashSession    │ 1 │  CashMovement   │  append-only                 │
//! │  │  session_number │──►│  movement_number│                              │
//! │  │  totals, status │ n │  INCOME/EXPENSE │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  BILLING                                                                │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │    Receipt      │ 1 │    Payment      │  unique idempotency_key      │
//! │  │  receipt_number │──►│  method         │                              │
//! │  │  ReceiptStatus  │ 1 │  amount_cents   │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  INVENTORY                                                              │
//! │  ┌─────────────────┐   ┌───────────────────┐                            │
//! │  │ InventoryItem   │ 1 │ InventoryMovement │  append-only, the kardex   │
//! │  │  code           │──►│  ENTRY/EXIT/...   │  source of truth           │
//! │  │  cached stock   │ n │  IN/OUT           │                            │
//! │  └─────────────────┘   └───────────────────┘                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business number: (session_number, receipt_number, code) - human-readable
//!
//! All money fields are céntimos with a `_cents` suffix; accessor methods
//! return [`Money`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Cash Session
// =============================================================================

/// Status of a cashier's working period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    /// Accepting movements.
    Open,
    /// Closed exactly once; immutable afterwards.
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "OPEN",
            SessionStatus::Closed => "CLOSED",
        }
    }
}

/// A cashier's working period with running totals.
///
/// ## Lifecycle
/// ```text
/// open_session ──► OPEN ──(record_movement)*──► close_session ──► CLOSED
///                  totals += amount               discrepancy = actual − expected
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashSession {
    pub id: String,
    pub cashier_id: String,
    /// Business number: `CS-YYYYMMDD-NNNN`.
    pub session_number: String,
    pub initial_amount_cents: i64,
    pub total_income_cents: i64,
    pub total_expense_cents: i64,
    pub movement_count: i64,
    /// Kept equal to `initial + income − expense`; frozen at close.
    pub expected_final_amount_cents: i64,
    pub actual_final_amount_cents: Option<i64>,
    /// `actual − expected`, persisted at close.
    pub discrepancy_cents: Option<i64>,
    pub status: SessionStatus,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    pub closing_notes: Option<String>,
}

impl CashSession {
    /// `initial + Σ income − Σ expense`, computed from the running totals.
    pub fn expected_final_amount(&self) -> Money {
        Money::from_cents(self.initial_amount_cents) + Money::from_cents(self.total_income_cents)
            - Money::from_cents(self.total_expense_cents)
    }

    #[inline]
    pub fn initial_amount(&self) -> Money {
        Money::from_cents(self.initial_amount_cents)
    }

    #[inline]
    pub fn discrepancy(&self) -> Option<Money> {
        self.discrepancy_cents.map(Money::from_cents)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }
}

/// Direction of a cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum CashMovementType {
    Income,
    Expense,
}

impl CashMovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CashMovementType::Income => "INCOME",
            CashMovementType::Expense => "EXPENSE",
        }
    }
}

/// One append-only line of a session's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashMovement {
    pub id: String,
    pub session_id: String,
    /// 1..n within the session.
    pub movement_number: i64,
    pub movement_type: CashMovementType,
    pub amount_cents: i64,
    pub concept: String,
    pub description: Option<String>,
    pub cost_center: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl CashMovement {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// A session together with its movement log.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionWithMovements {
    pub session: CashSession,
    pub movements: Vec<CashMovement>,
}

/// Reconciliation of a session's stored totals against its movement log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionAudit {
    pub session_id: String,
    pub session_number: String,
    pub status: SessionStatus,
    pub stored_income_cents: i64,
    pub stored_expense_cents: i64,
    pub stored_movement_count: i64,
    pub ledger_income_cents: i64,
    pub ledger_expense_cents: i64,
    pub ledger_movement_count: i64,
    /// `initial + ledger income − ledger expense`.
    pub expected_final_amount_cents: i64,
    pub actual_final_amount_cents: Option<i64>,
    pub discrepancy_cents: Option<i64>,
    /// True when every stored figure matches the log.
    pub consistent: bool,
}

impl SessionAudit {
    /// Recomputes the session totals from its movements.
    pub fn compute(session: &CashSession, movements: &[CashMovement]) -> Self {
        let income: Money = movements
            .iter()
            .filter(|m| m.movement_type == CashMovementType::Income)
            .map(CashMovement::amount)
            .sum();
        let expense: Money = movements
            .iter()
            .filter(|m| m.movement_type == CashMovementType::Expense)
            .map(CashMovement::amount)
            .sum();
        let expected = session.initial_amount() + income - expense;
        let ledger_count = movements.len() as i64;

        let discrepancy_matches = match (session.actual_final_amount_cents, session.discrepancy_cents) {
            (Some(actual), Some(d)) => actual - expected.cents() == d,
            (None, None) => true,
            _ => false,
        };

        let consistent = session.total_income_cents == income.cents()
            && session.total_expense_cents == expense.cents()
            && session.movement_count == ledger_count
            && session.expected_final_amount_cents == expected.cents()
            && discrepancy_matches;

        SessionAudit {
            session_id: session.id.clone(),
            session_number: session.session_number.clone(),
            status: session.status,
            stored_income_cents: session.total_income_cents,
            stored_expense_cents: session.total_expense_cents,
            stored_movement_count: session.movement_count,
            ledger_income_cents: income.cents(),
            ledger_expense_cents: expense.cents(),
            ledger_movement_count: ledger_count,
            expected_final_amount_cents: expected.cents(),
            actual_final_amount_cents: session.actual_final_amount_cents,
            discrepancy_cents: session.discrepancy_cents,
            consistent,
        }
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// What a receipt charges for. Each concept has its own number series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReceiptConcept {
    Enrollment,
    Tuition,
    Admission,
    Certificate,
    Procedure,
    Other,
}

impl ReceiptConcept {
    /// Receipt number prefix for this concept's series.
    pub fn prefix(&self) -> &'static str {
        match self {
            ReceiptConcept::Enrollment => "MAT",
            ReceiptConcept::Tuition => "PEN",
            ReceiptConcept::Admission => "ADM",
            ReceiptConcept::Certificate => "CER",
            ReceiptConcept::Procedure => "TRA",
            ReceiptConcept::Other => "OTR",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptConcept::Enrollment => "ENROLLMENT",
            ReceiptConcept::Tuition => "TUITION",
            ReceiptConcept::Admission => "ADMISSION",
            ReceiptConcept::Certificate => "CERTIFICATE",
            ReceiptConcept::Procedure => "PROCEDURE",
            ReceiptConcept::Other => "OTHER",
        }
    }
}

/// Receipt lifecycle status.
///
/// ## State Machine
/// ```text
///            pay              refund
/// PENDING ────────► PAID ────────────► REFUNDED
///    │                │
///    │ cancel         │ cancel
///    ▼                ▼
/// CANCELLED ◄─────────┘
/// ```
/// Every other transition is rejected with `InvalidState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReceiptStatus {
    Pending,
    Paid,
    Cancelled,
    Refunded,
}

impl ReceiptStatus {
    pub const ALL: [ReceiptStatus; 4] = [
        ReceiptStatus::Pending,
        ReceiptStatus::Paid,
        ReceiptStatus::Cancelled,
        ReceiptStatus::Refunded,
    ];

    /// Statuses from which `target` is reachable in one step.
    pub fn sources_of(target: ReceiptStatus) -> Vec<ReceiptStatus> {
        ReceiptStatus::ALL
            .into_iter()
            .filter(|s| s.can_transition_to(target))
            .collect()
    }

    pub fn can_transition_to(&self, next: ReceiptStatus) -> bool {
        use ReceiptStatus::*;
        matches!(
            (self, next),
            (Pending, Paid) | (Pending, Cancelled) | (Paid, Cancelled) | (Paid, Refunded)
        )
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReceiptStatus::Cancelled | ReceiptStatus::Refunded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptStatus::Pending => "PENDING",
            ReceiptStatus::Paid => "PAID",
            ReceiptStatus::Cancelled => "CANCELLED",
            ReceiptStatus::Refunded => "REFUNDED",
        }
    }
}

impl Default for ReceiptStatus {
    fn default() -> Self {
        ReceiptStatus::Pending
    }
}

/// A billing document issued to a student or guardian.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Receipt {
    pub id: String,
    /// Business number: `PREFIX-NNNNNN`, sequential per concept.
    pub receipt_number: String,
    pub concept: ReceiptConcept,
    pub amount_cents: i64,
    pub customer_name: String,
    /// Valid DNI (8 digits) or RUC (11 digits).
    pub customer_document: String,
    pub status: ReceiptStatus,
    #[ts(as = "String")]
    pub issued_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    #[ts(as = "Option<String>")]
    pub refunded_at: Option<DateTime<Utc>>,
    pub refund_reason: Option<String>,
    pub issued_by: String,
}

impl Receipt {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// A PENDING receipt whose due date has passed.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == ReceiptStatus::Pending && self.due_date.is_some_and(|due| due < today)
    }
}

/// How a receipt was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Deposit,
}

/// The single settlement of a receipt. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub receipt_id: String,
    pub receipt_number: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    /// Bank operation number, card voucher, etc.
    pub reference: Option<String>,
    /// Client-supplied; a repeat returns this row unchanged.
    pub idempotency_key: String,
    pub applied_by: String,
    #[ts(as = "String")]
    pub applied_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Outcome of a pay call. `replayed` is true when the idempotency key was
/// already bound to this receipt and nothing was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentOutcome {
    pub payment: Payment,
    pub replayed: bool,
}

// =============================================================================
// Inventory
// =============================================================================

/// A stock-keeping item of the school's logistics (paper, toner, uniforms...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryItem {
    pub id: String,
    /// Unique business code, e.g. `PAPEL-A4`.
    pub code: String,
    pub name: String,
    pub unit_of_measure: String,
    pub min_stock: i64,
    pub max_stock: i64,
    /// Cache of `Σ IN − Σ OUT`; rewritten in the movement transaction.
    pub current_stock: i64,
    /// Weighted cost of the remaining FIFO lots.
    pub unit_cost_cents: i64,
    /// Cache of the remaining lots' value.
    pub stock_value_cents: i64,
    /// Cost registered with the item, used until the first entry.
    pub reference_cost_cents: i64,
    pub movement_count: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    #[inline]
    pub fn unit_cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents)
    }

    #[inline]
    pub fn stock_value(&self) -> Money {
        Money::from_cents(self.stock_value_cents)
    }
}

/// Kind of inventory movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum InventoryMovementType {
    Entry,
    Exit,
    Transfer,
    Adjustment,
}

impl InventoryMovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryMovementType::Entry => "ENTRY",
            InventoryMovementType::Exit => "EXIT",
            InventoryMovementType::Transfer => "TRANSFER",
            InventoryMovementType::Adjustment => "ADJUSTMENT",
        }
    }
}

/// Whether a movement row adds to or takes from stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementDirection {
    In,
    Out,
}

/// One append-only row of an item's kardex.
///
/// | type       | direction | unit_cost         | total_cost             |
/// |------------|-----------|-------------------|------------------------|
/// | ENTRY      | IN        | entered cost      | qty × unit_cost        |
/// | EXIT       | OUT       | realized average  | Σ FIFO slices          |
/// | TRANSFER   | OUT / IN  | slice cost on IN  | Σ slices / qty × cost  |
/// | ADJUSTMENT | IN / OUT  | current unit cost | as ENTRY / as EXIT     |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryMovement {
    pub id: String,
    pub item_id: String,
    /// 1..n within the item.
    pub movement_number: i64,
    pub movement_type: InventoryMovementType,
    pub direction: MovementDirection,
    /// Always > 0; the sign lives in `direction`.
    pub quantity: i64,
    pub unit_cost_cents: Option<i64>,
    pub total_cost_cents: i64,
    pub batch_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    pub reason: Option<String>,
    /// Shared by both sides of a transfer.
    pub transfer_id: Option<String>,
    pub counterpart_item_id: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl InventoryMovement {
    /// Quantity with the direction's sign applied.
    #[inline]
    pub fn signed_quantity(&self) -> i64 {
        match self.direction {
            MovementDirection::In => self.quantity,
            MovementDirection::Out => -self.quantity,
        }
    }

    #[inline]
    pub fn total_cost(&self) -> Money {
        Money::from_cents(self.total_cost_cents)
    }
}

/// Result of recording an inventory movement: the rows written and the item
/// as it stands after the commit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MovementReceipt {
    pub item: InventoryItem,
    pub movements: Vec<InventoryMovement>,
    /// Destination item after a transfer.
    pub destination: Option<InventoryItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================
