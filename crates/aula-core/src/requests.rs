//! # Request Inputs
//!
//! Typed inputs for every mutating operation. Each one is validated as a
//! whole, and normalized (trimmed), before any storage is touched.
//!
//! ```text
//! JSON body ──serde──► XxxRequest ──validated()──► XxxRequest (trimmed)
//!                         │                              │
//!                         └── ValidationError ◄──────────┘ nothing written
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::{CashMovementType, InventoryMovementType, PaymentMethod, ReceiptConcept};
use crate::validation::{
    validate_amount_cents, validate_customer_document, validate_item_code,
    validate_non_negative_cents, validate_optional_text, validate_quantity,
    validate_stock_thresholds, validate_text, ValidationResult,
};
use crate::MAX_MOVEMENT_QUANTITY;

const SHORT_TEXT: usize = 120;
const LONG_TEXT: usize = 500;

// =============================================================================
// Cash
// =============================================================================

/// Opens a cash session for the calling cashier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct OpenSessionRequest {
    #[serde(alias = "initial_amount")]
    pub initial_amount_cents: i64,
}

impl OpenSessionRequest {
    pub fn validated(self) -> ValidationResult<Self> {
        validate_non_negative_cents("initial_amount", self.initial_amount_cents)?;
        Ok(self)
    }
}

/// Closes a session with the counted cash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct CloseSessionRequest {
    #[serde(alias = "final_amount")]
    pub final_amount_cents: i64,
    #[serde(default)]
    pub closing_notes: Option<String>,
}

impl CloseSessionRequest {
    pub fn validated(self) -> ValidationResult<Self> {
        validate_non_negative_cents("final_amount", self.final_amount_cents)?;
        Ok(CloseSessionRequest {
            final_amount_cents: self.final_amount_cents,
            closing_notes: validate_optional_text(
                "closing_notes",
                self.closing_notes.as_deref(),
                LONG_TEXT,
            )?,
        })
    }
}

/// Appends an income or expense to an open session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct RecordCashMovementRequest {
    pub cash_session_id: String,
    pub movement_type: CashMovementType,
    #[serde(alias = "amount")]
    pub amount_cents: i64,
    pub concept: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cost_center: Option<String>,
}

impl RecordCashMovementRequest {
    pub fn validated(self) -> ValidationResult<Self> {
        validate_amount_cents("amount", self.amount_cents)?;
        Ok(RecordCashMovementRequest {
            cash_session_id: validate_text("cash_session_id", &self.cash_session_id, 64)?,
            movement_type: self.movement_type,
            amount_cents: self.amount_cents,
            concept: validate_text("concept", &self.concept, SHORT_TEXT)?,
            description: validate_optional_text(
                "description",
                self.description.as_deref(),
                LONG_TEXT,
            )?,
            cost_center: validate_optional_text(
                "cost_center",
                self.cost_center.as_deref(),
                SHORT_TEXT,
            )?,
        })
    }
}

// =============================================================================
// Receipts
// =============================================================================

/// Issues a PENDING receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct IssueReceiptRequest {
    pub concept: ReceiptConcept,
    #[serde(alias = "amount")]
    pub amount_cents: i64,
    pub customer_name: String,
    pub customer_document: String,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
}

impl IssueReceiptRequest {
    pub fn validated(self) -> ValidationResult<Self> {
        validate_amount_cents("amount", self.amount_cents)?;
        let customer_name = validate_text("customer_name", &self.customer_name, SHORT_TEXT)?;
        validate_customer_document(&self.customer_document)?;
        Ok(IssueReceiptRequest {
            concept: self.concept,
            amount_cents: self.amount_cents,
            customer_name,
            customer_document: self.customer_document.trim().to_string(),
            due_date: self.due_date,
        })
    }
}

/// Settles a receipt. The idempotency key travels separately (header).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct PayReceiptRequest {
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_reference: Option<String>,
}

impl PayReceiptRequest {
    pub fn validated(self) -> ValidationResult<Self> {
        Ok(PayReceiptRequest {
            payment_method: self.payment_method,
            payment_reference: validate_optional_text(
                "payment_reference",
                self.payment_reference.as_deref(),
                SHORT_TEXT,
            )?,
        })
    }
}

/// Reason for a cancellation or refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct ReasonRequest {
    pub reason: String,
}

impl ReasonRequest {
    pub fn validated(self) -> ValidationResult<Self> {
        Ok(ReasonRequest {
            reason: validate_text("reason", &self.reason, LONG_TEXT)?,
        })
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Registers an inventory item with no stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct RegisterItemRequest {
    pub code: String,
    pub name: String,
    pub unit_of_measure: String,
    pub min_stock: i64,
    pub max_stock: i64,
    #[serde(alias = "unit_cost")]
    pub unit_cost_cents: i64,
}

impl RegisterItemRequest {
    pub fn validated(self) -> ValidationResult<Self> {
        validate_stock_thresholds(self.min_stock, self.max_stock)?;
        validate_non_negative_cents("unit_cost", self.unit_cost_cents)?;
        Ok(RegisterItemRequest {
            code: validate_item_code(&self.code)?,
            name: validate_text("name", &self.name, SHORT_TEXT)?,
            unit_of_measure: validate_text("unit_of_measure", &self.unit_of_measure, 20)?,
            min_stock: self.min_stock,
            max_stock: self.max_stock,
            unit_cost_cents: self.unit_cost_cents,
        })
    }
}

/// Records a kardex movement.
///
/// `quantity` is a positive count for ENTRY/EXIT/TRANSFER and a signed,
/// nonzero delta for ADJUSTMENT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct RecordInventoryMovementRequest {
    pub item_id: String,
    pub movement_type: InventoryMovementType,
    pub quantity: i64,
    #[serde(default, alias = "unit_cost")]
    pub unit_cost_cents: Option<i64>,
    #[serde(default)]
    pub batch_number: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub destination_item_id: Option<String>,
}

impl RecordInventoryMovementRequest {
    /// True when the movement creates a new FIFO lot.
    pub fn creates_lot(&self) -> bool {
        match self.movement_type {
            InventoryMovementType::Entry => true,
            InventoryMovementType::Adjustment => self.quantity > 0,
            InventoryMovementType::Exit | InventoryMovementType::Transfer => false,
        }
    }

    pub fn validated(self) -> ValidationResult<Self> {
        let item_id = validate_text("item_id", &self.item_id, 64)?;
        let reason = validate_optional_text("reason", self.reason.as_deref(), LONG_TEXT)?;
        let batch_number =
            validate_optional_text("batch_number", self.batch_number.as_deref(), 60)?;

        match self.movement_type {
            InventoryMovementType::Adjustment => {
                if self.quantity == 0 {
                    return Err(ValidationError::OutOfRange {
                        field: "quantity".to_string(),
                        min: -MAX_MOVEMENT_QUANTITY,
                        max: MAX_MOVEMENT_QUANTITY,
                    });
                }
                validate_quantity(self.quantity.saturating_abs())?;
                if reason.is_none() {
                    return Err(ValidationError::required("reason"));
                }
            }
            _ => validate_quantity(self.quantity)?,
        }

        match (self.movement_type, self.unit_cost_cents) {
            (InventoryMovementType::Entry, None) => {
                return Err(ValidationError::required("unit_cost"));
            }
            (InventoryMovementType::Entry, Some(cost)) => {
                validate_non_negative_cents("unit_cost", cost)?;
            }
            (_, Some(_)) => {
                return Err(ValidationError::invalid_format(
                    "unit_cost",
                    "only accepted on ENTRY movements",
                ));
            }
            (_, None) => {}
        }

        if !self.creates_lot() && (batch_number.is_some() || self.expiry_date.is_some()) {
            return Err(ValidationError::invalid_format(
                "batch_number",
                "lot data is only accepted on movements that add stock",
            ));
        }

        let destination_item_id = match self.movement_type {
            InventoryMovementType::Transfer => {
                let dest = validate_optional_text(
                    "destination_item_id",
                    self.destination_item_id.as_deref(),
                    64,
                )?
                .ok_or_else(|| ValidationError::required("destination_item_id"))?;
                if dest == item_id {
                    return Err(ValidationError::invalid_format(
                        "destination_item_id",
                        "must differ from the source item",
                    ));
                }
                Some(dest)
            }
            _ => None,
        };

        Ok(RecordInventoryMovementRequest {
            item_id,
            movement_type: self.movement_type,
            quantity: self.quantity,
            unit_cost_cents: self.unit_cost_cents,
            batch_number,
            expiry_date: self.expiry_date,
            reason,
            destination_item_id,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
