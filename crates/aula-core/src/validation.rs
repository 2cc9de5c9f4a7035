//! # Validation Module
//!
//! Field validation and document checksums for the financial core.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP (axum)                                                  │
//! │  └── Type validation (JSON deserialization into request structs)       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Request structs (`requests.rs`)                              │
//! │  └── THIS MODULE: every field checked BEFORE any storage access        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK / NOT NULL constraints                                      │
//! │  ├── UNIQUE indexes (codes, numbers, idempotency keys)                 │
//! │  └── Immutability triggers on ledger tables                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Peruvian Identity Documents
//! - **DNI** (personal ID): 8 digits, no check digit is validated.
//! - **RUC** (tax ID): 11 digits, the last one a mod-11 check digit.
//!
//! ```rust
//! use aula_core::validation::{validate_tax_id, validate_customer_document, DocumentKind};
//!
//! assert!(validate_tax_id("20100047218").is_ok());
//! assert!(validate_tax_id("20100047217").is_err());
//! assert_eq!(validate_customer_document("45678912").ok(), Some(DocumentKind::PersonalId));
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::{MAX_AMOUNT_CENTS, MAX_MOVEMENT_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Document Checksums
// =============================================================================

/// Weights applied to the first ten RUC digits.
const TAX_ID_WEIGHTS: [u32; 10] = [5, 4, 3, 2, 7, 6, 5, 4, 3, 2];

/// Which document a customer identified with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// DNI
    PersonalId,
    /// RUC
    TaxId,
}

fn digits_of(field: &str, value: &str, len: usize) -> ValidationResult<Vec<u32>> {
    if value.is_empty() {
        return Err(ValidationError::required(field));
    }
    if value.len() != len || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::invalid_format(
            field,
            format!("must be exactly {len} digits"),
        ));
    }
    Ok(value.bytes().map(|b| u32::from(b - b'0')).collect())
}

/// Validates a DNI: exactly 8 ASCII digits.
pub fn validate_personal_id(id: &str) -> ValidationResult<()> {
    digits_of("personal_id", id, 8).map(|_| ())
}

/// Validates a RUC: 11 digits and a matching mod-11 check digit.
///
/// ## Algorithm
/// ```text
/// RUC:      2  0  1  0  0  0  4  7  2  1 | 8
/// weights:  5  4  3  2  7  6  5  4  3  2
/// sum = 69, r = 69 mod 11 = 3
/// check = 11 − r when r ≥ 2, otherwise r   → 8 ✓
/// ```
pub fn validate_tax_id(id: &str) -> ValidationResult<()> {
    let digits = digits_of("tax_id", id, 11)?;

    let sum: u32 = digits
        .iter()
        .zip(TAX_ID_WEIGHTS.iter())
        .map(|(d, w)| d * w)
        .sum();
    let r = sum % 11;
    let check = if r >= 2 { 11 - r } else { r };

    if digits[10] != check {
        return Err(ValidationError::InvalidChecksum {
            field: "tax_id".to_string(),
        });
    }

    Ok(())
}

/// Validates a customer document, choosing DNI or RUC by length.
pub fn validate_customer_document(doc: &str) -> ValidationResult<DocumentKind> {
    let doc = doc.trim();
    match doc.len() {
        0 => Err(ValidationError::required("customer_document")),
        8 => validate_personal_id(doc).map(|_| DocumentKind::PersonalId),
        11 => validate_tax_id(doc).map(|_| DocumentKind::TaxId),
        _ => Err(ValidationError::invalid_format(
            "customer_document",
            "must be a DNI (8 digits) or a RUC (11 digits)",
        )),
    }
}

// =============================================================================
// String Validators
// =============================================================================

/// Trims `value` and rejects it when blank or longer than `max` characters.
///
/// ## Returns
/// The trimmed string.
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Like [`validate_text`] but a blank value becomes `None`.
pub fn validate_optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> ValidationResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => validate_text(field, v, max).map(Some),
    }
}

/// Validates an inventory item code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use aula_core::validation::validate_item_code;
///
/// assert!(validate_item_code("PAPEL-A4").is_ok());
/// assert!(validate_item_code("").is_err());
/// assert!(validate_item_code("PAPEL A4").is_err());
/// ```
pub fn validate_item_code(code: &str) -> ValidationResult<String> {
    let code = validate_text("code", code, 50)?;

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid_format(
            "code",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(code)
}

/// Validates a client-supplied idempotency key.
///
/// Keys are never synthesized: a blank key is rejected.
pub fn validate_idempotency_key(key: &str) -> ValidationResult<String> {
    let key = validate_text("idempotency_key", key, 128)?;

    if !key.chars().all(|c| c.is_ascii_graphic()) {
        return Err(ValidationError::invalid_format(
            "idempotency_key",
            "must be printable ASCII without spaces",
        ));
    }

    Ok(key)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a strictly positive amount in céntimos.
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates an amount that may be zero (opening float, unit cost).
///
/// ## Example
/// ```rust
/// use aula_core::validation::validate_non_negative_cents;
///
/// assert!(validate_non_negative_cents("initial_amount", 0).is_ok());
/// assert!(validate_non_negative_cents("initial_amount", -100).is_err());
/// ```
pub fn validate_non_negative_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a movement quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_MOVEMENT_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_MOVEMENT_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_MOVEMENT_QUANTITY,
        });
    }

    Ok(())
}

/// Validates stock thresholds of an item.
pub fn validate_stock_thresholds(min_stock: i64, max_stock: i64) -> ValidationResult<()> {
    if min_stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "min_stock".to_string(),
        });
    }
    if max_stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "max_stock".to_string(),
        });
    }
    if min_stock > max_stock {
        return Err(ValidationError::OutOfRange {
            field: "min_stock".to_string(),
            min: 0,
            max: max_stock,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
