//! # Error Types
//!
//! Domain-specific error types for aula-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  aula-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule failures (the caller-facing set) │
//! │  └── ValidationError  - Field-level input failures                     │
//! │                                                                         │
//! │  aula-db errors (separate crate)                                       │
//! │  └── DbError          - Storage failures, wraps CoreError as Domain    │
//! │                                                                         │
//! │  HTTP errors (apps/api)                                                │
//! │  └── ApiError         - What the frontend sees (code + message)        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Frontend     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Caller-Facing Taxonomy
//! | Variant             | Meaning                                  | State change |
//! |---------------------|------------------------------------------|--------------|
//! | `Validation`        | malformed or missing input               | none         |
//! | `Conflict`          | duplicate code / number / open session   | none         |
//! | `NotFound`          | unknown id                               | none         |
//! | `InvalidState`      | illegal transition                       | none         |
//! | `InsufficientStock` | an outbound movement exceeds stock       | none         |
//! | `Forbidden`         | the request context lacks a permission   | none         |
//!
//! None of these are retried by the core. Replaying a payment with a known
//! idempotency key is not an error at all; it is a success path.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Input failed field-level validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The operation would duplicate something that must be unique.
    ///
    /// ## When This Occurs
    /// - Opening a second session for a cashier that already has one open
    /// - Registering an item code that already exists
    /// - Reusing an idempotency key for a different receipt
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// The referenced aggregate does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The aggregate is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Recording a movement on a CLOSED session
    /// - Closing a session twice
    /// - Paying a receipt that is not PENDING
    /// - Cancelling a receipt that is already CANCELLED or REFUNDED
    #[error("{entity} {id} is {current}, cannot {operation}")]
    InvalidState {
        entity: String,
        id: String,
        current: String,
        operation: String,
    },

    /// An outbound movement requested more units than are in stock.
    ///
    /// ## User Workflow
    /// ```text
    /// EXIT PAPEL-A4 (qty: 40)
    ///      │
    ///      ▼
    /// Replay lots: available=30
    ///      │
    ///      ▼
    /// InsufficientStock { code: "PAPEL-A4", available: 30, requested: 40 }
    ///      │
    ///      ▼
    /// UI shows: "Only 30 PAPEL-A4 in stock"
    /// ```
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    /// The request context does not carry the required permission.
    #[error("Missing permission: {permission}")]
    Forbidden { permission: String },
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        CoreError::Conflict {
            message: message.into(),
        }
    }

    /// Creates an InvalidState error.
    pub fn invalid_state(
        entity: impl Into<String>,
        id: impl Into<String>,
        current: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        CoreError::InvalidState {
            entity: entity.into(),
            id: id.into(),
            current: current.into(),
            operation: operation.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Every operation validates its whole input before touching storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., non-digit characters in an ID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A check digit did not match.
    #[error("{field} has an invalid check digit")]
    InvalidChecksum { field: String },
}

impl ValidationError {
    /// Creates a Required error.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates an InvalidFormat error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            code: "PAPEL-A4".to_string(),
            available: 30,
            requested: 40,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for PAPEL-A4: available 30, requested 40"
        );

        let err = CoreError::invalid_state("Receipt", "r-1", "paid", "pay");
        assert_eq!(err.to_string(), "Receipt r-1 is paid, cannot pay");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("concept");
        assert_eq!(err.to_string(), "concept is required");

        let err = ValidationError::InvalidChecksum {
            field: "tax_id".to_string(),
        };
        assert_eq!(err.to_string(), "tax_id has an invalid check digit");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("reason").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
