//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With floating point:                                                   │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A cash desk that closes a day of 2,000 movements in floats drifts,    │
//! │  and the drift shows up as a "discrepancy" nobody caused.              │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Céntimos                                         │
//! │    S/ 12.50 is stored as 1250                                          │
//! │    Every sum in the ledger is exact                                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use aula_core::money::Money;
//!
//! // Create from céntimos (preferred)
//! let fee = Money::from_cents(35000); // S/ 350.00
//!
//! // Arithmetic operations
//! let two_months = fee * 2;                        // S/ 700.00
//! let with_late_fee = fee + Money::from_cents(500); // S/ 355.00
//! assert_eq!(with_late_fee.to_string(), "S/ 355.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in céntimos (1/100 of a sol).
///
/// ## Design Decisions
/// - **i64 (signed)**: discrepancies at close can be negative
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  CashSession.initial + Σ income − Σ expense ──► expected_final_amount  │
/// │                                   actual − expected ──► discrepancy     │
/// │                                                                         │
/// │  Receipt.amount ──► Payment.amount                                      │
/// │                                                                         │
/// │  Lot.unit_cost × qty ──► InventoryMovement.total_cost ──► Kardex value │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from céntimos (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use aula_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents S/ 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from soles and céntimos.
    ///
    /// ## Example
    /// ```rust
    /// use aula_core::money::Money;
    ///
    /// let price = Money::from_major_minor(10, 99); // S/ 10.99
    /// assert_eq!(price.cents(), 1099);
    ///
    /// let shortfall = Money::from_major_minor(-5, 50); // S/ -5.50
    /// assert_eq!(shortfall.cents(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in céntimos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole soles portion.
    #[inline]
    pub const fn soles(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the céntimos portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a unit cost by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use aula_core::money::Money;
    ///
    /// let unit_cost = Money::from_cents(1000); // S/ 10.00 per ream
    /// assert_eq!(unit_cost.multiply_quantity(100).cents(), 100_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Divides a total value over a quantity, rounding half away from zero.
    ///
    /// Used for the weighted unit cost of remaining lots. Returns `None` for
    /// a non-positive quantity.
    ///
    /// ## Example
    /// ```rust
    /// use aula_core::money::Money;
    ///
    /// // 10 units worth S/ 1.05 → 10.5 céntimos each → 11
    /// let unit = Money::from_cents(105).per_unit(10);
    /// assert_eq!(unit, Some(Money::from_cents(11)));
    /// assert_eq!(Money::from_cents(105).per_unit(0), None);
    /// ```
    pub fn per_unit(&self, qty: i64) -> Option<Money> {
        if qty <= 0 {
            return None;
        }
        // i128 so that large stock values cannot overflow the doubling
        let doubled = self.0 as i128 * 2;
        let q = qty as i128;
        let rounded = if doubled >= 0 {
            (doubled + q) / (2 * q)
        } else {
            (doubled - q) / (2 * q)
        };
        Some(Money(rounded as i64))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display uses the sol symbol with two decimals.
///
/// ## Note
/// This is for logs and messages. The frontend formats with its own locale.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "S/ {}{}.{:02}", sign, self.soles().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Summing an iterator of amounts (ledger totals, lot values).
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
