//! # Error Types
//!
//! Domain-specific error types for rugpos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  rugpos-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule failures                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  rugpos-db errors (separate crate)                                     │
//! │  └── DbError          - Database and config failures, wraps CoreError  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant is reported before any mutation happens. Nothing in this
//! crate clamps a bad input into a good one.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Settlement was asked to settle nothing.
    #[error("Basket is empty")]
    EmptyBasket,

    /// Declared grand total is zero or negative.
    #[error("Declared total must be positive, got {0}")]
    NonPositiveTotal(Money),

    /// No sell rate could be resolved for a catalog item.
    ///
    /// ## When This Occurs
    /// - Area item without its own per-area price, whose collection has no
    ///   rate either, and no flat price to fall back on
    /// - Unit item without a sell price
    ///
    /// The basket screen blocks the add-to-basket action on this error.
    #[error("No price can be resolved for product {product_id}")]
    NoResolvablePrice { product_id: String },

    /// Catalog item is not known.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Debt cannot be found.
    #[error("Debt not found: {0}")]
    DebtNotFound(String),

    /// Opening a debt with nothing left to owe.
    ///
    /// ## User Workflow
    /// ```text
    /// Total 500, initial payment 500
    ///      │
    ///      ▼
    /// remaining = 0
    ///      │
    ///      ▼
    /// NothingToOwe { total: 500, initial_payment: 500 }
    /// ```
    #[error("Nothing to owe: total {total}, initial payment {initial_payment}")]
    NothingToOwe { total: Money, initial_payment: Money },

    /// A payment larger than the outstanding balance.
    #[error("Payment {amount} exceeds remaining balance {remaining} on debt {debt_id}")]
    OverPayment {
        debt_id: String,
        amount: Money,
        remaining: Money,
    },

    /// Debt is already settled; it accepts no further payments.
    #[error("Debt {0} is already paid")]
    DebtAlreadyPaid(String),

    /// An intermediate amount left the decimal range.
    #[error("Amount overflow while computing {0}")]
    AmountOverflow(&'static str),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
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

    /// Invalid format (e.g., invalid UUID, invalid size string).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub fn must_be_positive(field: &str) -> Self {
        ValidationError::MustBePositive {
            field: field.to_string(),
        }
    }

    pub fn must_not_be_negative(field: &str) -> Self {
        ValidationError::MustNotBeNegative {
            field: field.to_string(),
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
        let err = CoreError::OverPayment {
            debt_id: "d-1".to_string(),
            amount: Money::from_major(250),
            remaining: Money::from_major(200),
        };
        assert_eq!(
            err.to_string(),
            "Payment 250.00 exceeds remaining balance 200.00 on debt d-1"
        );

        let err = CoreError::NoResolvablePrice {
            product_id: "rug-7".to_string(),
        };
        assert_eq!(err.to_string(), "No price can be resolved for product rug-7");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("debtor name");
        assert_eq!(err.to_string(), "debtor name is required");

        let err = ValidationError::must_be_positive("exchange rate");
        assert_eq!(err.to_string(), "exchange rate must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::required("contact phone");
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
