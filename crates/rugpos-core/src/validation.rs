//! # Validation Module
//!
//! Input validation utilities for rugpos.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Checkout / debt screens                                      │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: rugpos-core                                                  │
//! │  └── THIS MODULE: field rules, run before any state changes            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rugpos_core::validation::{validate_debtor_name, validate_quantity};
//!
//! let name = validate_debtor_name("  Aziz Karimov ").unwrap();
//! assert_eq!(name, "Aziz Karimov");
//! assert!(validate_quantity(0).is_err());
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_AMOUNT_MAJOR, MAX_BASKET_LINES, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest carpet side or roll cut accepted, in meters.
pub const MAX_DIMENSION_METERS: i64 = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a debtor name and returns it trimmed.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_debtor_name(name: &str) -> ValidationResult<String> {
    required_text("debtor name", name, 200)
}

/// Validates a contact phone and returns it trimmed.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 32 characters
/// - Digits plus `+ - ( )` and spaces only
///
/// ## Example
/// ```rust
/// use rugpos_core::validation::validate_contact_phone;
///
/// assert!(validate_contact_phone("+998 90 123-45-67").is_ok());
/// assert!(validate_contact_phone("   ").is_err());
/// assert!(validate_contact_phone("call me").is_err());
/// ```
pub fn validate_contact_phone(phone: &str) -> ValidationResult<String> {
    let phone = required_text("contact phone", phone, 32)?;

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' '))
    {
        return Err(ValidationError::InvalidFormat {
            field: "contact phone".to_string(),
            reason: "must contain only digits, spaces and + - ( )".to_string(),
        });
    }

    Ok(phone)
}

/// Validates a product name snapshot.
pub fn validate_product_name(name: &str) -> ValidationResult<String> {
    required_text("product name", name, 200)
}

/// Validates who recorded a debt payment.
pub fn validate_recorded_by(user: &str) -> ValidationResult<String> {
    required_text("recorded by", user, 100)
}

fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
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

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a piece count.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Basket: Add Carpet                                                     │
/// │                                                                         │
/// │  Seller enters pieces: 2                                               │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(2) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty == 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       ├── qty > 999? → Error: "quantity must be between 1 and 999"     │
/// │       │                                                                 │
/// │       └── OK → BasketLine is built                                     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: u32) -> ValidationResult<()> {
    if qty == 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: i64::from(MAX_ITEM_QUANTITY),
        });
    }

    Ok(())
}

/// Validates a width, height or length in meters.
pub fn validate_dimension(field: &str, meters: Decimal) -> ValidationResult<()> {
    if meters <= Decimal::ZERO {
        return Err(ValidationError::must_be_positive(field));
    }

    if meters > Decimal::from(MAX_DIMENSION_METERS) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_DIMENSION_METERS,
        });
    }

    Ok(())
}

/// Validates an amount of money.
///
/// ## Rules
/// - Must not be negative
/// - Must not exceed MAX_AMOUNT_MAJOR (10^12)
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::must_not_be_negative(field));
    }

    if amount > Money::from_major(MAX_AMOUNT_MAJOR) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_MAJOR,
        });
    }

    Ok(())
}

/// Validates a tender amount. Zero is allowed, negative is not.
pub fn validate_tender_amount(amount: Money) -> ValidationResult<()> {
    validate_amount("tender amount", amount)
}

/// Validates a price or rate. Zero is allowed (gifts, samples).
///
/// ## Example
/// ```rust
/// use rugpos_core::{validation::validate_price, Money};
///
/// assert!(validate_price(Money::from_major(18)).is_ok());
/// assert!(validate_price(Money::zero()).is_ok());
/// assert!(validate_price(Money::from_major(-1)).is_err());
/// ```
pub fn validate_price(price: Money) -> ValidationResult<()> {
    validate_amount("price", price)
}

/// Validates a debt repayment amount.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::must_be_positive("payment amount"));
    }

    validate_amount("payment amount", amount)
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates basket size (number of lines).
///
/// ## Rules
/// - Must not exceed MAX_BASKET_LINES (100)
pub fn validate_basket_size(lines: usize) -> ValidationResult<()> {
    if lines > MAX_BASKET_LINES {
        return Err(ValidationError::OutOfRange {
            field: "basket lines".to_string(),
            min: 1,
            max: MAX_BASKET_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use rugpos_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required("id"));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
