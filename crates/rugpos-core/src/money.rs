//! # Money Module
//!
//! Provides the `Money` type for monetary values in the **base currency**.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Carpets are priced per m² over fractional sizes:                       │
//! │    2.5 m × 3.5 m × 18.40/m² = 161.00                                    │
//! │  and a declared markup is split proportionally across lines.           │
//! │  Integer cents cannot hold the intermediate shares.                    │
//! │                                                                         │
//! │  OUR SOLUTION: base-10 Decimal (96-bit mantissa, 28 digits)             │
//! │    shares are exact, equal lines get identical shares, and the sum     │
//! │    of the shares reproduces the declared total                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rugpos_core::money::Money;
//! use rust_decimal::Decimal;
//!
//! let rate = Money::from_major(18);           // 18.00 per m²
//! let area = Decimal::new(875, 2);            // 8.75 m²
//! let line = rate * area;                     // 157.50
//! assert_eq!(line.to_string(), "157.50");
//! ```
//!
//! Only the display layer converts base amounts into the display currency;
//! see [`crate::currency`].

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

/// Tolerance used when comparing reconciled totals (1e-6).
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 6);

/// Decimal places shown when displaying base-currency amounts.
const DISPLAY_DP: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the base currency.
///
/// ## Design Decisions
/// - **Signed**: negative values carry discounts (negative attributed profit)
/// - **Single field tuple struct**: zero-cost wrapper over `Decimal`
/// - **Serde**: serialized as a decimal string, never a float
///
/// ## Where Money Flows
/// ```text
/// Collection rate ──► BasketLine.unit_price ──► BasketLine.total (book)
///                                                     │
///      declared total ──► profit share ──► Sale.amount ◄┘
///                                             │
///                            Tender buckets ◄─┘──► Debt.remaining_amount
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(#[ts(type = "string")] Decimal);

impl Money {
    /// Wraps a decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a whole-unit amount.
    ///
    /// ## Example
    /// ```rust
    /// use rugpos_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(120).to_string(), "120.00");
    /// ```
    #[inline]
    pub fn from_major(major: i64) -> Self {
        Money(Decimal::from(major))
    }

    /// Creates an amount from minor units (hundredths).
    ///
    /// ## Example
    /// ```rust
    /// use rugpos_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(1099).to_string(), "10.99");
    /// ```
    #[inline]
    pub fn from_minor(minor: i64) -> Self {
        Money(Decimal::new(minor, DISPLAY_DP))
    }

    /// Returns the underlying decimal.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is strictly greater than zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is strictly less than zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative values to zero.
    #[inline]
    pub fn non_negative(self) -> Self {
        if self.is_negative() {
            Money::zero()
        } else {
            self
        }
    }

    /// Returns `self × part / whole`, or zero when `whole` is zero.
    ///
    /// This is the proportional allocation used to spread a declared markup
    /// or discount across basket lines. `None` when the intermediate product
    /// leaves the decimal range.
    ///
    /// ## Example
    /// ```rust
    /// use rugpos_core::money::Money;
    ///
    /// let profit = Money::from_major(30);
    /// let share = profit.share(Money::from_major(100), Money::from_major(150));
    /// assert_eq!(share, Some(Money::from_major(20)));
    ///
    /// // No book total, nothing to distribute against.
    /// assert_eq!(profit.share(Money::zero(), Money::zero()), Some(Money::zero()));
    /// ```
    pub fn share(&self, part: Money, whole: Money) -> Option<Money> {
        if whole.is_zero() {
            return Some(Money::zero());
        }
        self.0
            .checked_mul(part.0)
            .and_then(|scaled| scaled.checked_div(whole.0))
            .map(Money)
    }

    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    #[inline]
    pub fn checked_sub(&self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    #[inline]
    pub fn checked_mul(&self, factor: Decimal) -> Option<Money> {
        self.0.checked_mul(factor).map(Money)
    }

    /// Rounds to the display precision (2 dp, midpoint away from zero).
    pub fn rounded(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(DISPLAY_DP, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// True when both amounts agree within [`MONEY_TOLERANCE`].
    pub fn approx_eq(&self, other: Money) -> bool {
        (self.0 - other.0).abs() <= MONEY_TOLERANCE
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the base amount at two decimal places, no symbol.
///
/// Currency symbols and the display currency are handled by
/// [`crate::currency::CurrencyPair`].
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.rounded().0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Money)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
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

/// Multiplication by a decimal factor (area, length, piece count).
///
/// Panics on overflow like the `Decimal` operator; settlement uses
/// [`Money::checked_mul`].
impl Mul<Decimal> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, factor: Decimal) -> Self {
        Money(self.0 * factor)
    }
}

/// Multiplication by a piece count.
impl Mul<u32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: u32) -> Self {
        Money(self.0 * Decimal::from(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
