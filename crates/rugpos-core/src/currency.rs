//! # Currency Layer
//!
//! Every amount in rugpos is held in the **base currency**. The display
//! currency exists only at the edges: on screen, and when a cashier types a
//! tender in local notes.
//!
//! ```text
//!   tender entry (UZS) ──► to_base ──► settlement / debts (USD)
//!                                             │
//!   screens, receipts  ◄── to_display ◄───────┘
//! ```
//!
//! The rate is explicit state: callers read it once per operation and pass
//! it to every conversion. Changing it never rewrites stored amounts.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::ValidationResult;

// =============================================================================
// Exchange Rate
// =============================================================================

/// Display units per one base unit (e.g. 12 200 UZS per USD).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, TS)]
#[ts(export)]
pub struct ExchangeRate(#[ts(type = "string")] Decimal);

impl ExchangeRate {
    /// Rate applied until an administrator sets one.
    pub const DEFAULT: ExchangeRate = ExchangeRate(Decimal::from_parts(12_200, 0, 0, false, 0));

    /// Creates a rate, rejecting zero and negative values.
    ///
    /// ## Example
    /// ```rust
    /// use rugpos_core::ExchangeRate;
    /// use rust_decimal::Decimal;
    ///
    /// assert!(ExchangeRate::new(Decimal::from(12_650)).is_ok());
    /// assert!(ExchangeRate::new(Decimal::ZERO).is_err());
    /// ```
    pub fn new(rate: Decimal) -> ValidationResult<Self> {
        if rate <= Decimal::ZERO {
            return Err(ValidationError::must_be_positive("exchange rate"));
        }
        Ok(ExchangeRate(rate))
    }

    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// `base × rate`
    pub fn to_display(&self, base: Money) -> Decimal {
        base.amount() * self.0
    }

    /// `display / rate`
    pub fn to_base(&self, display: Decimal) -> Money {
        Money::new(display / self.0)
    }
}

impl Default for ExchangeRate {
    fn default() -> Self {
        ExchangeRate::DEFAULT
    }
}

impl TryFrom<Decimal> for ExchangeRate {
    type Error = ValidationError;

    fn try_from(rate: Decimal) -> Result<Self, Self::Error> {
        ExchangeRate::new(rate)
    }
}

/// Deserialization goes through [`ExchangeRate::new`], so a stored zero
/// rate is rejected.
impl<'de> Deserialize<'de> for ExchangeRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rate = <Decimal as Deserialize>::deserialize(deserializer)?;
        ExchangeRate::new(rate).map_err(serde::de::Error::custom)
    }
}

impl From<ExchangeRate> for Decimal {
    fn from(rate: ExchangeRate) -> Self {
        rate.0
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

// =============================================================================
// Currency Pair
// =============================================================================

/// The base and display currencies, for formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CurrencyPair {
    /// ISO code of the base currency (amounts are stored in it).
    pub base_code: String,
    pub display_code: String,
    pub base_decimals: u32,
    /// Local notes usually have no minor unit in circulation.
    pub display_decimals: u32,
}

impl Default for CurrencyPair {
    fn default() -> Self {
        CurrencyPair {
            base_code: "USD".to_string(),
            display_code: "UZS".to_string(),
            base_decimals: 2,
            display_decimals: 0,
        }
    }
}

impl CurrencyPair {
    pub fn new(base_code: impl Into<String>, display_code: impl Into<String>) -> Self {
        CurrencyPair {
            base_code: base_code.into(),
            display_code: display_code.into(),
            ..CurrencyPair::default()
        }
    }

    /// Formats a base amount, e.g. `"1,234.50 USD"`.
    pub fn format_base(&self, amount: Money) -> String {
        format_amount(amount.amount(), self.base_decimals, &self.base_code)
    }

    /// Converts and formats in the display currency.
    ///
    /// ## Example
    /// ```rust
    /// use rugpos_core::{CurrencyPair, ExchangeRate, Money};
    ///
    /// let pair = CurrencyPair::default();
    /// let shown = pair.format_display(Money::from_major(120), ExchangeRate::DEFAULT);
    /// assert_eq!(shown, "1,464,000 UZS");
    /// ```
    pub fn format_display(&self, amount: Money, rate: ExchangeRate) -> String {
        format_amount(
            rate.to_display(amount),
            self.display_decimals,
            &self.display_code,
        )
    }
}

fn format_amount(value: Decimal, decimals: u32, code: &str) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.*}", decimals as usize, rounded.abs());

    let (whole, fraction) = match text.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (text.as_str(), None),
    };

    // Group thousands
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    match fraction {
        Some(f) => format!("{sign}{grouped}.{f} {code}"),
        None => format!("{sign}{grouped} {code}"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rate_must_be_positive() {
        assert!(ExchangeRate::new(dec!(12200)).is_ok());
        assert!(ExchangeRate::new(dec!(0)).is_err());
        assert!(ExchangeRate::new(dec!(-1)).is_err());
    }

    #[test]
    fn test_default_rate() {
        assert_eq!(ExchangeRate::default().value(), dec!(12200));
        assert_eq!(ExchangeRate::DEFAULT.to_string(), "12200");
    }

    #[test]
    fn test_conversions() {
        let rate = ExchangeRate::new(dec!(12500)).unwrap();
        assert_eq!(rate.to_display(Money::from_major(2)), dec!(25000));
        assert_eq!(rate.to_base(dec!(25000)), Money::from_major(2));
    }

    #[test]
    fn test_round_trip() {
        let rate = ExchangeRate::new(dec!(12650)).unwrap();
        for amount in [dec!(0), dec!(1), dec!(99.99), dec!(1234.56), dec!(0.01)] {
            let base = Money::new(amount);
            let back = rate.to_base(rate.to_display(base));
            assert!(back.approx_eq(base), "{amount} did not round trip");
        }
    }

    #[test]
    fn test_serde_rejects_zero_rate() {
        let ok: ExchangeRate = serde_json::from_str("\"12200\"").unwrap();
        assert_eq!(ok, ExchangeRate::DEFAULT);
        assert!(serde_json::from_str::<ExchangeRate>("\"0\"").is_err());
    }

    #[test]
    fn test_formatting() {
        let pair = CurrencyPair::default();
        assert_eq!(pair.format_base(Money::from_minor(123450)), "1,234.50 USD");
        assert_eq!(pair.format_base(Money::from_major(-5)), "-5.00 USD");
        assert_eq!(
            pair.format_display(Money::from_major(120), ExchangeRate::DEFAULT),
            "1,464,000 UZS"
        );
        assert_eq!(pair.format_base(Money::zero()), "0.00 USD");
    }
}
