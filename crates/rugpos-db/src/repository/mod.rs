//! # Repository Module
//!
//! Database repositories for rugpos.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Repositories                                    │
//! │                                                                         │
//! │  db.catalog()   ──► CatalogRepository   collections, catalog items      │
//! │  db.sales()     ──► SaleRepository      settled lines, daily reports    │
//! │  db.debts()     ──► DebtRepository      debts and their payments        │
//! │  db.settings()  ──► SettingsRepository  exchange rate                   │
//! │                                                                         │
//! │  Each repository has pool-backed methods for reads, plus `*_on`         │
//! │  functions taking `&mut SqliteConnection` so services can compose       │
//! │  them inside one transaction.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Column Encoding
//!
//! | Rust type          | SQLite column                                 |
//! |--------------------|-----------------------------------------------|
//! | `Money`, `Decimal` | TEXT, exact decimal string                    |
//! | `DateTime<Utc>`    | TEXT, RFC 3339 with microseconds and `Z`      |
//! | enums              | TEXT, snake_case via `sqlx::Type`             |
//! | `bool`             | INTEGER 0/1                                   |
//!
//! The fixed-width timestamp form sorts lexically in time order, so range
//! filters can be written in SQL.

pub mod catalog;
pub mod debt;
pub mod sale;
pub mod settings;

use chrono::{DateTime, SecondsFormat, Utc};
use rugpos_core::Money;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;

use crate::error::{DbError, DbResult};

// =============================================================================
// Encoding
// =============================================================================

pub(crate) fn money_text(amount: Money) -> String {
    amount.amount().to_string()
}

pub(crate) fn opt_money_text(amount: Option<Money>) -> Option<String> {
    amount.map(money_text)
}

pub(crate) fn opt_decimal_text(value: Option<Decimal>) -> Option<String> {
    value.map(|v| v.to_string())
}

pub(crate) fn timestamp_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// =============================================================================
// Decoding
// =============================================================================

pub(crate) fn decimal_column(row: &SqliteRow, column: &str) -> DbResult<Decimal> {
    let text: String = row.try_get(column)?;
    parse_decimal(column, &text)
}

pub(crate) fn opt_decimal_column(row: &SqliteRow, column: &str) -> DbResult<Option<Decimal>> {
    let text: Option<String> = row.try_get(column)?;
    text.map(|t| parse_decimal(column, &t)).transpose()
}

pub(crate) fn money_column(row: &SqliteRow, column: &str) -> DbResult<Money> {
    decimal_column(row, column).map(Money::new)
}

pub(crate) fn opt_money_column(row: &SqliteRow, column: &str) -> DbResult<Option<Money>> {
    Ok(opt_decimal_column(row, column)?.map(Money::new))
}

pub(crate) fn timestamp_column(row: &SqliteRow, column: &str) -> DbResult<DateTime<Utc>> {
    let text: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| DbError::decode(column, e))
}

fn parse_decimal(column: &str, text: &str) -> DbResult<Decimal> {
    Decimal::from_str(text).map_err(|e| DbError::decode(column, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps_sort_lexically() {
        let earlier = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let later = earlier + chrono::Duration::milliseconds(1);

        let a = timestamp_text(earlier);
        let b = timestamp_text(later);
        assert_eq!(a, "2026-03-01T09:00:00.000000Z");
        assert!(a < b);
    }

    #[test]
    fn test_money_text_keeps_precision() {
        let amount = Money::new(Decimal::from_str("33.333333").unwrap());
        assert_eq!(money_text(amount), "33.333333");
    }
}
