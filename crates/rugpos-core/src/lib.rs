//! # rugpos-core: Pure Settlement Logic for rugpos
//!
//! This crate is the **heart** of rugpos. It turns a basket of carpet, roll
//! and unit goods plus a seller-declared mixed tender into priced,
//! profit-attributed, tender-classified sale records, and keeps the debt
//! ledger that follows a partially tendered order.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          rugpos Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Surrounding app (UI, REST, auth)                   │   │
//! │  │    Catalog ──► Basket ──► Checkout ──► Debts ──► Reports        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ rugpos-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌────────────┐ ┌──────┐ ┌─────────┐  │   │
//! │  │   │ pricing │ │ basket  │ │ settlement │ │ debt │ │currency │  │   │
//! │  │   │ catalog │ │ tenders │ │  engine    │ │ledger│ │  rate   │  │   │
//! │  │   └─────────┘ └─────────┘ └────────────┘ └──────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 rugpos-db (Database Layer)                      │   │
//! │  │        SQLite, migrations, atomic checkout and payments         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Decimal `Money` in the base currency
//! - [`currency`] - Exchange rate and display formatting
//! - [`types`] - Basket lines, tenders, sales, debts
//! - [`catalog`] - Catalog items, collections and the [`PriceBook`] seam
//! - [`pricing`] - The pricing resolver
//! - [`settlement`] - The settlement engine
//! - [`debt`] - Debt ledger rules and read-side projections
//! - [`reports`] - Tender breakdown and order grouping
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use rust_decimal::Decimal;
//! use rugpos_core::{
//!     settle, BasketLine, Catalog, Measure, Money, OrderContext, PricingMode, Tender, TenderKind,
//! };
//!
//! let carpet = BasketLine::new(
//!     "p-1",
//!     "Atlas 3x4",
//!     None,
//!     Measure::Count { quantity: 1, size: None },
//!     Money::from_major(100),
//! );
//! let tenders = [Tender::new(TenderKind::Cash, Money::from_major(120))];
//!
//! let settlement = settle(
//!     &[carpet],
//!     Money::from_major(120),
//!     &tenders,
//!     PricingMode::Standard,
//!     &Catalog::default(),
//!     OrderContext::new(Utc::now()),
//! )
//! .unwrap();
//!
//! assert_eq!(settlement.sales[0].attributed_profit, Money::from_major(20));
//! assert_eq!(settlement.sales[0].payment_kind, TenderKind::Cash);
//! assert_eq!(settlement.shortfall, Money::new(Decimal::ZERO));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod currency;
pub mod debt;
pub mod error;
pub mod money;
pub mod pricing;
pub mod reports;
pub mod settlement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::{Catalog, CatalogItem, Collection, PriceBook, ProductKind};
pub use currency::{CurrencyPair, ExchangeRate};
pub use debt::{default_deadline, order_details, DebtSummary, NewDebtPayment, OpenDebt};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{parse_size, resolve_price, ResolvedPrice};
pub use reports::{OrderSummary, TenderBreakdown};
pub use settlement::{settle, OrderContext, Settlement, TenderBuckets};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single basket.
pub const MAX_BASKET_LINES: usize = 100;

/// Maximum piece count on a single count or area line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: u32 = 999;

/// Largest single amount accepted (price, rate, tender, declared total,
/// repayment), in base-currency major units.
pub const MAX_AMOUNT_MAJOR: i64 = 1_000_000_000_000;

/// Default repayment term for a new debt, in days.
pub const DEFAULT_DEBT_TERM_DAYS: i64 = 7;
