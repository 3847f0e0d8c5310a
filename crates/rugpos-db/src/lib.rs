//! # rugpos-db: Database Layer for rugpos
//!
//! SQLite persistence for the settlement engine and debt ledger, using sqlx
//! for async operations. Checkout and debt repayment each commit as one
//! transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        rugpos Data Flow                                 │
//! │                                                                         │
//! │  Surrounding API (checkout screen, debt screen, admin)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     rugpos-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────────┐   ┌───────────────┐   ┌──────────────────┐   │   │
//! │  │  │   Services   │   │ Repositories  │   │    Database      │   │   │
//! │  │  │              │   │               │   │    (pool.rs)     │   │   │
//! │  │  │ Checkout     │──►│ CatalogRepo   │──►│  SqlitePool      │   │   │
//! │  │  │ DebtPayments │   │ SaleRepo      │   │  migrations      │   │   │
//! │  │  │              │   │ DebtRepo      │   │  RugposConfig    │   │   │
//! │  │  │              │   │ SettingsRepo  │   │                  │   │   │
//! │  │  └──────┬───────┘   └───────────────┘   └──────────────────┘   │   │
//! │  │         │ settle(), Debt::record_payment()                      │   │
//! │  │         ▼                                                       │   │
//! │  │     rugpos-core (pure rules)                                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL, foreign keys on)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - `rugpos.toml` loading and environment overrides
//! - [`migrations`] - Embedded database migrations
//! - [`repository`] - Catalog, sale, debt and settings repositories
//! - [`services`] - Atomic checkout and debt payment
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rugpos_db::{CheckoutRequest, DebtorInfo, RugposConfig};
//!
//! let db = RugposConfig::load(None)?.connect().await?;
//!
//! let receipt = db
//!     .checkout()
//!     .checkout(
//!         CheckoutRequest::new(basket, declared_total, tenders)
//!             .with_debtor(DebtorInfo::new("Aziz", "+998 90 123 45 67")),
//!     )
//!     .await?;
//!
//! if let Some(debt) = receipt.debt {
//!     db.debt_payments()
//!         .record(&debt.id, Money::from_major(50), "cashier-1", None)
//!         .await?;
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod services;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::RugposConfig;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::catalog::CatalogRepository;
pub use repository::debt::DebtRepository;
pub use repository::sale::SaleRepository;
pub use repository::settings::SettingsRepository;

pub use services::checkout::{CheckoutReceipt, CheckoutRequest, CheckoutService, DebtorInfo};
pub use services::debt_payments::{DebtPaymentService, PaymentAmount};
