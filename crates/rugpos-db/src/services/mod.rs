//! # Services
//!
//! Operations that span several tables and must commit atomically.
//!
//! ```text
//! CheckoutService::checkout          DebtPaymentService::record
//!   BEGIN                              BEGIN
//!   ├── read rate + catalog            ├── read debt + rate
//!   ├── settle (rugpos-core)           ├── Debt::record_payment (rugpos-core)
//!   ├── INSERT OR IGNORE sales         ├── UPDATE debt balance (guarded)
//!   ├── INSERT debt (if shortfall)     ├── INSERT payment
//!   COMMIT                             COMMIT
//! ```
//!
//! Any error before COMMIT drops the transaction, which rolls it back.

pub mod checkout;
pub mod debt_payments;
