//! # Debt Payment Service
//!
//! Records a repayment: the balance update and the payment row commit
//! together or not at all.
//!
//! ## Flow
//! ```text
//! record(debt_id, amount, recorded_by, note)
//!      │
//!      ▼
//! BEGIN ──► load debt ──► read rate ──► Debt::record_payment
//!                                            │
//!              rejected (paid, ≤ 0, > remaining) ──► rollback, debt unchanged
//!                                            │
//!                                            ▼
//!                       UPDATE balance WHERE remaining = <as read>
//!                                            │
//!                              stale ──► Conflict, rollback
//!                                            │
//!                                            ▼
//!                               INSERT payment ──► COMMIT
//! ```

use chrono::{DateTime, Utc};
use rugpos_core::{CoreError, Debt, ExchangeRate, Money, NewDebtPayment};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;
use crate::repository::debt::DebtRepository;
use crate::repository::settings::SettingsRepository;

/// An amount as the cashier typed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentAmount {
    /// Already in the base currency.
    Base(Money),
    /// In display currency notes; converted at the rate snapshot.
    Display(Decimal),
}

/// Records repayments against open debts.
#[derive(Debug, Clone)]
pub struct DebtPaymentService {
    pool: SqlitePool,
    fallback_rate: ExchangeRate,
}

impl DebtPaymentService {
    pub fn new(pool: SqlitePool, fallback_rate: ExchangeRate) -> Self {
        DebtPaymentService {
            pool,
            fallback_rate,
        }
    }

    /// Records a base-currency payment and returns the updated debt.
    ///
    /// ## Errors
    /// - `DebtNotFound`, `DebtAlreadyPaid`, `OverPayment`
    /// - validation errors for the amount or `recorded_by`
    /// - `Conflict` when another payment landed first
    pub async fn record(
        &self,
        debt_id: &str,
        amount: Money,
        recorded_by: &str,
        note: Option<&str>,
    ) -> DbResult<Debt> {
        self.record_at(debt_id, PaymentAmount::Base(amount), recorded_by, note, Utc::now())
            .await
    }

    /// Records a payment typed in the display currency.
    pub async fn record_display(
        &self,
        debt_id: &str,
        amount: Decimal,
        recorded_by: &str,
        note: Option<&str>,
    ) -> DbResult<Debt> {
        self.record_at(
            debt_id,
            PaymentAmount::Display(amount),
            recorded_by,
            note,
            Utc::now(),
        )
        .await
    }

    /// Records a payment stamped at `at`.
    pub async fn record_at(
        &self,
        debt_id: &str,
        amount: PaymentAmount,
        recorded_by: &str,
        note: Option<&str>,
        at: DateTime<Utc>,
    ) -> DbResult<Debt> {
        let mut tx = self.pool.begin().await?;

        let mut debt = DebtRepository::get_by_id_on(&mut *tx, debt_id)
            .await?
            .ok_or_else(|| CoreError::DebtNotFound(debt_id.to_string()))?;
        let rate = SettingsRepository::exchange_rate_on(&mut *tx, self.fallback_rate).await?;

        let amount = match amount {
            PaymentAmount::Base(amount) => amount,
            PaymentAmount::Display(display) => rate.to_base(display),
        };

        let mut request = NewDebtPayment::new(amount, recorded_by, rate, at);
        if let Some(note) = note {
            request = request.with_note(note);
        }

        let remaining_before = debt.remaining_amount;
        let payment = debt.record_payment(request)?.clone();

        DebtRepository::update_balance_on(&mut *tx, &debt, remaining_before, at).await?;
        DebtRepository::insert_payment_on(&mut *tx, &payment).await?;

        tx.commit().await?;

        info!(
            debt_id = %debt.id,
            payment_id = %payment.id,
            amount = %payment.amount,
            remaining = %debt.remaining_amount,
            status = ?debt.status,
            rate = %rate,
            "Debt payment recorded"
        );

        Ok(debt)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use crate::services::checkout::{CheckoutRequest, DebtorInfo};
    use chrono::TimeZone;
    use rugpos_core::{BasketLine, DebtStatus, Measure, OrderContext, Tender, TenderKind};
    use rust_decimal_macros::dec;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 3, 11, 0, 0).unwrap()
    }

    /// Opens a 500 debt with 300 outstanding through a real checkout.
    async fn open_debt(db: &Database) -> Debt {
        let carpet = BasketLine::new(
            "atlas-1",
            "Atlas",
            None,
            Measure::Count {
                quantity: 1,
                size: Some("3×4".to_string()),
            },
            Money::from_major(500),
        );
        let receipt = db
            .checkout()
            .checkout(
                CheckoutRequest::new(
                    vec![carpet],
                    Money::from_major(500),
                    vec![Tender::new(TenderKind::Cash, Money::from_major(200))],
                )
                .with_debtor(DebtorInfo::new("Aziz", "+998 90 000 00 00"))
                .with_order(OrderContext::pinned("order-7", at())),
            )
            .await
            .unwrap();
        receipt.debt.unwrap()
    }

    fn base(amount: i64) -> PaymentAmount {
        PaymentAmount::Base(Money::from_major(amount))
    }

    #[tokio::test]
    async fn test_partial_payments_close_debt() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let debt = open_debt(&db).await;
        let service = db.debt_payments();

        let debt_after = service
            .record_at(&debt.id, base(100), "cashier-1", Some("first"), at())
            .await
            .unwrap();
        assert_eq!(debt_after.remaining_amount, Money::from_major(200));
        assert_eq!(debt_after.status, DebtStatus::Pending);

        let closed = service
            .record_at(&debt.id, base(200), "cashier-1", None, at())
            .await
            .unwrap();
        assert_eq!(closed.remaining_amount, Money::zero());
        assert_eq!(closed.paid_amount, Money::from_major(500));
        assert_eq!(closed.status, DebtStatus::Paid);

        let stored = db.debts().get_by_id(&debt.id).await.unwrap().unwrap();
        assert_eq!(stored, closed);
        assert_eq!(stored.payments.len(), 2);
        assert_eq!(stored.payments[0].note.as_deref(), Some("first"));
        assert_eq!(stored.repaid(), Money::from_major(300));
    }

    #[tokio::test]
    async fn test_overpayment_leaves_debt_unchanged() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let debt = open_debt(&db).await;

        let err = db
            .debt_payments()
            .record_at(&debt.id, base(301), "cashier-1", None, at())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::OverPayment { .. })));

        let stored = db.debts().get_by_id(&debt.id).await.unwrap().unwrap();
        assert_eq!(stored, debt);
    }

    #[tokio::test]
    async fn test_paid_debt_rejects_payments() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let debt = open_debt(&db).await;
        let service = db.debt_payments();

        service
            .record_at(&debt.id, base(300), "cashier-1", None, at())
            .await
            .unwrap();
        let err = service
            .record_at(&debt.id, base(1), "cashier-1", None, at())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::DebtAlreadyPaid(_))));
    }

    #[tokio::test]
    async fn test_rejects_non_positive_and_unknown() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let debt = open_debt(&db).await;
        let service = db.debt_payments();

        let err = service
            .record_at(&debt.id, base(0), "cashier-1", None, at())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));

        let err = service
            .record("no-such-debt", Money::from_major(10), "cashier-1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::DebtNotFound(_))));
    }

    #[tokio::test]
    async fn test_display_payment_converts_at_snapshot() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let rate = ExchangeRate::new(dec!(12500)).unwrap();
        db.settings().set_exchange_rate(rate).await.unwrap();
        let debt = open_debt(&db).await;

        let updated = db
            .debt_payments()
            .record_at(
                &debt.id,
                PaymentAmount::Display(dec!(1250000)),
                "cashier-1",
                None,
                at(),
            )
            .await
            .unwrap();

        assert_eq!(updated.remaining_amount, Money::from_major(200));
        assert_eq!(updated.payments[0].amount, Money::from_major(100));
        assert_eq!(updated.payments[0].exchange_rate, rate);

        // A later rate change does not touch recorded history
        db.settings()
            .set_exchange_rate(ExchangeRate::new(dec!(13000)).unwrap())
            .await
            .unwrap();
        let stored = db.debts().get_by_id(&debt.id).await.unwrap().unwrap();
        assert_eq!(stored.payments[0].exchange_rate, rate);
        assert_eq!(stored.remaining_amount, Money::from_major(200));
    }
}
