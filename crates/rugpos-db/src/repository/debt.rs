//! # Debt Repository
//!
//! Debts, their payments, and the debt screens' read side.
//!
//! ## Debt Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout with shortfall                                                │
//! │     └── insert_on()          → Debt { status: Pending }                 │
//! │                                                                         │
//! │  repayment (DebtPaymentService, one transaction)                        │
//! │     ├── get_by_id_on()                                                  │
//! │     ├── update_balance_on()  ← guarded by the remaining balance read    │
//! │     └── insert_payment_on()                                             │
//! │                                                                         │
//! │  remaining reaches 0         → Debt { status: Paid }  (terminal)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Overdue is never stored. [`DebtRepository::list_overdue`] and
//! [`DebtRepository::summary`] project it from the deadline at read time.

use chrono::{DateTime, Utc};
use rugpos_core::{BasketLine, Debt, DebtPayment, DebtStatus, DebtSummary, ExchangeRate, Money};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{decimal_column, money_column, money_text, timestamp_column, timestamp_text};
use crate::error::{DbError, DbResult};

const DEBT_COLUMNS: &str = "id, order_id, debtor_name, contact_phone, order_details, \
                            line_snapshot, total_amount, initial_payment, paid_amount, \
                            remaining_amount, deadline, status, created_at";

const PAYMENT_COLUMNS: &str = "id, debt_id, amount, paid_at, recorded_by, note, exchange_rate";

/// Repository for debt database operations.
#[derive(Debug, Clone)]
pub struct DebtRepository {
    pool: SqlitePool,
}

impl DebtRepository {
    /// Creates a new DebtRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DebtRepository { pool }
    }

    // =========================================================================
    // Writes (composed by services inside a transaction)
    // =========================================================================

    /// Inserts a freshly opened debt and any payments it already carries.
    pub async fn insert_on(conn: &mut SqliteConnection, debt: &Debt) -> DbResult<()> {
        debug!(id = %debt.id, order_id = %debt.order_id, "Inserting debt");

        let snapshot = serde_json::to_string(&debt.line_snapshot)
            .map_err(|e| DbError::Internal(format!("line snapshot: {e}")))?;
        let now = timestamp_text(debt.created_at);

        sqlx::query(
            r#"
            INSERT INTO debts (
                id, order_id, debtor_name, contact_phone, order_details, line_snapshot,
                total_amount, initial_payment, paid_amount, remaining_amount,
                deadline, status, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?13
            )
            "#,
        )
        .bind(&debt.id)
        .bind(&debt.order_id)
        .bind(&debt.debtor_name)
        .bind(&debt.contact_phone)
        .bind(&debt.order_details)
        .bind(snapshot)
        .bind(money_text(debt.total_amount))
        .bind(money_text(debt.initial_payment))
        .bind(money_text(debt.paid_amount))
        .bind(money_text(debt.remaining_amount))
        .bind(timestamp_text(debt.deadline))
        .bind(debt.status)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        for payment in &debt.payments {
            Self::insert_payment_on(conn, payment).await?;
        }

        Ok(())
    }

    /// Writes a debt's new balance.
    ///
    /// The update only applies while the row still holds
    /// `expected_remaining` and is pending; otherwise another writer got
    /// there first and [`DbError::Conflict`] is returned.
    pub async fn update_balance_on(
        conn: &mut SqliteConnection,
        debt: &Debt,
        expected_remaining: Money,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE debts SET
                paid_amount = ?2,
                remaining_amount = ?3,
                status = ?4,
                updated_at = ?5
            WHERE id = ?1 AND status = 'pending' AND remaining_amount = ?6
            "#,
        )
        .bind(&debt.id)
        .bind(money_text(debt.paid_amount))
        .bind(money_text(debt.remaining_amount))
        .bind(debt.status)
        .bind(timestamp_text(at))
        .bind(money_text(expected_remaining))
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict {
                entity: "Debt".to_string(),
                id: debt.id.clone(),
            });
        }

        Ok(())
    }

    /// Appends a payment row.
    pub async fn insert_payment_on(
        conn: &mut SqliteConnection,
        payment: &DebtPayment,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO debt_payments (
                id, debt_id, amount, paid_at, recorded_by, note, exchange_rate
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.debt_id)
        .bind(money_text(payment.amount))
        .bind(timestamp_text(payment.date))
        .bind(&payment.recorded_by)
        .bind(&payment.note)
        .bind(payment.exchange_rate.value().to_string())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a debt with its payments.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Debt>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_by_id_on(&mut conn, id).await
    }

    pub async fn get_by_id_on(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Debt>> {
        let row = sqlx::query(&format!("SELECT {DEBT_COLUMNS} FROM debts WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(Some(load_payments(conn, debt_from_row(&row)?).await?)),
            None => Ok(None),
        }
    }

    /// Gets the debt opened for an order, if any.
    pub async fn get_by_order(&self, order_id: &str) -> DbResult<Option<Debt>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_by_order_on(&mut conn, order_id).await
    }

    pub async fn get_by_order_on(
        conn: &mut SqliteConnection,
        order_id: &str,
    ) -> DbResult<Option<Debt>> {
        let row = sqlx::query(&format!(
            "SELECT {DEBT_COLUMNS} FROM debts WHERE order_id = ?1"
        ))
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => Ok(Some(load_payments(conn, debt_from_row(&row)?).await?)),
            None => Ok(None),
        }
    }

    /// Lists debts, newest first, optionally filtered by stored status.
    pub async fn list(&self, status: Option<DebtStatus>) -> DbResult<Vec<Debt>> {
        let mut conn = self.pool.acquire().await?;

        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {DEBT_COLUMNS} FROM debts WHERE status = ?1 \
                     ORDER BY created_at DESC, rowid DESC"
                ))
                .bind(status)
                .fetch_all(&mut *conn)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {DEBT_COLUMNS} FROM debts ORDER BY created_at DESC, rowid DESC"
                ))
                .fetch_all(&mut *conn)
                .await?
            }
        };

        let mut debts = Vec::with_capacity(rows.len());
        for row in &rows {
            debts.push(load_payments(&mut conn, debt_from_row(row)?).await?);
        }
        Ok(debts)
    }

    /// Pending debts whose deadline has passed at `now`.
    pub async fn list_overdue(&self, now: DateTime<Utc>) -> DbResult<Vec<Debt>> {
        let pending = self.list(Some(DebtStatus::Pending)).await?;
        Ok(pending.into_iter().filter(|d| d.is_overdue(now)).collect())
    }

    /// Header totals for the debt screens.
    pub async fn summary(&self, now: DateTime<Utc>) -> DbResult<DebtSummary> {
        let debts = self.list(None).await?;
        Ok(DebtSummary::from_debts(&debts, now))
    }

    /// Deletes a debt and its payments. Sales of the order are untouched.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM debts WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Debt", id));
        }

        info!(id = %id, "Debt deleted");
        Ok(())
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

async fn load_payments(conn: &mut SqliteConnection, mut debt: Debt) -> DbResult<Debt> {
    let rows = sqlx::query(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM debt_payments WHERE debt_id = ?1 ORDER BY paid_at, rowid"
    ))
    .bind(&debt.id)
    .fetch_all(&mut *conn)
    .await?;

    debt.payments = rows.iter().map(payment_from_row).collect::<DbResult<_>>()?;
    Ok(debt)
}

fn debt_from_row(row: &SqliteRow) -> DbResult<Debt> {
    let snapshot: String = row.try_get("line_snapshot")?;
    let line_snapshot: Vec<BasketLine> =
        serde_json::from_str(&snapshot).map_err(|e| DbError::decode("line_snapshot", e))?;
    let status: DebtStatus = row.try_get("status")?;

    Ok(Debt {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        debtor_name: row.try_get("debtor_name")?,
        contact_phone: row.try_get("contact_phone")?,
        order_details: row.try_get("order_details")?,
        line_snapshot,
        total_amount: money_column(row, "total_amount")?,
        initial_payment: money_column(row, "initial_payment")?,
        paid_amount: money_column(row, "paid_amount")?,
        remaining_amount: money_column(row, "remaining_amount")?,
        deadline: timestamp_column(row, "deadline")?,
        status,
        payments: Vec::new(),
        created_at: timestamp_column(row, "created_at")?,
    })
}

fn payment_from_row(row: &SqliteRow) -> DbResult<DebtPayment> {
    let exchange_rate = ExchangeRate::new(decimal_column(row, "exchange_rate")?)
        .map_err(|e| DbError::decode("exchange_rate", e))?;

    Ok(DebtPayment {
        id: row.try_get("id")?,
        debt_id: row.try_get("debt_id")?,
        amount: money_column(row, "amount")?,
        date: timestamp_column(row, "paid_at")?,
        recorded_by: row.try_get("recorded_by")?,
        note: row.try_get("note")?,
        exchange_rate,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
