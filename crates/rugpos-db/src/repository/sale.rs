//! # Sale Repository
//!
//! Settled basket lines and the reports read from them.
//!
//! ## Measure Columns
//! ```text
//! ┌──────────────┬──────────┬───────┬───────┬────────┬────────┐
//! │ sale_unit    │ quantity │ size  │ width │ height │ length │
//! ├──────────────┼──────────┼───────┼───────┼────────┼────────┤
//! │ count        │ pieces   │ label │       │        │        │
//! │ area         │ pieces   │       │ W     │ H      │        │
//! │ length       │          │       │ roll  │        │ meters │
//! └──────────────┴──────────┴───────┴───────┴────────┴────────┘
//! ```
//!
//! Sales are immutable. The id is `{order_id}:{line}`, and inserts use
//! `INSERT OR IGNORE`, so a retried checkout writes each line once.

use chrono::{DateTime, Utc};
use rugpos_core::{Measure, OrderSummary, Sale, SaleUnit, TenderBreakdown, TenderKind};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use super::{
    decimal_column, money_column, money_text, opt_decimal_text, opt_money_column, opt_money_text,
    timestamp_column, timestamp_text,
};
use crate::error::{DbError, DbResult};

const SALE_COLUMNS: &str = "id, order_id, product_id, product_name, sale_unit, quantity, size, \
                            width, height, length, book_amount, amount, attributed_profit, \
                            store_margin, payment_kind, is_credit_sale, sold_at";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts a sale on the given connection.
    ///
    /// ## Returns
    /// `true` when the row was written, `false` when a sale with the same
    /// id already existed.
    pub async fn insert_on(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<bool> {
        let (quantity, size, width, height, length) = measure_columns(&sale.measure);

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO sales (
                id, order_id, product_id, product_name,
                sale_unit, quantity, size, width, height, length,
                book_amount, amount, attributed_profit, store_margin,
                payment_kind, is_credit_sale, sold_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14,
                ?15, ?16, ?17
            )
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.order_id)
        .bind(&sale.product_id)
        .bind(&sale.product_name)
        .bind(sale.sale_unit())
        .bind(quantity)
        .bind(size)
        .bind(width)
        .bind(height)
        .bind(length)
        .bind(money_text(sale.book_amount))
        .bind(money_text(sale.amount))
        .bind(money_text(sale.attributed_profit))
        .bind(opt_money_text(sale.store_margin))
        .bind(sale.payment_kind)
        .bind(sale.is_credit_sale)
        .bind(timestamp_text(sale.date))
        .execute(&mut *conn)
        .await?;

        let inserted = result.rows_affected() > 0;
        debug!(
            id = %sale.id,
            amount = %sale.amount,
            payment_kind = sale.payment_kind.as_str(),
            inserted,
            "Sale written"
        );
        Ok(inserted)
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let row = sqlx::query(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(sale_from_row).transpose()
    }

    /// Lists the sales of one order in line order.
    pub async fn list_by_order(&self, order_id: &str) -> DbResult<Vec<Sale>> {
        let mut conn = self.pool.acquire().await?;
        Self::list_by_order_on(&mut conn, order_id).await
    }

    pub async fn list_by_order_on(
        conn: &mut SqliteConnection,
        order_id: &str,
    ) -> DbResult<Vec<Sale>> {
        // rowid follows insertion, which follows line order
        let rows = sqlx::query(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE order_id = ?1 ORDER BY rowid"
        ))
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

        rows.iter().map(sale_from_row).collect()
    }

    /// Lists sales with `from <= sold_at < to`, oldest first.
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Sale>> {
        let rows = sqlx::query(&format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE sold_at >= ?1 AND sold_at < ?2 \
             ORDER BY sold_at, rowid"
        ))
        .bind(timestamp_text(from))
        .bind(timestamp_text(to))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(sale_from_row).collect()
    }

    /// Sale amounts per payment kind over a period (cash-drawer check).
    pub async fn tender_breakdown(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<TenderBreakdown> {
        let sales = self.list_between(from, to).await?;
        Ok(TenderBreakdown::from_sales(&sales))
    }

    /// Sales over a period grouped into orders.
    pub async fn order_summaries(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<OrderSummary>> {
        let sales = self.list_between(from, to).await?;
        Ok(OrderSummary::group(&sales))
    }

    /// Counts stored sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

type MeasureColumns = (
    Option<i64>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn measure_columns(measure: &Measure) -> MeasureColumns {
    match measure {
        Measure::Count { quantity, size } => {
            (Some(i64::from(*quantity)), size.clone(), None, None, None)
        }
        Measure::Area {
            width,
            height,
            pieces,
        } => (
            Some(i64::from(*pieces)),
            None,
            opt_decimal_text(Some(*width)),
            opt_decimal_text(Some(*height)),
            None,
        ),
        Measure::Length { width, length } => (
            None,
            None,
            opt_decimal_text(Some(*width)),
            None,
            opt_decimal_text(Some(*length)),
        ),
    }
}

fn sale_from_row(row: &SqliteRow) -> DbResult<Sale> {
    let unit: SaleUnit = row.try_get("sale_unit")?;
    let measure = match unit {
        SaleUnit::Count => Measure::Count {
            quantity: pieces_column(row)?,
            size: row.try_get("size")?,
        },
        SaleUnit::Area => Measure::Area {
            width: decimal_column(row, "width")?,
            height: decimal_column(row, "height")?,
            pieces: pieces_column(row)?,
        },
        SaleUnit::Length => Measure::Length {
            width: decimal_column(row, "width")?,
            length: decimal_column(row, "length")?,
        },
    };

    let payment_kind: TenderKind = row.try_get("payment_kind")?;
    Ok(Sale {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        product_id: row.try_get("product_id")?,
        product_name: row.try_get("product_name")?,
        measure,
        book_amount: money_column(row, "book_amount")?,
        amount: money_column(row, "amount")?,
        attributed_profit: money_column(row, "attributed_profit")?,
        store_margin: opt_money_column(row, "store_margin")?,
        payment_kind,
        is_credit_sale: row.try_get("is_credit_sale")?,
        date: timestamp_column(row, "sold_at")?,
    })
}

fn pieces_column(row: &SqliteRow) -> DbResult<u32> {
    let quantity: Option<i64> = row.try_get("quantity")?;
    let quantity = quantity.ok_or_else(|| DbError::decode("quantity", "missing"))?;
    u32::try_from(quantity).map_err(|e| DbError::decode("quantity", e))
}

// =============================================================================
// Unit Tests
// =============================================================================
