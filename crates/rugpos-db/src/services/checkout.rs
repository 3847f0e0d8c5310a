//! # Checkout Service
//!
//! Settles a basket and persists the result in one transaction: every sale
//! of the order, plus the debt for the shortfall when there is one.
//!
//! ## Retrying
//! Sale ids derive from the order id, and an order has at most one debt.
//! Re-submitting the same request with the same pinned [`OrderContext`]
//! after an uncertain failure writes nothing new and returns the stored
//! debt. A request that reuses a recorded order id with different lines,
//! amounts, tenders or debtor is rejected with [`DbError::Conflict`].

use chrono::{DateTime, Utc};
use rugpos_core::debt::deadline_after;
use rugpos_core::{
    settle, BasketLine, CoreError, Debt, ExchangeRate, Money, OpenDebt, OrderContext,
    PricingMode, Sale, Settlement, Tender, ValidationError,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::catalog::CatalogRepository;
use crate::repository::debt::DebtRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::settings::SettingsRepository;

// =============================================================================
// Request / Receipt
// =============================================================================

/// Who owes the shortfall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtorInfo {
    pub name: String,
    pub phone: String,
    /// Defaults to the configured repayment term after the sale.
    pub deadline: Option<DateTime<Utc>>,
}

impl DebtorInfo {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        DebtorInfo {
            name: name.into(),
            phone: phone.into(),
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Everything the checkout screen submits.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub basket: Vec<BasketLine>,
    pub declared_total: Money,
    pub tenders: Vec<Tender>,
    pub mode: PricingMode,
    /// Required when the liquid tenders fall short of the declared total.
    pub debtor: Option<DebtorInfo>,
    pub order: OrderContext,
}

impl CheckoutRequest {
    pub fn new(basket: Vec<BasketLine>, declared_total: Money, tenders: Vec<Tender>) -> Self {
        CheckoutRequest {
            basket,
            declared_total,
            tenders,
            mode: PricingMode::Standard,
            debtor: None,
            order: OrderContext::new(Utc::now()),
        }
    }

    pub fn with_mode(mut self, mode: PricingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_debtor(mut self, debtor: DebtorInfo) -> Self {
        self.debtor = Some(debtor);
        self
    }

    pub fn with_order(mut self, order: OrderContext) -> Self {
        self.order = order;
        self
    }
}

/// What a committed checkout produced.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub settlement: Settlement,
    pub debt: Option<Debt>,
    /// Rate snapshot taken at the start of the checkout, for display.
    pub exchange_rate: ExchangeRate,
    /// Sales newly written; zero on a replayed request.
    pub sales_written: usize,
}

impl CheckoutReceipt {
    pub fn order_id(&self) -> &str {
        &self.settlement.order_id
    }

    pub fn is_replay(&self) -> bool {
        self.sales_written == 0
    }
}

// =============================================================================
// Service
// =============================================================================

/// Atomic checkout.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    pool: SqlitePool,
    fallback_rate: ExchangeRate,
    debt_term_days: i64,
}

impl CheckoutService {
    pub fn new(pool: SqlitePool, fallback_rate: ExchangeRate, debt_term_days: i64) -> Self {
        CheckoutService {
            pool,
            fallback_rate,
            debt_term_days,
        }
    }

    /// Settles and persists an order.
    ///
    /// ## Errors
    /// - Any settlement rejection (empty basket, non-positive total, ...)
    /// - `debtor name is required` when there is a shortfall and no debtor
    /// - Debtor validation failures from opening the debt
    /// - `Conflict` when the order id is already recorded with other content
    ///
    /// Nothing is written unless the whole order commits.
    pub async fn checkout(&self, request: CheckoutRequest) -> DbResult<CheckoutReceipt> {
        let CheckoutRequest {
            basket,
            declared_total,
            tenders,
            mode,
            debtor,
            order,
        } = request;
        let sold_at = order.sold_at;

        let mut tx = self.pool.begin().await?;

        let exchange_rate =
            SettingsRepository::exchange_rate_on(&mut *tx, self.fallback_rate).await?;
        let catalog = CatalogRepository::snapshot_on(&mut *tx, &basket).await?;

        let settlement = settle(&basket, declared_total, &tenders, mode, &catalog, order)?;

        let debtor = match (settlement.needs_debt(), debtor) {
            (true, Some(debtor)) => Some(debtor),
            (true, None) => {
                return Err(CoreError::from(ValidationError::required("debtor name")).into());
            }
            (false, debtor) => {
                if debtor.is_some() {
                    debug!(order_id = %settlement.order_id, "Fully tendered, debtor ignored");
                }
                None
            }
        };

        let stored = SaleRepository::list_by_order_on(&mut *tx, &settlement.order_id).await?;
        let replay = !stored.is_empty();
        let mut sales_written = 0;
        if replay {
            if !same_sales(&stored, &settlement.sales) {
                return Err(order_conflict(&settlement.order_id));
            }
            debug!(order_id = %settlement.order_id, "Order already recorded");
        } else {
            for sale in &settlement.sales {
                if SaleRepository::insert_on(&mut *tx, sale).await? {
                    sales_written += 1;
                }
            }
        }

        let debt = match debtor {
            Some(debtor) => Some(
                self.open_debt_on(&mut *tx, &settlement, &basket, debtor, sold_at)
                    .await?,
            ),
            None => {
                if replay
                    && DebtRepository::get_by_order_on(&mut *tx, &settlement.order_id)
                        .await?
                        .is_some()
                {
                    return Err(order_conflict(&settlement.order_id));
                }
                None
            }
        };

        tx.commit().await?;

        info!(
            order_id = %settlement.order_id,
            lines = settlement.sales.len(),
            sales_written,
            declared_total = %settlement.declared_total,
            total_profit = %settlement.total_profit,
            shortfall = %settlement.shortfall,
            debt_id = debt.as_ref().map(|d| d.id.as_str()).unwrap_or("-"),
            "Checkout committed"
        );

        Ok(CheckoutReceipt {
            settlement,
            debt,
            exchange_rate,
            sales_written,
        })
    }

    async fn open_debt_on(
        &self,
        conn: &mut sqlx::SqliteConnection,
        settlement: &Settlement,
        basket: &[BasketLine],
        debtor: DebtorInfo,
        sold_at: DateTime<Utc>,
    ) -> DbResult<Debt> {
        let deadline = debtor
            .deadline
            .unwrap_or_else(|| deadline_after(sold_at, self.debt_term_days));
        let debt = OpenDebt::for_settlement(settlement, basket, debtor.name, debtor.phone)
            .with_deadline(deadline)
            .open(sold_at)?;

        if let Some(existing) = DebtRepository::get_by_order_on(conn, &settlement.order_id).await? {
            if !same_debt_terms(&existing, &debt) {
                return Err(order_conflict(&settlement.order_id));
            }
            debug!(debt_id = %existing.id, "Debt already recorded for order");
            return Ok(existing);
        }

        DebtRepository::insert_on(conn, &debt).await?;
        Ok(debt)
    }
}

fn order_conflict(order_id: &str) -> DbError {
    DbError::Conflict {
        entity: "order".to_string(),
        id: order_id.to_string(),
    }
}

/// Stored rows match a fresh settlement line for line; ids and dates aside.
fn same_sales(stored: &[Sale], fresh: &[Sale]) -> bool {
    stored.len() == fresh.len()
        && stored.iter().zip(fresh).all(|(old, new)| {
            Sale {
                id: new.id.clone(),
                date: new.date,
                ..old.clone()
            } == *new
        })
}

/// Payments may have landed since, so only the opening terms are compared.
fn same_debt_terms(stored: &Debt, fresh: &Debt) -> bool {
    stored.debtor_name == fresh.debtor_name
        && stored.contact_phone == fresh.contact_phone
        && stored.total_amount == fresh.total_amount
        && stored.initial_payment == fresh.initial_payment
        && stored.line_snapshot == fresh.line_snapshot
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use chrono::{Duration, TimeZone};
    use rugpos_core::{CatalogItem, Collection, DebtStatus, Measure, TenderKind};
    use rust_decimal_macros::dec;

    fn sold_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 10, 15, 0, 0).unwrap()
    }

    fn basket() -> Vec<BasketLine> {
        vec![
            BasketLine::new(
                "atlas-1",
                "Atlas",
                None,
                Measure::Area {
                    width: dec!(2),
                    height: dec!(2.5),
                    pieces: 1,
                },
                Money::from_major(100),
            ),
            // 20 per running meter × 2.5 m
            BasketLine::new(
                "runner-4",
                "Runner",
                None,
                Measure::Length {
                    width: dec!(4),
                    length: dec!(2.5),
                },
                Money::from_major(20),
            ),
        ]
    }

    fn request(tenders: Vec<Tender>) -> CheckoutRequest {
        CheckoutRequest::new(basket(), Money::from_major(180), tenders)
            .with_order(OrderContext::pinned("order-1", sold_at()))
    }

    fn cash(amount: i64) -> Tender {
        Tender::new(TenderKind::Cash, Money::from_major(amount))
    }

    fn card(amount: i64) -> Tender {
        Tender::new(TenderKind::Card, Money::from_major(amount))
    }

    #[tokio::test]
    async fn test_fully_tendered_checkout() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let receipt = db
            .checkout()
            .checkout(request(vec![cash(100), card(80)]))
            .await
            .unwrap();

        assert!(receipt.debt.is_none());
        assert_eq!(receipt.sales_written, 2);
        assert_eq!(receipt.exchange_rate, ExchangeRate::DEFAULT);
        assert_eq!(receipt.settlement.total_profit, Money::from_major(30));

        let stored = db.sales().list_by_order("order-1").await.unwrap();
        assert_eq!(stored, receipt.settlement.sales);
        assert_eq!(stored[0].amount, Money::from_major(120));
        assert_eq!(stored[0].payment_kind, TenderKind::Cash);
        assert_eq!(stored[1].amount, Money::from_major(60));
        assert_eq!(stored[1].payment_kind, TenderKind::Card);
    }

    #[tokio::test]
    async fn test_shortfall_without_debtor_writes_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err = db
            .checkout()
            .checkout(request(vec![cash(100)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::Required { .. }))
        ));
        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert!(db.debts().list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shortfall_opens_debt() {
        let db = Database::new(DbConfig::in_memory().debt_term_days(10))
            .await
            .unwrap();

        let receipt = db
            .checkout()
            .checkout(
                request(vec![cash(100)])
                    .with_debtor(DebtorInfo::new("  Dilnoza  ", "+998 91 555 00 11")),
            )
            .await
            .unwrap();

        let debt = receipt.debt.expect("debt opened");
        assert_eq!(debt.order_id, "order-1");
        assert_eq!(debt.debtor_name, "Dilnoza");
        assert_eq!(debt.total_amount, Money::from_major(180));
        assert_eq!(debt.initial_payment, Money::from_major(100));
        assert_eq!(debt.remaining_amount, Money::from_major(80));
        assert_eq!(debt.status, DebtStatus::Pending);
        assert_eq!(debt.deadline, sold_at() + Duration::days(10));
        assert_eq!(debt.order_details, "Atlas (2×2.5), Runner (2.5 m)");

        // Cash covered part of the carpet; the runner went on credit
        let sales = &receipt.settlement.sales;
        assert_eq!(sales[0].payment_kind, TenderKind::Cash);
        assert_eq!(sales[1].payment_kind, TenderKind::Debt);

        let stored = db.debts().get_by_order("order-1").await.unwrap().unwrap();
        assert_eq!(stored, debt);
    }

    #[tokio::test]
    async fn test_replayed_checkout_writes_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let submit = || {
            request(vec![cash(100)]).with_debtor(DebtorInfo::new("Dilnoza", "+998 91 555 00 11"))
        };

        let first = db.checkout().checkout(submit()).await.unwrap();
        let second = db.checkout().checkout(submit()).await.unwrap();

        assert!(!first.is_replay());
        assert!(second.is_replay());
        assert_eq!(
            first.debt.as_ref().map(|d| &d.id),
            second.debt.as_ref().map(|d| &d.id)
        );
        assert_eq!(db.sales().count().await.unwrap(), 2);
        assert_eq!(db.debts().list(None).await.unwrap().len(), 1);
    }

    fn piece(product_id: &str, total: i64) -> BasketLine {
        BasketLine::new(
            product_id,
            product_id,
            None,
            Measure::Count {
                quantity: 1,
                size: None,
            },
            Money::from_major(total),
        )
    }

    #[tokio::test]
    async fn test_reused_order_id_with_other_lines_conflicts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = OrderContext::pinned("order-x", sold_at());

        db.checkout()
            .checkout(
                CheckoutRequest::new(
                    vec![piece("a", 100), piece("b", 100)],
                    Money::from_major(200),
                    vec![cash(200)],
                )
                .with_order(order.clone()),
            )
            .await
            .unwrap();

        let err = db
            .checkout()
            .checkout(
                CheckoutRequest::new(
                    vec![piece("c", 50), piece("d", 50), piece("e", 50)],
                    Money::from_major(150),
                    vec![cash(150)],
                )
                .with_order(order),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { ref id, .. } if id == "order-x"));

        let stored = db.sales().list_by_order("order-x").await.unwrap();
        assert_eq!(stored.len(), 2);
        let total: Money = stored.iter().map(|sale| sale.amount).sum();
        assert_eq!(total, Money::from_major(200));
    }

    #[tokio::test]
    async fn test_reused_order_id_with_other_amounts_conflicts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        db.checkout()
            .checkout(request(vec![cash(180)]))
            .await
            .unwrap();

        // Same lines, different declared total
        let err = db
            .checkout()
            .checkout(
                CheckoutRequest::new(basket(), Money::from_major(200), vec![cash(200)])
                    .with_order(OrderContext::pinned("order-1", sold_at())),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        assert_eq!(db.sales().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_replay_with_other_debtor_conflicts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let first = db
            .checkout()
            .checkout(
                request(vec![cash(100)])
                    .with_debtor(DebtorInfo::new("Dilnoza", "+998 91 555 00 11")),
            )
            .await
            .unwrap();

        let err = db
            .checkout()
            .checkout(
                request(vec![cash(100)])
                    .with_debtor(DebtorInfo::new("Rustam", "+998 93 111 22 33")),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        let debts = db.debts().list(None).await.unwrap();
        assert_eq!(debts.len(), 1);
        assert_eq!(Some(&debts[0]), first.debt.as_ref());
    }

    #[test]
    fn test_new_request_gets_fresh_order() {
        let first = CheckoutRequest::new(basket(), Money::from_major(180), vec![]);
        let second = CheckoutRequest::new(basket(), Money::from_major(180), vec![]);
        assert_ne!(first.order.order_id, second.order.order_id);
    }

    #[tokio::test]
    async fn test_credit_mode_reprices_from_stored_collection() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.catalog()
            .upsert_collection(
                &Collection::new("Atlas")
                    .with_rate(Money::from_major(20))
                    .with_credit_rate(Money::from_major(25))
                    .with_buy_rate(Money::from_major(12)),
            )
            .await
            .unwrap();
        db.catalog()
            .upsert_item(&CatalogItem::area("atlas-1", "Atlas", "Atlas"))
            .await
            .unwrap();

        // 2 × 2.5 = 5 m² at the standard 20/m²
        let line = basket().remove(0);
        let receipt = db
            .checkout()
            .checkout(
                CheckoutRequest::new(vec![line], Money::from_major(125), vec![cash(125)])
                    .with_mode(PricingMode::Credit)
                    .with_order(OrderContext::pinned("order-2", sold_at())),
            )
            .await
            .unwrap();

        let sale = &receipt.settlement.sales[0];
        assert!(sale.is_credit_sale);
        assert_eq!(sale.book_amount, Money::from_major(125));
        assert_eq!(sale.attributed_profit, Money::zero());
        assert_eq!(sale.store_margin, Some(Money::from_major(65)));
    }

    #[tokio::test]
    async fn test_uses_stored_exchange_rate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let rate = ExchangeRate::new(dec!(12800)).unwrap();
        db.settings().set_exchange_rate(rate).await.unwrap();

        let receipt = db
            .checkout()
            .checkout(request(vec![cash(180)]))
            .await
            .unwrap();
        assert_eq!(receipt.exchange_rate, rate);
    }
}
