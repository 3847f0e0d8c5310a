//! # Settlement Engine
//!
//! Turns a basket, the seller's declared grand total and the tenders taken
//! into one [`Sale`] per line.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  basket ──► book_i ──► book_total ──► total_profit = declared − book    │
//! │                                             │                           │
//! │                                             ▼                           │
//! │            profit_i = total_profit × book_i / book_total                │
//! │            amount_i = book_i + profit_i                                 │
//! │                                             │                           │
//! │                                             ▼                           │
//! │  tenders ──► buckets [cash, card, transfer] ──► classify line ──► Sale  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tender Classification
//! Each line takes exactly one kind. Lines are visited in basket order and
//! take the first non-empty bucket. A bucket that covers the line is
//! decremented; one that does not is emptied, so the next line moves on.
//! When every liquid bucket is empty the line is owed on a debt.
//!
//! ```text
//! cash 100, card 80      line 120 ──► cash  (cash 100 → 0)
//!                        line  60 ──► card  (card  80 → 20)
//! ```
//!
//! The engine does not check that the tenders cover the declared total. It
//! reports the [`Settlement::shortfall`] and leaves opening a debt to the
//! caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::catalog::{Collection, PriceBook};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{cost_basis, credit_rate};
use crate::reports::TenderBreakdown;
use crate::types::{BasketLine, PricingMode, Sale, Tender, TenderKind};
use crate::validation::{
    validate_amount, validate_basket_size, validate_price, validate_tender_amount,
};

// =============================================================================
// Order Context
// =============================================================================

/// Identity and timestamp shared by every sale of one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderContext {
    pub order_id: String,
    pub sold_at: DateTime<Utc>,
}

impl OrderContext {
    /// Fresh UUID v4 order id, stamped at the caller's `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        OrderContext {
            order_id: uuid::Uuid::new_v4().to_string(),
            sold_at: now,
        }
    }

    /// A caller-chosen id and time, for retries and tests.
    pub fn pinned(order_id: impl Into<String>, sold_at: DateTime<Utc>) -> Self {
        OrderContext {
            order_id: order_id.into(),
            sold_at,
        }
    }
}

// =============================================================================
// Tender Buckets
// =============================================================================

/// Remaining liquid tender per kind while lines are classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TenderBuckets {
    pub cash: Money,
    pub card: Money,
    pub transfer: Money,
}

impl TenderBuckets {
    /// Sums tenders of the same kind. Debt tenders are not a bucket.
    pub fn from_tenders(tenders: &[Tender]) -> CoreResult<Self> {
        let mut buckets = TenderBuckets::default();
        for tender in tenders {
            validate_tender_amount(tender.amount)?;
            if let Some(bucket) = buckets.bucket_mut(tender.kind) {
                *bucket += tender.amount;
            }
        }
        Ok(buckets)
    }

    fn bucket_mut(&mut self, kind: TenderKind) -> Option<&mut Money> {
        match kind {
            TenderKind::Cash => Some(&mut self.cash),
            TenderKind::Card => Some(&mut self.card),
            TenderKind::Transfer => Some(&mut self.transfer),
            TenderKind::Debt => None,
        }
    }

    pub fn total(&self) -> Money {
        self.cash + self.card + self.transfer
    }

    pub fn is_empty(&self) -> bool {
        !self.total().is_positive()
    }

    /// Picks the kind for a line of `amount` and drains that bucket.
    pub fn classify(&mut self, amount: Money) -> TenderKind {
        for kind in TenderKind::LIQUID {
            let Some(bucket) = self.bucket_mut(kind) else {
                continue;
            };
            if !bucket.is_positive() {
                continue;
            }
            if *bucket >= amount {
                *bucket -= amount;
            } else {
                *bucket = Money::zero();
            }
            return kind;
        }
        TenderKind::Debt
    }
}

// =============================================================================
// Settlement
// =============================================================================

/// The result of settling one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Settlement {
    pub order_id: String,
    pub sales: Vec<Sale>,
    pub declared_total: Money,
    pub book_total: Money,
    /// `declared_total − book_total`; negative for a discount.
    pub total_profit: Money,
    /// Tendered amounts per kind, as declared.
    pub tendered: TenderBreakdown,
    /// Part of the declared total not covered by cash, card or transfer.
    pub shortfall: Money,
}

impl Settlement {
    /// True when a debt must be opened for the shortfall.
    pub fn needs_debt(&self) -> bool {
        self.shortfall.is_positive()
    }

    /// Liquid tender actually taken, capped at the declared total.
    pub fn paid_now(&self) -> Money {
        self.declared_total - self.shortfall
    }
}

/// Settles a basket.
///
/// Rejects an empty basket, a non-positive declared total, a negative line
/// total and negative tenders. Amounts above
/// [`MAX_AMOUNT_MAJOR`](crate::MAX_AMOUNT_MAJOR) are rejected too. Nothing is
/// emitted unless every check passes.
///
/// Under [`PricingMode::Credit`] each line is re-priced from its
/// collection's credit rate (over the priced area, or the quantity when the
/// line has no area). Lines whose collection has no credit rate keep their
/// basket total.
pub fn settle<B: PriceBook + ?Sized>(
    basket: &[BasketLine],
    declared_total: Money,
    tenders: &[Tender],
    mode: PricingMode,
    book: &B,
    ctx: OrderContext,
) -> CoreResult<Settlement> {
    if basket.is_empty() {
        return Err(CoreError::EmptyBasket);
    }
    validate_basket_size(basket.len())?;
    if !declared_total.is_positive() {
        return Err(CoreError::NonPositiveTotal(declared_total));
    }
    validate_amount("declared total", declared_total)?;
    for line in basket {
        validate_price(line.total)?;
    }
    let mut buckets = TenderBuckets::from_tenders(tenders)?;
    let tendered = TenderBreakdown::from_tenders(tenders);

    let books = basket
        .iter()
        .map(|line| book_amount(line, mode, book))
        .collect::<CoreResult<Vec<Money>>>()?;
    let book_total = books
        .iter()
        .try_fold(Money::zero(), |sum, &book_i| sum.checked_add(book_i))
        .ok_or(CoreError::AmountOverflow("book total"))?;
    let total_profit = declared_total - book_total;

    let OrderContext { order_id, sold_at } = ctx;
    let mut sales = Vec::with_capacity(basket.len());
    for (n, (line, &book_i)) in basket.iter().zip(&books).enumerate() {
        let profit = total_profit
            .share(book_i, book_total)
            .ok_or(CoreError::AmountOverflow("attributed profit"))?;
        let amount = book_i + profit;
        sales.push(Sale {
            id: format!("{order_id}:{}", n + 1),
            order_id: order_id.clone(),
            product_id: line.product_id.clone(),
            product_name: line.product_name.clone(),
            measure: line.measure.clone(),
            book_amount: book_i,
            amount,
            attributed_profit: profit,
            store_margin: store_margin(line, book_i, book),
            payment_kind: buckets.classify(amount),
            is_credit_sale: mode == PricingMode::Credit,
            date: sold_at,
        });
    }

    let shortfall = (declared_total - tendered.liquid_total()).non_negative();

    Ok(Settlement {
        order_id,
        sales,
        declared_total,
        book_total,
        total_profit,
        tendered,
        shortfall,
    })
}

fn line_collection<'a, B: PriceBook + ?Sized>(
    line: &'a BasketLine,
    book: &'a B,
) -> Option<&'a Collection> {
    let name = line.collection.as_deref().or_else(|| {
        book.item(&line.product_id)
            .and_then(|item| item.collection.as_deref())
    });
    book.collection_for(name)
}

fn book_amount<B: PriceBook + ?Sized>(
    line: &BasketLine,
    mode: PricingMode,
    book: &B,
) -> CoreResult<Money> {
    let Some(rate) = credit_rate(line_collection(line, book), mode) else {
        return Ok(line.total);
    };
    let basis = line
        .measure
        .priced_area()
        .unwrap_or_else(|| line.measure.quantity());
    let amount = rate
        .checked_mul(basis)
        .ok_or(CoreError::AmountOverflow("credit book amount"))?;
    validate_amount("credit book amount", amount)?;
    Ok(amount)
}

fn store_margin<B: PriceBook + ?Sized>(line: &BasketLine, book_i: Money, book: &B) -> Option<Money> {
    let item = book.item(&line.product_id)?;
    cost_basis(item, line_collection(line, book), &line.measure)
        .and_then(|cost| book_i.checked_sub(cost))
}

// =============================================================================
// Unit Tests
// =============================================================================
