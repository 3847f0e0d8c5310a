//! # Reports
//!
//! Read-side summaries over sale records: the per-kind tender breakdown
//! the cash drawer is reconciled against, and per-order grouping for the
//! daily sales screen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Sale, Tender, TenderKind};

// =============================================================================
// Tender Breakdown
// =============================================================================

/// Amounts per tender kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TenderBreakdown {
    pub cash: Money,
    pub card: Money,
    pub transfer: Money,
    pub debt: Money,
}

impl TenderBreakdown {
    /// Sums declared tenders per kind.
    pub fn from_tenders(tenders: &[Tender]) -> Self {
        let mut breakdown = TenderBreakdown::default();
        for tender in tenders {
            breakdown.add(tender.kind, tender.amount);
        }
        breakdown
    }

    /// Sums sale amounts by the kind each sale was tagged with.
    ///
    /// ## Example
    /// ```rust
    /// use rugpos_core::{TenderBreakdown, TenderKind};
    ///
    /// let breakdown = TenderBreakdown::from_sales(&[]);
    /// assert!(breakdown.total().is_zero());
    /// assert!(breakdown.get(TenderKind::Cash).is_zero());
    /// ```
    pub fn from_sales(sales: &[Sale]) -> Self {
        let mut breakdown = TenderBreakdown::default();
        for sale in sales {
            breakdown.add(sale.payment_kind, sale.amount);
        }
        breakdown
    }

    pub fn add(&mut self, kind: TenderKind, amount: Money) {
        match kind {
            TenderKind::Cash => self.cash += amount,
            TenderKind::Card => self.card += amount,
            TenderKind::Transfer => self.transfer += amount,
            TenderKind::Debt => self.debt += amount,
        }
    }

    pub fn get(&self, kind: TenderKind) -> Money {
        match kind {
            TenderKind::Cash => self.cash,
            TenderKind::Card => self.card,
            TenderKind::Transfer => self.transfer,
            TenderKind::Debt => self.debt,
        }
    }

    /// Cash + card + transfer.
    pub fn liquid_total(&self) -> Money {
        self.cash + self.card + self.transfer
    }

    pub fn total(&self) -> Money {
        self.liquid_total() + self.debt
    }
}

// =============================================================================
// Order Summary
// =============================================================================

/// One order as shown on the daily sales screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderSummary {
    pub order_id: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub line_count: usize,
    pub total_amount: Money,
    pub total_profit: Money,
    /// Distinct kinds, in the order lines were tagged.
    pub payment_kinds: Vec<TenderKind>,
    pub is_credit_sale: bool,
}

impl OrderSummary {
    /// Groups sales by order id, keeping the order orders first appear in.
    pub fn group(sales: &[Sale]) -> Vec<OrderSummary> {
        let mut summaries: Vec<OrderSummary> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for sale in sales {
            let slot = *index.entry(sale.order_id.as_str()).or_insert_with(|| {
                summaries.push(OrderSummary {
                    order_id: sale.order_id.clone(),
                    date: sale.date,
                    line_count: 0,
                    total_amount: Money::zero(),
                    total_profit: Money::zero(),
                    payment_kinds: Vec::new(),
                    is_credit_sale: sale.is_credit_sale,
                });
                summaries.len() - 1
            });

            let summary = &mut summaries[slot];
            summary.line_count += 1;
            summary.total_amount += sale.amount;
            summary.total_profit += sale.attributed_profit;
            if !summary.payment_kinds.contains(&sale.payment_kind) {
                summary.payment_kinds.push(sale.payment_kind);
            }
        }

        summaries
    }

    /// True when lines of the order were tagged with more than one kind.
    pub fn is_mixed_tender(&self) -> bool {
        self.payment_kinds.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::settlement::{settle, OrderContext};
    use crate::types::{BasketLine, Measure, PricingMode};
    use chrono::TimeZone;

    fn line(total: i64) -> BasketLine {
        BasketLine::new(
            "p",
            "Rug",
            None,
            Measure::Count {
                quantity: 1,
                size: None,
            },
            Money::from_major(total),
        )
    }

    fn order(id: &str, basket: &[BasketLine], declared: i64, tenders: &[Tender]) -> Vec<Sale> {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        settle(
            basket,
            Money::from_major(declared),
            tenders,
            PricingMode::Standard,
            &Catalog::default(),
            OrderContext::pinned(id, at),
        )
        .unwrap()
        .sales
    }

    #[test]
    fn test_breakdown_from_sales() {
        let mut sales = order(
            "o-1",
            &[line(100), line(50)],
            180,
            &[
                Tender::new(TenderKind::Cash, Money::from_major(100)),
                Tender::new(TenderKind::Card, Money::from_major(80)),
            ],
        );
        sales.extend(order("o-2", &[line(40)], 40, &[]));

        let breakdown = TenderBreakdown::from_sales(&sales);
        assert_eq!(breakdown.cash, Money::from_major(120));
        assert_eq!(breakdown.card, Money::from_major(60));
        assert!(breakdown.transfer.is_zero());
        assert_eq!(breakdown.debt, Money::from_major(40));
        assert_eq!(breakdown.liquid_total(), Money::from_major(180));
        assert_eq!(breakdown.total(), Money::from_major(220));
    }

    #[test]
    fn test_breakdown_from_tenders_sums_kinds() {
        let breakdown = TenderBreakdown::from_tenders(&[
            Tender::new(TenderKind::Transfer, Money::from_major(10)),
            Tender::new(TenderKind::Transfer, Money::from_major(15)),
        ]);
        assert_eq!(breakdown.get(TenderKind::Transfer), Money::from_major(25));
    }

    #[test]
    fn test_group_orders() {
        let mut sales = order(
            "o-1",
            &[line(100), line(50)],
            180,
            &[
                Tender::new(TenderKind::Cash, Money::from_major(100)),
                Tender::new(TenderKind::Card, Money::from_major(80)),
            ],
        );
        sales.extend(order(
            "o-2",
            &[line(40)],
            45,
            &[Tender::new(TenderKind::Cash, Money::from_major(45))],
        ));

        let orders = OrderSummary::group(&sales);
        assert_eq!(orders.len(), 2);

        assert_eq!(orders[0].order_id, "o-1");
        assert_eq!(orders[0].line_count, 2);
        assert_eq!(orders[0].total_amount, Money::from_major(180));
        assert_eq!(orders[0].total_profit, Money::from_major(30));
        assert_eq!(
            orders[0].payment_kinds,
            vec![TenderKind::Cash, TenderKind::Card]
        );
        assert!(orders[0].is_mixed_tender());

        assert_eq!(orders[1].order_id, "o-2");
        assert_eq!(orders[1].total_profit, Money::from_major(5));
        assert!(!orders[1].is_mixed_tender());
    }
}
