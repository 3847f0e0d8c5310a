//! # Debt Ledger
//!
//! Rules for opening a debt against a partially tendered order and for
//! recording repayments.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   open(total 500, initial 200)                                          │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   ┌─────────┐  record_payment(100)  ┌─────────┐  record_payment(200)    │
//! │   │ Pending │ ────────────────────► │ Pending │ ──────────────────┐     │
//! │   │ rem 300 │                       │ rem 200 │                   │     │
//! │   └─────────┘                       └─────────┘                   ▼     │
//! │        │                                                    ┌─────────┐ │
//! │        │ now > deadline (read-side only)                   │  Paid   │ │
//! │        ▼                                                    │  rem 0  │ │
//! │    "Overdue"                                                └─────────┘ │
//! │                                                              terminal   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every check runs before any field changes. A rejected payment leaves
//! the debt exactly as it was.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::currency::ExchangeRate;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::settlement::Settlement;
use crate::types::{BasketLine, Debt, DebtPayment, DebtStanding, DebtStatus, Measure};
use crate::validation::{
    validate_contact_phone, validate_debtor_name, validate_payment_amount, validate_recorded_by,
};
use crate::DEFAULT_DEBT_TERM_DAYS;

// =============================================================================
// Opening
// =============================================================================

/// A request to open a debt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDebt {
    pub order_id: String,
    pub debtor_name: String,
    pub contact_phone: String,
    pub total_amount: Money,
    pub initial_payment: Money,
    /// Defaults to [`default_deadline`] when not set.
    pub deadline: Option<DateTime<Utc>>,
    pub line_snapshot: Vec<BasketLine>,
}

impl OpenDebt {
    pub fn new(
        order_id: impl Into<String>,
        debtor_name: impl Into<String>,
        contact_phone: impl Into<String>,
        total_amount: Money,
        initial_payment: Money,
    ) -> Self {
        OpenDebt {
            order_id: order_id.into(),
            debtor_name: debtor_name.into(),
            contact_phone: contact_phone.into(),
            total_amount,
            initial_payment,
            deadline: None,
            line_snapshot: Vec::new(),
        }
    }

    /// The debt for a settlement's shortfall: the declared total is owed,
    /// the liquid tender taken counts as the initial payment.
    pub fn for_settlement(
        settlement: &Settlement,
        basket: &[BasketLine],
        debtor_name: impl Into<String>,
        contact_phone: impl Into<String>,
    ) -> Self {
        OpenDebt::new(
            settlement.order_id.clone(),
            debtor_name,
            contact_phone,
            settlement.declared_total,
            settlement.paid_now(),
        )
        .with_lines(basket.to_vec())
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_lines(mut self, lines: Vec<BasketLine>) -> Self {
        self.line_snapshot = lines;
        self
    }

    /// Validates the request and opens the debt.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::Utc;
    /// use rugpos_core::{CoreError, Money, OpenDebt};
    ///
    /// let settled = OpenDebt::new("o-1", "Aziz", "+998901234567",
    ///     Money::from_major(500), Money::from_major(500));
    /// assert!(matches!(settled.open(Utc::now()), Err(CoreError::NothingToOwe { .. })));
    ///
    /// let debt = OpenDebt::new("o-1", "Aziz", "+998901234567",
    ///     Money::from_major(500), Money::from_major(200))
    ///     .open(Utc::now())
    ///     .unwrap();
    /// assert_eq!(debt.remaining_amount, Money::from_major(300));
    /// ```
    pub fn open(self, now: DateTime<Utc>) -> CoreResult<Debt> {
        let debtor_name = validate_debtor_name(&self.debtor_name)?;
        let contact_phone = validate_contact_phone(&self.contact_phone)?;
        if self.initial_payment.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "initial payment".to_string(),
            }
            .into());
        }

        let remaining = self.total_amount - self.initial_payment;
        if !remaining.is_positive() {
            return Err(CoreError::NothingToOwe {
                total: self.total_amount,
                initial_payment: self.initial_payment,
            });
        }

        Ok(Debt {
            id: uuid::Uuid::new_v4().to_string(),
            order_id: self.order_id,
            debtor_name,
            contact_phone,
            order_details: order_details(&self.line_snapshot),
            line_snapshot: self.line_snapshot,
            total_amount: self.total_amount,
            initial_payment: self.initial_payment,
            paid_amount: self.initial_payment,
            remaining_amount: remaining,
            deadline: self.deadline.unwrap_or_else(|| default_deadline(now)),
            status: DebtStatus::Pending,
            payments: Vec::new(),
            created_at: now,
        })
    }
}

/// `now` plus the default repayment term.
pub fn default_deadline(now: DateTime<Utc>) -> DateTime<Utc> {
    deadline_after(now, DEFAULT_DEBT_TERM_DAYS)
}

/// `now` plus `days`.
pub fn deadline_after(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now + Duration::days(days)
}

// =============================================================================
// Payments
// =============================================================================

/// A repayment to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDebtPayment {
    pub amount: Money,
    pub recorded_by: String,
    pub note: Option<String>,
    pub exchange_rate: ExchangeRate,
    pub date: DateTime<Utc>,
}

impl NewDebtPayment {
    pub fn new(
        amount: Money,
        recorded_by: impl Into<String>,
        exchange_rate: ExchangeRate,
        date: DateTime<Utc>,
    ) -> Self {
        NewDebtPayment {
            amount,
            recorded_by: recorded_by.into(),
            note: None,
            exchange_rate,
            date,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let note = note.into();
        let note = note.trim();
        self.note = (!note.is_empty()).then(|| note.to_string());
        self
    }
}

impl Debt {
    /// Applies a repayment.
    ///
    /// Rejects a paid debt, a non-positive amount and an amount above the
    /// remaining balance. On success the payment is appended and the
    /// balance recomputed; the debt becomes `Paid` at zero.
    pub fn record_payment(&mut self, payment: NewDebtPayment) -> CoreResult<&DebtPayment> {
        if self.status == DebtStatus::Paid {
            return Err(CoreError::DebtAlreadyPaid(self.id.clone()));
        }
        validate_payment_amount(payment.amount)?;
        if payment.amount > self.remaining_amount {
            return Err(CoreError::OverPayment {
                debt_id: self.id.clone(),
                amount: payment.amount,
                remaining: self.remaining_amount,
            });
        }
        let recorded_by = validate_recorded_by(&payment.recorded_by)?;

        self.paid_amount += payment.amount;
        self.remaining_amount = (self.total_amount - self.paid_amount).non_negative();
        if self.remaining_amount.is_zero() {
            self.status = DebtStatus::Paid;
        }

        self.payments.push(DebtPayment {
            id: uuid::Uuid::new_v4().to_string(),
            debt_id: self.id.clone(),
            amount: payment.amount,
            date: payment.date,
            recorded_by,
            note: payment.note,
            exchange_rate: payment.exchange_rate,
        });
        let index = self.payments.len() - 1;
        Ok(&self.payments[index])
    }

    /// Pending and past its deadline.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == DebtStatus::Pending && self.deadline < now
    }

    pub fn standing(&self, now: DateTime<Utc>) -> DebtStanding {
        match self.status {
            DebtStatus::Paid => DebtStanding::Paid,
            DebtStatus::Pending if self.deadline < now => DebtStanding::Overdue,
            DebtStatus::Pending => DebtStanding::Pending,
        }
    }

    /// Sum of recorded repayments, excluding the initial payment.
    pub fn repaid(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }
}

// =============================================================================
// Order Details
// =============================================================================

/// Human-readable summary of the lines a debt covers.
///
/// ## Example
/// ```rust
/// use rugpos_core::{order_details, BasketLine, Measure, Money};
/// use rust_decimal::Decimal;
///
/// let carpet = BasketLine::new("r", "Atlas", None,
///     Measure::Area { width: Decimal::from(3), height: Decimal::from(4), pieces: 1 },
///     Money::from_major(216));
/// let pillows = BasketLine::new("p", "Pillow", None,
///     Measure::Count { quantity: 2, size: None }, Money::from_major(15));
///
/// assert_eq!(order_details(&[carpet, pillows]), "Atlas (3×4), Pillow (2x)");
/// ```
pub fn order_details(lines: &[BasketLine]) -> String {
    lines
        .iter()
        .map(|line| format!("{} ({})", line.product_name, describe(&line.measure)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe(measure: &Measure) -> String {
    match measure {
        Measure::Count {
            quantity,
            size: Some(size),
        } => format!("{size}, {quantity}x"),
        Measure::Count { quantity, .. } => format!("{quantity}x"),
        Measure::Area {
            width,
            height,
            pieces: 1,
        } => format!("{}×{}", trim(*width), trim(*height)),
        Measure::Area {
            width,
            height,
            pieces,
        } => format!("{}×{}, {pieces}x", trim(*width), trim(*height)),
        Measure::Length { length, .. } => format!("{} m", trim(*length)),
    }
}

fn trim(value: Decimal) -> Decimal {
    value.normalize()
}

// =============================================================================
// Summary
// =============================================================================

/// Header totals for the debts screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DebtSummary {
    pub pending_count: usize,
    pub overdue_count: usize,
    pub paid_count: usize,
    /// Remaining balance over every pending debt, overdue ones included.
    pub total_pending: Money,
    /// Remaining balance over overdue debts.
    pub total_overdue: Money,
    /// Total value of debts already paid.
    pub total_paid: Money,
}

impl DebtSummary {
    pub fn from_debts(debts: &[Debt], now: DateTime<Utc>) -> Self {
        let mut summary = DebtSummary::default();
        for debt in debts {
            match debt.standing(now) {
                DebtStanding::Paid => {
                    summary.paid_count += 1;
                    summary.total_paid += debt.total_amount;
                }
                DebtStanding::Overdue => {
                    summary.pending_count += 1;
                    summary.overdue_count += 1;
                    summary.total_pending += debt.remaining_amount;
                    summary.total_overdue += debt.remaining_amount;
                }
                DebtStanding::Pending => {
                    summary.pending_count += 1;
                    summary.total_pending += debt.remaining_amount;
                }
            }
        }
        summary
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn open(total: i64, initial: i64) -> Debt {
        OpenDebt::new(
            "order-1",
            "Aziz Karimov",
            "+998 90 123 45 67",
            Money::from_major(total),
            Money::from_major(initial),
        )
        .open(now())
        .unwrap()
    }

    fn pay(amount: i64) -> NewDebtPayment {
        NewDebtPayment::new(Money::from_major(amount), "seller-1", ExchangeRate::DEFAULT, now())
    }

    #[test]
    fn test_open_debt() {
        let debt = open(500, 200);
        assert_eq!(debt.order_id, "order-1");
        assert_eq!(debt.paid_amount, Money::from_major(200));
        assert_eq!(debt.remaining_amount, Money::from_major(300));
        assert_eq!(debt.status, DebtStatus::Pending);
        assert_eq!(debt.deadline, now() + Duration::days(7));
        assert_eq!(debt.created_at, now());
        assert!(debt.payments.is_empty());
    }

    #[test]
    fn test_open_trims_identity() {
        let debt = OpenDebt::new(
            "o",
            "  Aziz ",
            " 901234567 ",
            Money::from_major(10),
            Money::zero(),
        )
        .open(now())
        .unwrap();
        assert_eq!(debt.debtor_name, "Aziz");
        assert_eq!(debt.contact_phone, "901234567");
    }

    #[test]
    fn test_open_rejections() {
        let base = OpenDebt::new("o", "Aziz", "901234567", Money::from_major(500), Money::zero());

        let fully_paid = OpenDebt {
            initial_payment: Money::from_major(500),
            ..base.clone()
        };
        assert!(matches!(
            fully_paid.open(now()),
            Err(CoreError::NothingToOwe { .. })
        ));

        let overpaid = OpenDebt {
            initial_payment: Money::from_major(600),
            ..base.clone()
        };
        assert!(matches!(overpaid.open(now()), Err(CoreError::NothingToOwe { .. })));

        let negative = OpenDebt {
            initial_payment: Money::from_major(-1),
            ..base.clone()
        };
        assert!(matches!(negative.open(now()), Err(CoreError::Validation(_))));

        let nameless = OpenDebt {
            debtor_name: "   ".to_string(),
            ..base.clone()
        };
        assert!(matches!(nameless.open(now()), Err(CoreError::Validation(_))));

        let no_contact = OpenDebt {
            contact_phone: String::new(),
            ..base
        };
        assert!(matches!(no_contact.open(now()), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_explicit_deadline_is_kept() {
        let deadline = now() + Duration::days(30);
        let debt = OpenDebt::new("o", "Aziz", "901234567", Money::from_major(10), Money::zero())
            .with_deadline(deadline)
            .open(now())
            .unwrap();
        assert_eq!(debt.deadline, deadline);
    }

    #[test]
    fn test_payment_to_zero_closes_debt() {
        let mut debt = open(500, 300);
        let payment = debt.record_payment(pay(200)).unwrap();
        assert_eq!(payment.amount, Money::from_major(200));
        assert_eq!(payment.recorded_by, "seller-1");

        assert_eq!(debt.remaining_amount, Money::zero());
        assert_eq!(debt.paid_amount, Money::from_major(500));
        assert_eq!(debt.status, DebtStatus::Paid);
        assert_eq!(debt.payments.len(), 1);
    }

    #[test]
    fn test_partial_payments_are_monotonic() {
        let mut debt = open(500, 0);
        let mut last = debt.remaining_amount;
        for amount in [100, 50, 150] {
            debt.record_payment(pay(amount)).unwrap();
            assert!(debt.remaining_amount < last);
            assert!(!debt.remaining_amount.is_negative());
            last = debt.remaining_amount;
        }
        assert_eq!(debt.remaining_amount, Money::from_major(200));
        assert_eq!(debt.repaid(), Money::from_major(300));
        assert_eq!(debt.status, DebtStatus::Pending);
    }

    #[test]
    fn test_over_payment_leaves_debt_unchanged() {
        let mut debt = open(500, 300);
        let before = debt.clone();

        let err = debt.record_payment(pay(250)).unwrap_err();
        assert!(matches!(err, CoreError::OverPayment { .. }));
        assert_eq!(debt, before);
    }

    #[test]
    fn test_invalid_payments_leave_debt_unchanged() {
        let mut debt = open(500, 300);
        let before = debt.clone();

        assert!(debt.record_payment(pay(0)).is_err());
        assert!(debt.record_payment(pay(-10)).is_err());
        let anonymous = NewDebtPayment::new(
            Money::from_major(10),
            " ",
            ExchangeRate::DEFAULT,
            now(),
        );
        assert!(debt.record_payment(anonymous).is_err());
        assert_eq!(debt, before);
    }

    #[test]
    fn test_paid_is_terminal() {
        let mut debt = open(100, 0);
        debt.record_payment(pay(100)).unwrap();
        let before = debt.clone();

        let err = debt.record_payment(pay(1)).unwrap_err();
        assert!(matches!(err, CoreError::DebtAlreadyPaid(_)));
        assert_eq!(debt, before);
    }

    #[test]
    fn test_payment_note_and_rate_snapshot() {
        let mut debt = open(100, 0);
        let rate = ExchangeRate::new(dec!(12650)).unwrap();
        let payment = NewDebtPayment::new(Money::from_major(10), "seller-1", rate, now())
            .with_note("  cash at branch 2 ");
        let recorded = debt.record_payment(payment).unwrap();
        assert_eq!(recorded.note.as_deref(), Some("cash at branch 2"));
        assert_eq!(recorded.exchange_rate.value(), dec!(12650));

        let blank = NewDebtPayment::new(Money::from_major(1), "s", rate, now()).with_note("  ");
        assert_eq!(blank.note, None);
    }

    #[test]
    fn test_overdue_is_derived() {
        let debt = open(500, 0);
        let before_deadline = debt.deadline - Duration::hours(1);
        let after_deadline = debt.deadline + Duration::hours(1);

        assert!(!debt.is_overdue(before_deadline));
        assert_eq!(debt.standing(before_deadline), DebtStanding::Pending);
        assert!(debt.is_overdue(after_deadline));
        assert_eq!(debt.standing(after_deadline), DebtStanding::Overdue);
        assert_eq!(debt.status, DebtStatus::Pending);

        let mut paid = open(10, 0);
        paid.record_payment(pay(10)).unwrap();
        assert!(!paid.is_overdue(after_deadline));
        assert_eq!(paid.standing(after_deadline), DebtStanding::Paid);
    }

    #[test]
    fn test_order_details() {
        let lines = [
            BasketLine::new(
                "r",
                "Atlas",
                None,
                Measure::Area {
                    width: dec!(3.0),
                    height: dec!(4),
                    pieces: 2,
                },
                Money::from_major(216),
            ),
            BasketLine::new(
                "roll",
                "Runner",
                None,
                Measure::Length {
                    width: dec!(0.8),
                    length: dec!(2.50),
                },
                Money::from_major(18),
            ),
            BasketLine::new(
                "m",
                "Mat",
                None,
                Measure::Count {
                    quantity: 1,
                    size: Some("1×2".to_string()),
                },
                Money::from_major(9),
            ),
        ];
        assert_eq!(
            order_details(&lines),
            "Atlas (3×4, 2x), Runner (2.5 m), Mat (1×2, 1x)"
        );
        assert_eq!(order_details(&[]), "");
    }

    #[test]
    fn test_debt_for_settlement() {
        use crate::catalog::Catalog;
        use crate::settlement::{settle, OrderContext};
        use crate::types::{PricingMode, Tender, TenderKind};

        let basket = [BasketLine::new(
            "r",
            "Atlas",
            None,
            Measure::Count {
                quantity: 1,
                size: None,
            },
            Money::from_major(500),
        )];
        let settlement = settle(
            &basket,
            Money::from_major(500),
            &[Tender::new(TenderKind::Cash, Money::from_major(200))],
            PricingMode::Standard,
            &Catalog::default(),
            OrderContext::pinned("order-9", now()),
        )
        .unwrap();

        let debt = OpenDebt::for_settlement(&settlement, &basket, "Aziz", "901234567")
            .open(now())
            .unwrap();
        assert_eq!(debt.order_id, "order-9");
        assert_eq!(debt.total_amount, Money::from_major(500));
        assert_eq!(debt.initial_payment, Money::from_major(200));
        assert_eq!(debt.remaining_amount, Money::from_major(300));
        assert_eq!(debt.order_details, "Atlas (1x)");
        assert_eq!(debt.line_snapshot.len(), 1);
    }

    #[test]
    fn test_summary() {
        let later = now() + Duration::days(10);

        let pending = open(500, 100); // remaining 400, overdue at `later`
        let fresh = OpenDebt::new("o-2", "Dilnoza", "901112233", Money::from_major(80), Money::zero())
            .with_deadline(later + Duration::days(1))
            .open(now())
            .unwrap();
        let mut paid = open(300, 0);
        paid.record_payment(pay(300)).unwrap();

        let summary = DebtSummary::from_debts(&[pending, fresh, paid], later);
        assert_eq!(summary.pending_count, 2);
        assert_eq!(summary.overdue_count, 1);
        assert_eq!(summary.paid_count, 1);
        assert_eq!(summary.total_pending, Money::from_major(480));
        assert_eq!(summary.total_overdue, Money::from_major(400));
        assert_eq!(summary.total_paid, Money::from_major(300));
    }
}
