//! # Domain Types
//!
//! Core domain types used throughout rugpos.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   BasketLine    │   │      Sale       │   │      Debt       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  product_id     │   │  id             │   │  id (UUID)      │       │
//! │  │  measure        │──►│  order_id       │◄──│  order_id       │       │
//! │  │  unit_price     │   │  amount         │   │  remaining      │       │
//! │  │  total (book)   │   │  payment_kind   │   │  payments[]     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Measure      │   │   TenderKind    │   │   DebtStatus    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Count          │   │  Cash           │   │  Pending        │       │
//! │  │  Area           │   │  Card           │   │  Paid           │       │
//! │  │  Length         │   │  Transfer       │   └─────────────────┘       │
//! │  └─────────────────┘   │  Debt           │                              │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Sales and debts freeze product names and line geometry at the moment of
//! checkout. Later catalog edits never rewrite history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::catalog::CatalogItem;
use crate::currency::ExchangeRate;
use crate::error::CoreResult;
use crate::money::Money;
use crate::pricing::{parse_size, ResolvedPrice};
use crate::validation::{validate_dimension, validate_quantity};

// =============================================================================
// Category Kind & Sale Unit
// =============================================================================

/// How a line is counted on the shop floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    /// Finished pieces (pillows, prayer mats, pre-cut rugs).
    ByUnit,
    /// Goods measured in square meters or running meters.
    ByArea,
}

/// The unit a line is sold in.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleUnit {
    Count,
    Area,
    Length,
}

// =============================================================================
// Measure
// =============================================================================

/// Line geometry, tagged by sale unit.
///
/// ```text
/// Count  { quantity: 2, size: Some("1×2") }   two pre-cut pieces
/// Area   { width: 3, height: 4, pieces: 1 }   one 3×4 carpet, 12 m²
/// Length { width: 4, length: 2.5 }            2.5 m off a 4 m roll, 10 m²
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum Measure {
    Count {
        quantity: u32,
        size: Option<String>,
    },
    Area {
        #[ts(type = "string")]
        width: Decimal,
        #[ts(type = "string")]
        height: Decimal,
        pieces: u32,
    },
    Length {
        #[ts(type = "string")]
        width: Decimal,
        #[ts(type = "string")]
        length: Decimal,
    },
}

impl Measure {
    /// Returns the sale unit this geometry belongs to.
    pub fn sale_unit(&self) -> SaleUnit {
        match self {
            Measure::Count { .. } => SaleUnit::Count,
            Measure::Area { .. } => SaleUnit::Area,
            Measure::Length { .. } => SaleUnit::Length,
        }
    }

    /// Returns the category kind for this geometry.
    pub fn category(&self) -> CategoryKind {
        match self {
            Measure::Count { .. } => CategoryKind::ByUnit,
            Measure::Area { .. } | Measure::Length { .. } => CategoryKind::ByArea,
        }
    }

    /// Quantity as recorded on the sale: pieces, or running meters for rolls.
    pub fn quantity(&self) -> Decimal {
        match self {
            Measure::Count { quantity, .. } => Decimal::from(*quantity),
            Measure::Area { pieces, .. } => Decimal::from(*pieces),
            Measure::Length { length, .. } => *length,
        }
    }

    /// Factor applied to the unit price to get the line total.
    ///
    /// Count and area lines are priced per piece, roll lines per running meter.
    pub fn billing_factor(&self) -> Decimal {
        self.quantity()
    }

    /// Area of a single piece (or of the cut, for rolls), when known.
    pub fn area(&self) -> Option<Decimal> {
        match self {
            Measure::Count { size, .. } => size
                .as_deref()
                .and_then(|s| parse_size(s).ok())
                .map(|(w, h)| w * h),
            Measure::Area { width, height, .. } => Some(width * height),
            Measure::Length { width, length } => Some(width * length),
        }
    }

    /// Total area priced on this line: piece area × pieces.
    pub fn priced_area(&self) -> Option<Decimal> {
        match self {
            Measure::Count { quantity, .. } => self.area().map(|a| a * Decimal::from(*quantity)),
            Measure::Area { pieces, .. } => self.area().map(|a| a * Decimal::from(*pieces)),
            Measure::Length { .. } => self.area(),
        }
    }

    pub fn width(&self) -> Option<Decimal> {
        match self {
            Measure::Count { .. } => None,
            Measure::Area { width, .. } | Measure::Length { width, .. } => Some(*width),
        }
    }

    pub fn height(&self) -> Option<Decimal> {
        match self {
            Measure::Area { height, .. } => Some(*height),
            _ => None,
        }
    }

    pub fn length(&self) -> Option<Decimal> {
        match self {
            Measure::Length { length, .. } => Some(*length),
            _ => None,
        }
    }

    pub fn size(&self) -> Option<&str> {
        match self {
            Measure::Count { size, .. } => size.as_deref(),
            _ => None,
        }
    }
}

// =============================================================================
// Basket Line
// =============================================================================

/// One decided-to-sell quantity at a resolved price.
///
/// `total` is fixed when the line is added or edited. Settlement reads it
/// and never derives it again (credit repricing aside).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BasketLine {
    pub product_id: String,
    pub product_name: String,
    /// Price-list key used for credit repricing.
    pub collection: Option<String>,
    pub measure: Measure,
    pub unit_price: Money,
    pub total: Money,
}

impl BasketLine {
    /// Builds a line and computes `total = unit_price × billing factor`.
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        collection: Option<&str>,
        measure: Measure,
        unit_price: Money,
    ) -> Self {
        let total = unit_price * measure.billing_factor();
        BasketLine {
            product_id: product_id.into(),
            product_name: product_name.into(),
            collection: collection.map(str::to_string),
            measure,
            unit_price,
            total,
        }
    }

    /// Counted pieces of a catalog item.
    ///
    /// ## Example
    /// ```rust
    /// use rugpos_core::{BasketLine, CatalogItem, Money, ResolvedPrice};
    ///
    /// let pillow = CatalogItem::unit("p-9", "Pillow", Money::from_major(15));
    /// let price = ResolvedPrice::flat(Money::from_major(15));
    /// let line = BasketLine::count(&pillow, &price, 2, None).unwrap();
    /// assert_eq!(line.total, Money::from_major(30));
    /// ```
    pub fn count(
        item: &CatalogItem,
        price: &ResolvedPrice,
        quantity: u32,
        size: Option<&str>,
    ) -> CoreResult<Self> {
        validate_quantity(quantity)?;
        if let Some(size) = size {
            parse_size(size)?;
        }
        Ok(Self::new(
            &item.product_id,
            &item.name,
            item.collection.as_deref(),
            Measure::Count {
                quantity,
                size: size.map(str::to_string),
            },
            price.unit_price,
        ))
    }

    /// A carpet cut to `width × height`, `pieces` times.
    pub fn area(
        item: &CatalogItem,
        price: &ResolvedPrice,
        width: Decimal,
        height: Decimal,
        pieces: u32,
    ) -> CoreResult<Self> {
        validate_dimension("width", width)?;
        validate_dimension("height", height)?;
        validate_quantity(pieces)?;

        let per_piece = match price.unit_area_price {
            Some(rate) => rate * (width * height),
            None => price.unit_price,
        };
        Ok(Self::new(
            &item.product_id,
            &item.name,
            item.collection.as_deref(),
            Measure::Area {
                width,
                height,
                pieces,
            },
            per_piece,
        ))
    }

    /// `length` running meters off a roll of the given width.
    pub fn roll(
        item: &CatalogItem,
        price: &ResolvedPrice,
        width: Decimal,
        length: Decimal,
    ) -> CoreResult<Self> {
        validate_dimension("width", width)?;
        validate_dimension("length", length)?;

        let per_meter = match price.unit_area_price {
            Some(rate) => rate * width,
            None => price.unit_price,
        };
        Ok(Self::new(
            &item.product_id,
            &item.name,
            item.collection.as_deref(),
            Measure::Length { width, length },
            per_meter,
        ))
    }

    /// Replaces the line total after a manual edit.
    pub fn with_total(mut self, total: Money) -> Self {
        self.total = total;
        self
    }

    #[inline]
    pub fn category(&self) -> CategoryKind {
        self.measure.category()
    }

    #[inline]
    pub fn sale_unit(&self) -> SaleUnit {
        self.measure.sale_unit()
    }
}

// =============================================================================
// Tenders
// =============================================================================

/// How (part of) an order was paid.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TenderKind {
    Cash,
    Card,
    Transfer,
    /// Deferred; owed on a debt.
    Debt,
}

impl TenderKind {
    /// All kinds, in drain priority order.
    pub const ALL: [TenderKind; 4] = [
        TenderKind::Cash,
        TenderKind::Card,
        TenderKind::Transfer,
        TenderKind::Debt,
    ];

    /// Kinds that put money in the till.
    pub const LIQUID: [TenderKind; 3] = [TenderKind::Cash, TenderKind::Card, TenderKind::Transfer];

    pub fn as_str(&self) -> &'static str {
        match self {
            TenderKind::Cash => "cash",
            TenderKind::Card => "card",
            TenderKind::Transfer => "transfer",
            TenderKind::Debt => "debt",
        }
    }

    #[inline]
    pub fn is_liquid(&self) -> bool {
        !matches!(self, TenderKind::Debt)
    }
}

/// An amount offered in one tender kind, in base currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Tender {
    pub kind: TenderKind,
    pub amount: Money,
}

impl Tender {
    pub fn new(kind: TenderKind, amount: Money) -> Self {
        Tender { kind, amount }
    }
}

/// Whether the order is priced from standard or credit (nasiya) rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    #[default]
    Standard,
    Credit,
}

// =============================================================================
// Sale
// =============================================================================

/// One settled basket line. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    /// `{order_id}:{line_number}` so retried inserts hit the same key.
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Name at time of sale (frozen).
    pub product_name: String,
    pub measure: Measure,
    /// Book total the line was settled against.
    pub book_amount: Money,
    /// Final line price: book amount plus attributed profit.
    pub amount: Money,
    pub attributed_profit: Money,
    /// Book amount minus catalog cost basis, when the catalog knows it.
    pub store_margin: Option<Money>,
    pub payment_kind: TenderKind,
    pub is_credit_sale: bool,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn sale_unit(&self) -> SaleUnit {
        self.measure.sale_unit()
    }

    #[inline]
    pub fn quantity(&self) -> Decimal {
        self.measure.quantity()
    }
}

// =============================================================================
// Debt
// =============================================================================

/// Persisted debt state. Overdue is never stored; see [`DebtStanding`].
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
    #[default]
    Pending,
    /// Terminal.
    Paid,
}

/// Read-side projection of a debt at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DebtStanding {
    Pending,
    Overdue,
    Paid,
}

/// A deferred balance tied to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Debt {
    pub id: String,
    pub order_id: String,
    pub debtor_name: String,
    pub contact_phone: String,
    /// e.g. `"Atlas (3×4), Runner (2.5 m)"`.
    pub order_details: String,
    pub line_snapshot: Vec<BasketLine>,
    pub total_amount: Money,
    pub initial_payment: Money,
    /// Initial payment plus every recorded payment.
    pub paid_amount: Money,
    pub remaining_amount: Money,
    #[ts(as = "String")]
    pub deadline: DateTime<Utc>,
    pub status: DebtStatus,
    pub payments: Vec<DebtPayment>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A repayment against a debt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DebtPayment {
    pub id: String,
    pub debt_id: String,
    pub amount: Money,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub recorded_by: String,
    pub note: Option<String>,
    /// Rate in force when the payment was taken. Audit only.
    pub exchange_rate: ExchangeRate,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_measure_geometry() {
        let carpet = Measure::Area {
            width: dec!(3),
            height: dec!(4),
            pieces: 2,
        };
        assert_eq!(carpet.area(), Some(dec!(12)));
        assert_eq!(carpet.priced_area(), Some(dec!(24)));
        assert_eq!(carpet.category(), CategoryKind::ByArea);

        let roll = Measure::Length {
            width: dec!(4),
            length: dec!(2.5),
        };
        assert_eq!(roll.area(), Some(dec!(10.0)));
        assert_eq!(roll.quantity(), dec!(2.5));
        assert_eq!(roll.sale_unit(), SaleUnit::Length);

        let pillows = Measure::Count {
            quantity: 3,
            size: None,
        };
        assert_eq!(pillows.area(), None);
        assert_eq!(pillows.quantity(), dec!(3));
        assert_eq!(pillows.category(), CategoryKind::ByUnit);
    }

    #[test]
    fn test_count_with_size_has_area() {
        let mats = Measure::Count {
            quantity: 2,
            size: Some("1×2".to_string()),
        };
        assert_eq!(mats.area(), Some(dec!(2)));
        assert_eq!(mats.priced_area(), Some(dec!(4)));
    }

    #[test]
    fn test_basket_line_total() {
        let line = BasketLine::new(
            "p-1",
            "Atlas",
            Some("Atlas"),
            Measure::Area {
                width: dec!(3),
                height: dec!(4),
                pieces: 2,
            },
            Money::from_major(120),
        );
        assert_eq!(line.total, Money::from_major(240));
        assert_eq!(line.collection.as_deref(), Some("Atlas"));

        let edited = line.with_total(Money::from_major(230));
        assert_eq!(edited.total, Money::from_major(230));
        assert_eq!(edited.unit_price, Money::from_major(120));
    }

    #[test]
    fn test_area_and_roll_constructors() {
        let item = CatalogItem::area("rug-1", "Atlas", "Atlas");
        let price = ResolvedPrice::per_area(Money::from_major(10), None);

        let carpet = BasketLine::area(&item, &price, dec!(3), dec!(4), 1).unwrap();
        assert_eq!(carpet.unit_price, Money::from_major(120));
        assert_eq!(carpet.total, Money::from_major(120));

        let runner = BasketLine::roll(&item, &price, dec!(2), dec!(2.5)).unwrap();
        assert_eq!(runner.unit_price, Money::from_major(20));
        assert_eq!(runner.total, Money::from_major(50));

        assert!(BasketLine::area(&item, &price, dec!(0), dec!(4), 1).is_err());
        assert!(BasketLine::roll(&item, &price, dec!(2), dec!(-1)).is_err());
    }

    #[test]
    fn test_tender_kind_order() {
        assert_eq!(TenderKind::ALL[0], TenderKind::Cash);
        assert_eq!(TenderKind::ALL[3], TenderKind::Debt);
        assert!(TenderKind::Transfer.is_liquid());
        assert!(!TenderKind::Debt.is_liquid());
        assert_eq!(TenderKind::Card.as_str(), "card");
    }

    #[test]
    fn test_measure_serde_is_tagged() {
        let measure = Measure::Length {
            width: dec!(4),
            length: dec!(2.5),
        };
        let json = serde_json::to_value(&measure).unwrap();
        assert_eq!(json["unit"], "length");
        let back: Measure = serde_json::from_value(json).unwrap();
        assert_eq!(back, measure);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(PricingMode::default(), PricingMode::Standard);
        assert_eq!(DebtStatus::default(), DebtStatus::Pending);
    }
}
