//! # Pricing Resolver
//!
//! Turns a catalog item, the pricing mode and an optional size into the
//! price a basket line is built from.
//!
//! ## Resolution Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AREA / ROLL GOODS (per m²)                                             │
//! │                                                                         │
//! │  credit mode? ──yes──► collection.credit_price_per_area ──found──► ✓    │
//! │       │                          │ missing                              │
//! │       no ◄───────────────────────┘                                      │
//! │       ▼                                                                 │
//! │  item.price_per_area ──► collection.price_per_area ──► item.sell_price  │
//! │                                                            │ missing    │
//! │                                                            ▼            │
//! │                                                  NoResolvablePrice      │
//! │                                                                         │
//! │  UNIT GOODS: credit rate (credit mode only), else item.sell_price       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A zero price is a valid resolution. Only a missing one is an error.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::catalog::{CatalogItem, Collection, ProductKind};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Measure, PricingMode};
use crate::validation::ValidationResult;

/// Output of [`resolve_price`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPrice {
    /// Price per piece (count/area lines) or per running meter (roll lines).
    pub unit_price: Money,
    /// Per-m² rate, for area-priced goods.
    pub unit_area_price: Option<Money>,
}

impl ResolvedPrice {
    pub fn flat(unit_price: Money) -> Self {
        ResolvedPrice {
            unit_price,
            unit_area_price: None,
        }
    }

    /// A per-area rate; `factor` is the area (or roll width) it applies to.
    pub fn per_area(rate: Money, factor: Option<Decimal>) -> Self {
        ResolvedPrice {
            unit_price: factor.map_or(rate, |f| rate * f),
            unit_area_price: Some(rate),
        }
    }
}

/// Resolves the price of `item` under `mode`.
///
/// `selected_size` is a `"W×H"` label. For area goods it fixes the piece
/// price; for unit goods it only matters under a credit per-area rate.
///
/// ## Example
/// ```rust
/// use rugpos_core::{resolve_price, CatalogItem, Collection, Money, PricingMode};
///
/// let atlas = Collection::new("Atlas")
///     .with_rate(Money::from_major(18))
///     .with_credit_rate(Money::from_major(21));
/// let rug = CatalogItem::area("rug-1", "Atlas 01", "Atlas");
///
/// let standard = resolve_price(&rug, Some(&atlas), PricingMode::Standard, Some("3×4")).unwrap();
/// assert_eq!(standard.unit_price, Money::from_major(216));
///
/// let credit = resolve_price(&rug, Some(&atlas), PricingMode::Credit, Some("3×4")).unwrap();
/// assert_eq!(credit.unit_price, Money::from_major(252));
/// ```
pub fn resolve_price(
    item: &CatalogItem,
    collection: Option<&Collection>,
    mode: PricingMode,
    selected_size: Option<&str>,
) -> CoreResult<ResolvedPrice> {
    let size_area = selected_size
        .map(parse_size)
        .transpose()?
        .map(|(w, h)| w * h);
    let credit = credit_rate(collection, mode);

    match item.kind {
        ProductKind::Unit => {
            if let Some(rate) = credit {
                return Ok(match size_area {
                    Some(area) => ResolvedPrice::per_area(rate, Some(area)),
                    None => ResolvedPrice::flat(rate),
                });
            }
            item.sell_price
                .map(ResolvedPrice::flat)
                .ok_or_else(|| no_price(item))
        }
        ProductKind::Area | ProductKind::Roll => {
            let rate = credit
                .or_else(|| standard_area_rate(item, collection))
                .ok_or_else(|| no_price(item))?;
            let factor = match item.kind {
                ProductKind::Roll => item.roll_width,
                _ => size_area,
            };
            Ok(ResolvedPrice::per_area(rate, factor))
        }
    }
}

/// The credit rate of a collection, under credit mode only.
pub fn credit_rate(collection: Option<&Collection>, mode: PricingMode) -> Option<Money> {
    match mode {
        PricingMode::Credit => collection.and_then(|c| c.credit_price_per_area),
        PricingMode::Standard => None,
    }
}

fn standard_area_rate(item: &CatalogItem, collection: Option<&Collection>) -> Option<Money> {
    item.price_per_area
        .or_else(|| collection.and_then(|c| c.price_per_area))
        .or(item.sell_price)
}

fn no_price(item: &CatalogItem) -> CoreError {
    CoreError::NoResolvablePrice {
        product_id: item.product_id.clone(),
    }
}

/// Purchase cost of a line, when the catalog records a buy price.
///
/// Area-priced goods use the per-m² buy rate (item first, then collection)
/// over the priced area. Unit goods use the flat buy price per piece.
pub fn cost_basis(
    item: &CatalogItem,
    collection: Option<&Collection>,
    measure: &Measure,
) -> Option<Money> {
    if item.is_area_priced() {
        let rate = item
            .buy_price_per_area
            .or_else(|| collection.and_then(|c| c.buy_price_per_area))?;
        return measure.priced_area().and_then(|area| rate.checked_mul(area));
    }
    item.buy_price
        .and_then(|price| price.checked_mul(measure.quantity()))
}

// =============================================================================
// Size Parsing
// =============================================================================

/// Parses a `"W×H"` size label into `(width, height)` in meters.
///
/// Accepts `×`, `x`, `X` or `*` as separator and a decimal comma.
///
/// ## Example
/// ```rust
/// use rugpos_core::parse_size;
/// use rust_decimal::Decimal;
///
/// let (w, h) = parse_size("2,5 x 3.5").unwrap();
/// assert_eq!(w, Decimal::new(25, 1));
/// assert_eq!(h, Decimal::new(35, 1));
/// assert!(parse_size("big").is_err());
/// ```
pub fn parse_size(label: &str) -> ValidationResult<(Decimal, Decimal)> {
    let mut parts = label.split(['×', 'x', 'X', '*']);
    let (Some(w), Some(h), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(bad_size("expected WIDTH×HEIGHT"));
    };

    let width = parse_meters(w)?;
    let height = parse_meters(h)?;
    Ok((width, height))
}

fn parse_meters(raw: &str) -> ValidationResult<Decimal> {
    let value = Decimal::from_str(&raw.trim().replace(',', "."))
        .map_err(|_| bad_size("dimensions must be numbers"))?;
    if value <= Decimal::ZERO {
        return Err(bad_size("dimensions must be positive"));
    }
    Ok(value)
}

fn bad_size(reason: &str) -> ValidationError {
    ValidationError::InvalidFormat {
        field: "size".to_string(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
