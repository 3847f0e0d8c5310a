//! # Catalog
//!
//! Catalog items and the collections (price lists) they belong to, plus the
//! [`PriceBook`] seam settlement uses to look them up.
//!
//! ```text
//! Collection "Atlas"                  CatalogItem "rug-1"
//! ├── price_per_area:        18.00    ├── kind: Area
//! ├── credit_price_per_area: 21.00    ├── collection: "Atlas"
//! └── buy_price_per_area:    11.00    └── price_per_area: None  ──► falls back
//! ```
//!
//! The in-memory [`Catalog`] is what a checkout works against: the db crate
//! snapshots the relevant rows into one at the start of the operation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::money::Money;

/// How a catalog item is sold.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    /// Finished pieces at a flat price.
    Unit,
    /// Carpets cut or sold by size, priced per m².
    Area,
    /// Roll goods of fixed width sold by the running meter.
    Roll,
}

/// A sellable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogItem {
    pub product_id: String,
    pub name: String,
    pub kind: ProductKind,
    pub collection: Option<String>,
    /// Flat price per piece.
    pub sell_price: Option<Money>,
    /// Item-specific per-area override.
    pub price_per_area: Option<Money>,
    /// Roll width in meters.
    #[ts(as = "Option<String>")]
    pub roll_width: Option<rust_decimal::Decimal>,
    pub buy_price: Option<Money>,
    pub buy_price_per_area: Option<Money>,
}

impl CatalogItem {
    /// A unit-sold item with a flat price.
    pub fn unit(product_id: impl Into<String>, name: impl Into<String>, sell_price: Money) -> Self {
        CatalogItem {
            product_id: product_id.into(),
            name: name.into(),
            kind: ProductKind::Unit,
            collection: None,
            sell_price: Some(sell_price),
            price_per_area: None,
            roll_width: None,
            buy_price: None,
            buy_price_per_area: None,
        }
    }

    /// An area-priced item that takes its rate from a collection.
    pub fn area(
        product_id: impl Into<String>,
        name: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        CatalogItem {
            product_id: product_id.into(),
            name: name.into(),
            kind: ProductKind::Area,
            collection: Some(collection.into()),
            sell_price: None,
            price_per_area: None,
            roll_width: None,
            buy_price: None,
            buy_price_per_area: None,
        }
    }

    /// A roll of the given width that takes its rate from a collection.
    pub fn roll(
        product_id: impl Into<String>,
        name: impl Into<String>,
        collection: impl Into<String>,
        roll_width: rust_decimal::Decimal,
    ) -> Self {
        CatalogItem {
            kind: ProductKind::Roll,
            roll_width: Some(roll_width),
            ..CatalogItem::area(product_id, name, collection)
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn with_price_per_area(mut self, rate: Money) -> Self {
        self.price_per_area = Some(rate);
        self
    }

    pub fn with_sell_price(mut self, price: Money) -> Self {
        self.sell_price = Some(price);
        self
    }

    pub fn with_buy_price(mut self, price: Money) -> Self {
        self.buy_price = Some(price);
        self
    }

    pub fn with_buy_price_per_area(mut self, rate: Money) -> Self {
        self.buy_price_per_area = Some(rate);
        self
    }

    /// True for goods priced per m².
    #[inline]
    pub fn is_area_priced(&self) -> bool {
        matches!(self.kind, ProductKind::Area | ProductKind::Roll)
    }
}

/// A named price list shared by many items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Collection {
    pub name: String,
    pub price_per_area: Option<Money>,
    pub credit_price_per_area: Option<Money>,
    pub buy_price_per_area: Option<Money>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Collection {
            name: name.into(),
            price_per_area: None,
            credit_price_per_area: None,
            buy_price_per_area: None,
        }
    }

    pub fn with_rate(mut self, rate: Money) -> Self {
        self.price_per_area = Some(rate);
        self
    }

    pub fn with_credit_rate(mut self, rate: Money) -> Self {
        self.credit_price_per_area = Some(rate);
        self
    }

    pub fn with_buy_rate(mut self, rate: Money) -> Self {
        self.buy_price_per_area = Some(rate);
        self
    }
}

// =============================================================================
// Price Book
// =============================================================================

/// Read access to catalog items and collections.
pub trait PriceBook {
    fn item(&self, product_id: &str) -> Option<&CatalogItem>;

    fn collection(&self, name: &str) -> Option<&Collection>;

    /// The collection a basket line names, if any.
    fn collection_for(&self, name: Option<&str>) -> Option<&Collection> {
        name.and_then(|n| self.collection(n))
    }
}

/// In-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: HashMap<String, CatalogItem>,
    collections: HashMap<String, Collection>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an item, keyed by product id.
    pub fn insert_item(&mut self, item: CatalogItem) {
        self.items.insert(item.product_id.clone(), item);
    }

    /// Adds or replaces a collection, keyed by name.
    pub fn insert_collection(&mut self, collection: Collection) {
        self.collections.insert(collection.name.clone(), collection);
    }

    pub fn with_item(mut self, item: CatalogItem) -> Self {
        self.insert_item(item);
        self
    }

    pub fn with_collection(mut self, collection: Collection) -> Self {
        self.insert_collection(collection);
        self
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.collections.is_empty()
    }
}

impl PriceBook for Catalog {
    fn item(&self, product_id: &str) -> Option<&CatalogItem> {
        self.items.get(product_id)
    }

    fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_catalog_lookup() {
        let catalog = Catalog::new()
            .with_collection(Collection::new("Atlas").with_rate(Money::from_major(18)))
            .with_item(CatalogItem::area("rug-1", "Atlas 01", "Atlas"))
            .with_item(CatalogItem::roll("roll-1", "Runner", "Atlas", dec!(0.8)));

        assert_eq!(catalog.item_count(), 2);
        assert_eq!(catalog.item("rug-1").map(|i| i.kind), Some(ProductKind::Area));
        assert!(catalog.item("missing").is_none());

        let atlas = catalog.collection_for(Some("Atlas")).unwrap();
        assert_eq!(atlas.price_per_area, Some(Money::from_major(18)));
        assert!(catalog.collection_for(None).is_none());
    }

    #[test]
    fn test_roll_builder_keeps_collection() {
        let roll = CatalogItem::roll("roll-1", "Runner", "Atlas", dec!(0.8));
        assert_eq!(roll.kind, ProductKind::Roll);
        assert_eq!(roll.collection.as_deref(), Some("Atlas"));
        assert_eq!(roll.roll_width, Some(dec!(0.8)));
        assert!(roll.is_area_priced());
        assert!(!CatalogItem::unit("p", "Pillow", Money::from_major(5)).is_area_priced());
    }

    #[test]
    fn test_insert_replaces() {
        let mut catalog = Catalog::new();
        catalog.insert_item(CatalogItem::unit("p-1", "Pillow", Money::from_major(5)));
        catalog.insert_item(CatalogItem::unit("p-1", "Pillow", Money::from_major(6)));
        assert_eq!(catalog.item_count(), 1);
        assert_eq!(
            catalog.item("p-1").and_then(|i| i.sell_price),
            Some(Money::from_major(6))
        );
    }
}
