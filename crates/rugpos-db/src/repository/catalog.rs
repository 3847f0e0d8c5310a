//! # Catalog Repository
//!
//! Collections and catalog items, plus the per-checkout catalog snapshot.
//!
//! ## Snapshot
//! ```text
//! checkout transaction
//!      │
//!      ▼
//! snapshot_on(conn, basket)
//!      ├── load every catalog item named by a line
//!      ├── load every collection named by those items or lines
//!      ▼
//! Catalog (in memory, implements PriceBook)
//!      │
//!      ▼
//! settle(...)   ← prices never change mid-settlement
//! ```

use chrono::Utc;
use rugpos_core::{
    resolve_price, BasketLine, Catalog, CatalogItem, Collection, CoreError, PricingMode,
    ProductKind, ResolvedPrice,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::BTreeSet;
use tracing::debug;

use super::{
    opt_decimal_column, opt_decimal_text, opt_money_column, opt_money_text, timestamp_text,
};
use crate::error::DbResult;

const ITEM_COLUMNS: &str = "product_id, name, kind, collection, sell_price, price_per_area, \
                            roll_width, buy_price, buy_price_per_area";

const COLLECTION_COLUMNS: &str =
    "name, price_per_area, credit_price_per_area, buy_price_per_area";

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Inserts or replaces a collection's rates.
    pub async fn upsert_collection(&self, collection: &Collection) -> DbResult<()> {
        debug!(name = %collection.name, "Upserting collection");

        sqlx::query(
            r#"
            INSERT INTO collections (
                name, price_per_area, credit_price_per_area, buy_price_per_area, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(name) DO UPDATE SET
                price_per_area = excluded.price_per_area,
                credit_price_per_area = excluded.credit_price_per_area,
                buy_price_per_area = excluded.buy_price_per_area,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&collection.name)
        .bind(opt_money_text(collection.price_per_area))
        .bind(opt_money_text(collection.credit_price_per_area))
        .bind(opt_money_text(collection.buy_price_per_area))
        .bind(timestamp_text(Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts or replaces a catalog item.
    pub async fn upsert_item(&self, item: &CatalogItem) -> DbResult<()> {
        debug!(product_id = %item.product_id, kind = ?item.kind, "Upserting catalog item");

        sqlx::query(
            r#"
            INSERT INTO catalog_items (
                product_id, name, kind, collection, sell_price, price_per_area,
                roll_width, buy_price, buy_price_per_area, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(product_id) DO UPDATE SET
                name = excluded.name,
                kind = excluded.kind,
                collection = excluded.collection,
                sell_price = excluded.sell_price,
                price_per_area = excluded.price_per_area,
                roll_width = excluded.roll_width,
                buy_price = excluded.buy_price,
                buy_price_per_area = excluded.buy_price_per_area,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&item.product_id)
        .bind(&item.name)
        .bind(item.kind)
        .bind(&item.collection)
        .bind(opt_money_text(item.sell_price))
        .bind(opt_money_text(item.price_per_area))
        .bind(opt_decimal_text(item.roll_width))
        .bind(opt_money_text(item.buy_price))
        .bind(opt_money_text(item.buy_price_per_area))
        .bind(timestamp_text(Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a catalog item by product id.
    pub async fn get_item(&self, product_id: &str) -> DbResult<Option<CatalogItem>> {
        let mut conn = self.pool.acquire().await?;
        item_on(&mut conn, product_id).await
    }

    /// Gets a collection by name.
    pub async fn get_collection(&self, name: &str) -> DbResult<Option<Collection>> {
        let mut conn = self.pool.acquire().await?;
        collection_on(&mut conn, name).await
    }

    /// Lists all catalog items ordered by name.
    pub async fn list_items(&self) -> DbResult<Vec<CatalogItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM catalog_items ORDER BY name, product_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(item_from_row).collect()
    }

    /// Counts catalog items.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Resolves the price of a catalog item for the basket screen.
    ///
    /// ## Errors
    /// - `ProductNotFound` when the item is unknown
    /// - `NoResolvablePrice` when neither item nor collection carries a rate
    pub async fn resolve(
        &self,
        product_id: &str,
        mode: PricingMode,
        selected_size: Option<&str>,
    ) -> DbResult<ResolvedPrice> {
        let mut conn = self.pool.acquire().await?;

        let item = item_on(&mut conn, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        let collection = match item.collection.as_deref() {
            Some(name) => collection_on(&mut conn, name).await?,
            None => None,
        };

        Ok(resolve_price(
            &item,
            collection.as_ref(),
            mode,
            selected_size,
        )?)
    }

    /// Loads everything a basket needs into an in-memory [`Catalog`].
    ///
    /// Unknown product ids are skipped; settlement works from the line
    /// totals alone for those.
    pub async fn snapshot_on(
        conn: &mut SqliteConnection,
        basket: &[BasketLine],
    ) -> DbResult<Catalog> {
        let mut catalog = Catalog::new();
        let mut collection_names: BTreeSet<String> = basket
            .iter()
            .filter_map(|line| line.collection.clone())
            .collect();

        let product_ids: BTreeSet<&str> = basket.iter().map(|l| l.product_id.as_str()).collect();
        for product_id in product_ids {
            if let Some(item) = item_on(conn, product_id).await? {
                if let Some(name) = &item.collection {
                    collection_names.insert(name.clone());
                }
                catalog.insert_item(item);
            }
        }

        for name in &collection_names {
            if let Some(collection) = collection_on(conn, name).await? {
                catalog.insert_collection(collection);
            }
        }

        debug!(
            items = catalog.item_count(),
            collections = collection_names.len(),
            "Catalog snapshot taken"
        );
        Ok(catalog)
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

async fn item_on(conn: &mut SqliteConnection, product_id: &str) -> DbResult<Option<CatalogItem>> {
    let row = sqlx::query(&format!(
        "SELECT {ITEM_COLUMNS} FROM catalog_items WHERE product_id = ?1"
    ))
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(item_from_row).transpose()
}

async fn collection_on(conn: &mut SqliteConnection, name: &str) -> DbResult<Option<Collection>> {
    let row = sqlx::query(&format!(
        "SELECT {COLLECTION_COLUMNS} FROM collections WHERE name = ?1"
    ))
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(collection_from_row).transpose()
}

fn item_from_row(row: &SqliteRow) -> DbResult<CatalogItem> {
    let kind: ProductKind = row.try_get("kind")?;
    Ok(CatalogItem {
        product_id: row.try_get("product_id")?,
        name: row.try_get("name")?,
        kind,
        collection: row.try_get("collection")?,
        sell_price: opt_money_column(row, "sell_price")?,
        price_per_area: opt_money_column(row, "price_per_area")?,
        roll_width: opt_decimal_column(row, "roll_width")?,
        buy_price: opt_money_column(row, "buy_price")?,
        buy_price_per_area: opt_money_column(row, "buy_price_per_area")?,
    })
}

fn collection_from_row(row: &SqliteRow) -> DbResult<Collection> {
    Ok(Collection {
        name: row.try_get("name")?,
        price_per_area: opt_money_column(row, "price_per_area")?,
        credit_price_per_area: opt_money_column(row, "credit_price_per_area")?,
        buy_price_per_area: opt_money_column(row, "buy_price_per_area")?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use rugpos_core::{Measure, Money, PriceBook};
    use rust_decimal_macros::dec;

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();
        catalog
            .upsert_collection(
                &Collection::new("Atlas")
                    .with_rate(Money::from_major(20))
                    .with_credit_rate(Money::from_major(25))
                    .with_buy_rate(Money::from_major(12)),
            )
            .await
            .unwrap();
        catalog
            .upsert_item(&CatalogItem::area("atlas-1", "Atlas Blue", "Atlas"))
            .await
            .unwrap();
        catalog
            .upsert_item(&CatalogItem::roll("runner-4", "Runner", "Atlas", dec!(4)))
            .await
            .unwrap();
        catalog
            .upsert_item(&CatalogItem::unit("pillow", "Pillow", Money::new(dec!(7.50))))
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_item_round_trip() {
        let db = seeded().await;

        let runner = db.catalog().get_item("runner-4").await.unwrap().unwrap();
        assert_eq!(runner.kind, ProductKind::Roll);
        assert_eq!(runner.roll_width, Some(dec!(4)));
        assert_eq!(runner.collection.as_deref(), Some("Atlas"));

        let pillow = db.catalog().get_item("pillow").await.unwrap().unwrap();
        assert_eq!(pillow.sell_price, Some(Money::new(dec!(7.50))));
        assert_eq!(pillow.collection, None);

        assert!(db.catalog().get_item("missing").await.unwrap().is_none());
        assert_eq!(db.catalog().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_upsert_replaces_rates() {
        let db = seeded().await;
        db.catalog()
            .upsert_collection(&Collection::new("Atlas").with_rate(Money::from_major(22)))
            .await
            .unwrap();

        let atlas = db.catalog().get_collection("Atlas").await.unwrap().unwrap();
        assert_eq!(atlas.price_per_area, Some(Money::from_major(22)));
        assert_eq!(atlas.credit_price_per_area, None);
    }

    #[tokio::test]
    async fn test_resolve_uses_collection_rates() {
        let db = seeded().await;

        let standard = db
            .catalog()
            .resolve("runner-4", PricingMode::Standard, None)
            .await
            .unwrap();
        assert_eq!(standard.unit_price, Money::from_major(80));

        let credit = db
            .catalog()
            .resolve("runner-4", PricingMode::Credit, None)
            .await
            .unwrap();
        assert_eq!(credit.unit_price, Money::from_major(100));

        let err = db
            .catalog()
            .resolve("missing", PricingMode::Standard, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_snapshot_loads_items_and_collections() {
        let db = seeded().await;
        let basket = vec![
            BasketLine::new(
                "atlas-1",
                "Atlas Blue",
                None,
                Measure::Area {
                    width: dec!(3),
                    height: dec!(4),
                    pieces: 1,
                },
                Money::from_major(240),
            ),
            BasketLine::new(
                "unknown",
                "Loose item",
                None,
                Measure::Count {
                    quantity: 1,
                    size: None,
                },
                Money::from_major(5),
            ),
        ];

        let mut conn = db.pool().acquire().await.unwrap();
        let snapshot = CatalogRepository::snapshot_on(&mut conn, &basket)
            .await
            .unwrap();

        assert_eq!(snapshot.item_count(), 1);
        assert!(snapshot.item("atlas-1").is_some());
        assert!(snapshot.collection("Atlas").is_some());
    }
}
