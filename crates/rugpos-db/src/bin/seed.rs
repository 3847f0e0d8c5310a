//! # Seed Data Generator
//!
//! Populates the database with collections and catalog items for
//! development.
//!
//! ## Usage
//! ```bash
//! # Use the configured database (rugpos.toml / RUGPOS_DB_PATH)
//! cargo run -p rugpos-db --bin seed
//!
//! # Specify database path
//! cargo run -p rugpos-db --bin seed -- --db ./data/rugpos_dev.db
//! ```
//!
//! ## Generated Catalog
//! - Collections with standard, credit and buy rates per m²
//! - Area carpets in every collection
//! - Roll runners in common widths
//! - A handful of unit goods (pillows, mats) with flat prices
//!
//! Prices are deterministic so repeated seeds of fresh databases match.

use rugpos_core::{CatalogItem, Collection, Money};
use rugpos_db::{DbConfig, RugposConfig};
use rust_decimal::Decimal;
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// (name, standard, credit, buy) per m², in cents
const COLLECTIONS: &[(&str, i64, i64, i64)] = &[
    ("Atlas", 1800, 2100, 1100),
    ("Royal", 2400, 2850, 1500),
    ("Carving", 1500, 1750, 900),
    ("Heritage", 3200, 3800, 2100),
    ("Softline", 1200, 1400, 700),
];

const DESIGNS: &[&str] = &["Ivory", "Garnet", "Sapphire", "Olive", "Sand", "Graphite"];

/// Roll widths in centimeters
const ROLL_WIDTHS: &[i64] = &[80, 100, 150, 200, 300, 400];

/// (name, sell, buy) in cents
const UNIT_GOODS: &[(&str, i64, i64)] = &[
    ("Floor Pillow", 1500, 800),
    ("Door Mat", 900, 450),
    ("Prayer Rug", 2500, 1400),
    ("Bath Mat", 1100, 600),
    ("Rug Pad", 1300, 700),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut db_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("rugpos seed data generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: from rugpos.toml)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let config = RugposConfig::load_or_default(None);
    let db_config = match db_path {
        Some(path) => DbConfig::new(path)
            .default_rate(config.currency.default_rate)
            .debt_term_days(config.debts.default_term_days),
        None => config.db_config(),
    };

    info!(path = %db_config.database_path.display(), "Seeding database");
    let db = rugpos_db::Database::new(db_config).await?;

    let existing = db.catalog().count().await?;
    if existing > 0 {
        warn!(
            existing,
            "Catalog already has items, skipping seed. Delete the database file to regenerate."
        );
        return Ok(());
    }

    let start = std::time::Instant::now();
    let catalog = db.catalog();
    let mut items = 0;

    for &(name, standard, credit, buy) in COLLECTIONS {
        catalog
            .upsert_collection(
                &Collection::new(name)
                    .with_rate(Money::from_minor(standard))
                    .with_credit_rate(Money::from_minor(credit))
                    .with_buy_rate(Money::from_minor(buy)),
            )
            .await?;

        for (n, design) in DESIGNS.iter().enumerate() {
            let id = format!("{}-{:02}", name.to_lowercase(), n + 1);
            catalog
                .upsert_item(&CatalogItem::area(id, format!("{name} {design}"), name))
                .await?;
            items += 1;
        }

        for &width_cm in ROLL_WIDTHS {
            let width = Decimal::new(width_cm, 2);
            let id = format!("{}-roll-{width_cm}", name.to_lowercase());
            catalog
                .upsert_item(&CatalogItem::roll(
                    id,
                    format!("{name} Runner {}m", width.normalize()),
                    name,
                    width,
                ))
                .await?;
            items += 1;
        }
    }

    for (n, &(name, sell, buy)) in UNIT_GOODS.iter().enumerate() {
        catalog
            .upsert_item(
                &CatalogItem::unit(format!("unit-{:02}", n + 1), name, Money::from_minor(sell))
                    .with_buy_price(Money::from_minor(buy)),
            )
            .await?;
        items += 1;
    }

    info!(
        collections = COLLECTIONS.len(),
        items,
        elapsed = ?start.elapsed(),
        "Seed complete"
    );

    // Sanity check against the resolver
    let sample = catalog
        .resolve("atlas-01", rugpos_core::PricingMode::Standard, Some("3×4"))
        .await?;
    info!(product_id = "atlas-01", size = "3×4", price = %sample.unit_price, "Resolver check");

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rugpos=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
