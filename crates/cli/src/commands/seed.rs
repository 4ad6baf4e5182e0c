//! Demo-data seeding command.

use std::collections::BTreeMap;

use rust_decimal::dec;

use tamarind_server::db::products::{self, NewProduct};
use tamarind_server::db::settings;

use super::{CliError, connect};

/// Seed the database with a small demo catalog and default settings.
///
/// Safe to run repeatedly: existing ids/SKUs and settings keys are left
/// in place.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    let catalog = [
        NewProduct {
            id: None,
            name: "Jasmine Rice 5kg".to_owned(),
            sku: "RICE-5KG".to_owned(),
            price: dec!(195),
            price_dealer: dec!(175),
            price_vip: dec!(165),
            cost: dec!(140),
            stock: 40,
            min_stock: 10,
            unit: "bag".to_owned(),
            category: "grocery".to_owned(),
            image: String::new(),
        },
        NewProduct {
            id: None,
            name: "Fish Sauce 700ml".to_owned(),
            sku: "SAUCE-700".to_owned(),
            price: dec!(38),
            price_dealer: dec!(32),
            price_vip: dec!(30),
            cost: dec!(24),
            stock: 120,
            min_stock: 24,
            unit: "bottle".to_owned(),
            category: "grocery".to_owned(),
            image: String::new(),
        },
        NewProduct {
            id: None,
            name: "Drinking Water 6-pack".to_owned(),
            sku: "WATER-6P".to_owned(),
            price: dec!(45),
            price_dealer: dec!(40),
            price_vip: dec!(38),
            cost: dec!(30),
            stock: 60,
            min_stock: 12,
            unit: "pack".to_owned(),
            category: "beverage".to_owned(),
            image: String::new(),
        },
    ];

    let mut created = 0usize;
    for product in &catalog {
        match products::create(&pool, product).await {
            Ok(p) => {
                created += 1;
                tracing::info!(product_id = %p.id, sku = %p.sku, "seeded product");
            }
            Err(tamarind_server::db::RepositoryError::Conflict(_)) => {
                tracing::info!(sku = %product.sku, "already present, skipped");
            }
            Err(e) => return Err(e.into()),
        }
    }

    if settings::get(&pool, "store_name").await?.is_none() {
        let mut defaults = BTreeMap::new();
        defaults.insert("store_name".to_owned(), "Tamarind Store".to_owned());
        defaults.insert("currency".to_owned(), "THB".to_owned());
        defaults.insert(settings::DISCOUNT_RATE_KEY.to_owned(), "0".to_owned());
        settings::set_many(&pool, &defaults).await?;
        tracing::info!("seeded default settings");
    }

    tracing::info!(created, "seed complete");

    Ok(())
}
