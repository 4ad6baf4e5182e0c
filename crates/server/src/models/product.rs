//! Product model and tier price resolution.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use tamarind_core::{PriceTier, ProductId};

/// A catalog product.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    /// Retail price, the default for guests, owner and staff.
    pub price: Decimal,
    pub price_dealer: Decimal,
    pub price_vip: Decimal,
    /// Unit cost, snapshotted into order lines at sale time.
    pub cost: Decimal,
    pub stock: i64,
    pub min_stock: i64,
    pub unit: String,
    pub category: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Resolve the unit price for a pricing tier.
    ///
    /// Tier prices are discounts, never surcharges: a zero or unset tier
    /// price falls back to retail rather than selling the item for free.
    #[must_use]
    pub fn tier_price(&self, tier: PriceTier) -> Decimal {
        let tiered = match tier {
            PriceTier::Retail => self.price,
            PriceTier::Dealer => self.price_dealer,
            PriceTier::Vip => self.price_vip,
        };
        if tiered > Decimal::ZERO {
            tiered
        } else {
            self.price
        }
    }

    /// Whether the product is at or below its low-stock threshold.
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}
