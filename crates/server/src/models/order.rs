//! Order model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tamarind_core::{OrderId, OrderStatus, ProductId};

/// A committed order.
///
/// Line items are the server-confirmed ones: tier-resolved unit prices and
/// cost snapshots taken at sale time, never the prices the client sent.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub items: Vec<OrderLine>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub payment_method: String,
    pub status: OrderStatus,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slip_image: Option<String>,
    pub created_by: Option<String>,
    pub customer_name: Option<String>,
    pub customer_address: Option<String>,
    pub customer_phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A single confirmed order line.
///
/// Serialized into the order's `items` blob and mirrored as an
/// `order_items` row for aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i64,
    /// Tier-resolved unit price at time of sale.
    pub unit_price: Decimal,
    /// Unit cost snapshot at time of sale; later catalog edits must not
    /// retroactively alter historical profit figures.
    pub unit_cost: Decimal,
}

impl OrderLine {
    /// The line total (unit price times quantity).
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}
