//! Inventory ledger model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tamarind_core::ProductId;

/// Well-known ledger action labels.
///
/// The column is free text so manual adjustments can carry operator wording,
/// but everything the server writes uses these.
pub mod actions {
    pub const SALE: &str = "Sale";
    pub const ORDER_CANCELLED: &str = "Order Cancelled";
    pub const INITIAL_STOCK: &str = "Initial Stock";
    pub const ADJUSTMENT: &str = "Adjustment";
}

/// One immutable stock mutation record.
///
/// The ledger is append-only and is the sole source of truth for stock
/// history: every entry carries the signed delta, the balance that resulted,
/// and a reference back to its cause (order id or operator note).
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub action: String,
    pub product_id: ProductId,
    /// Product name at the time of the mutation; survives product deletion.
    pub product_name: String,
    pub quantity_change: i64,
    pub new_stock: i64,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}
