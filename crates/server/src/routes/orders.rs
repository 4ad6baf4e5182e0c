//! Order route handlers.
//!
//! Checkout is open to guests (rate limited); reading, verifying and
//! cancelling orders require a session.

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};

use tamarind_core::{OrderId, OrderStatus, ProductId};

use crate::db::orders;
use crate::error::AppError;
use crate::middleware::{ClientIp, OptionalAuth, RequireAuth, RequireOwner};
use crate::models::Order;
use crate::services::checkout::RECENT_ORDER_LIMIT;
use crate::services::{Cart, CartLine, CheckoutService, RateDecision};
use crate::state::AppState;

/// Checkout request body. Any client-supplied prices or totals inside the
/// item objects are dropped at deserialization; the server reprices the
/// cart from the catalog.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: String,
    pub slip_image: Option<String>,
    pub customer_name: Option<String>,
    pub customer_address: Option<String>,
    pub customer_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutItem {
    pub product_id: String,
    pub quantity: i64,
}

fn default_payment_method() -> String {
    "cash".to_owned()
}

/// Status transition request body.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

/// List recent orders, newest first.
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(_claims): RequireAuth,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = orders::list_recent(state.pool(), RECENT_ORDER_LIMIT).await?;
    Ok(Json(orders))
}

/// Place an order.
pub async fn create(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    OptionalAuth(claims): OptionalAuth,
    Json(body): Json<CheckoutRequest>,
) -> Result<Json<Value>, AppError> {
    if let RateDecision::Limited { retry_after_secs } = state.order_limiter().check(ip) {
        tracing::warn!(%ip, "order rate limit tripped");
        return Err(AppError::RateLimited { retry_after_secs });
    }

    let cart = Cart {
        lines: body
            .items
            .into_iter()
            .map(|item| CartLine {
                product_id: ProductId::from(item.product_id),
                quantity: item.quantity,
            })
            .collect(),
        payment_method: body.payment_method,
        status: body.status,
        notes: body.notes,
        slip_image: body.slip_image,
        customer_name: body.customer_name,
        customer_address: body.customer_address,
        customer_phone: body.customer_phone,
    };

    let receipt = CheckoutService::new(state.pool())
        .checkout(cart, claims.as_ref())
        .await?;

    Ok(Json(json!({
        "success": true,
        "order_id": receipt.order_id,
        "total": receipt.total,
    })))
}

/// Verify a pending transfer. The only transition this endpoint performs
/// is `pending_verification` to `completed`; anything else is refused.
pub async fn update_status(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Value>, AppError> {
    if body.status != OrderStatus::Completed {
        return Err(AppError::BadRequest(format!(
            "orders cannot be moved to {}",
            body.status
        )));
    }

    let id = OrderId::from(id);
    let order = orders::get(state.pool(), &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    if !order.status.can_transition_to(OrderStatus::Completed) {
        return Err(AppError::Conflict(format!(
            "order {id} is {} and cannot be completed",
            order.status
        )));
    }

    // CAS write: a concurrent transition between read and write loses
    if !orders::update_status(
        state.pool(),
        &id,
        OrderStatus::PendingVerification,
        OrderStatus::Completed,
    )
    .await?
    {
        return Err(AppError::Conflict(format!(
            "order {id} was transitioned concurrently"
        )));
    }

    tracing::info!(order_id = %id, by = %claims.username, "order verified");

    Ok(Json(json!({ "success": true })))
}

/// Cancel an order, restoring stock and logging the reversal.
pub async fn cancel(
    State(state): State<AppState>,
    RequireOwner(claims): RequireOwner,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = OrderId::from(id);
    CheckoutService::new(state.pool()).cancel(&id, &claims).await?;
    Ok(Json(json!({ "success": true })))
}
