//! HTTP route handlers and router assembly.

use axum::Router;
use axum::routing::{get, patch, post};

use crate::state::AppState;

pub mod analytics;
pub mod auth;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod settings;
pub mod users;

/// Build the `/api` router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::get)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/orders", get(orders::list).post(orders::create))
        .route("/orders/{id}", axum::routing::delete(orders::cancel))
        .route("/orders/{id}/status", patch(orders::update_status))
        .route("/inventory", get(inventory::list))
        .route("/inventory/adjust", post(inventory::adjust))
        .route("/settings", get(settings::get).post(settings::set))
        .route("/analytics", get(analytics::summary))
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/{id}",
            axum::routing::put(users::update).delete(users::delete),
        )
}
