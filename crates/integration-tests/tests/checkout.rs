//! Checkout pricing, atomicity and cancellation over HTTP.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::{Value, json};

use rust_decimal::{Decimal, dec};
use tamarind_core::Role;
use tamarind_integration_tests::TestApp;

fn order_body(items: Value) -> Value {
    json!({ "items": items, "payment_method": "cash" })
}

/// Money travels as decimal strings; compare numerically, not textually.
fn money(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn client_supplied_prices_are_ignored() {
    let app = TestApp::spawn().await;
    app.seed_product("P1", 10).await;

    // A hostile client claims the 100-baht product costs a satang
    let body = json!({
        "items": [{ "product_id": "P1", "quantity": 2, "price": 0.01 }],
        "total": 0.02,
    });
    let (status, response) = app.request("POST", "/api/orders", None, Some(body)).await;

    assert_eq!(status, StatusCode::OK, "{response}");
    assert_eq!(money(&response["total"]), dec!(200));
    assert_eq!(app.stock_of("P1").await, 8);
}

#[tokio::test]
async fn guests_buy_at_retail_and_dealers_at_their_tier() {
    let app = TestApp::spawn().await;
    app.seed_product("P1", 50).await;
    app.create_user("dealer1", "dealer-pw", Role::Dealer).await;

    let (_, guest) = app
        .request(
            "POST",
            "/api/orders",
            None,
            Some(order_body(json!([{ "product_id": "P1", "quantity": 1 }]))),
        )
        .await;
    assert_eq!(money(&guest["total"]), dec!(100));

    let token = app.login("dealer1", "dealer-pw").await;
    let (_, dealer) = app
        .request(
            "POST",
            "/api/orders",
            Some(&token),
            Some(order_body(json!([{ "product_id": "P1", "quantity": 1 }]))),
        )
        .await;
    assert_eq!(money(&dealer["total"]), dec!(90));
}

#[tokio::test]
async fn one_failing_line_rolls_back_the_whole_cart() {
    let app = TestApp::spawn().await;
    app.seed_product("P1", 10).await;
    app.seed_product("P2", 1).await;

    let (status, body) = app
        .request(
            "POST",
            "/api/orders",
            None,
            Some(order_body(json!([
                { "product_id": "P1", "quantity": 2 },
                { "product_id": "P2", "quantity": 5 },
            ]))),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(app.stock_of("P1").await, 10);
    assert_eq!(app.stock_of("P2").await, 1);
}

#[tokio::test]
async fn oversized_carts_cannot_oversell() {
    let app = TestApp::spawn().await;
    app.seed_product("P1", 3).await;

    let two = order_body(json!([{ "product_id": "P1", "quantity": 2 }]));
    let (status, _) = app
        .request("POST", "/api/orders", None, Some(two.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.request("POST", "/api/orders", None, Some(two)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.stock_of("P1").await, 1);
}

#[tokio::test]
async fn empty_and_nonsense_carts_are_bad_requests() {
    let app = TestApp::spawn().await;
    app.seed_product("P1", 10).await;

    let (status, _) = app
        .request("POST", "/api/orders", None, Some(order_body(json!([]))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            "POST",
            "/api/orders",
            None,
            Some(order_body(json!([{ "product_id": "P1", "quantity": 0 }]))),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            "POST",
            "/api/orders",
            None,
            Some(order_body(json!([{ "product_id": "GHOST", "quantity": 1 }]))),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancellation_restores_stock_and_is_owner_only() {
    let app = TestApp::spawn().await;
    app.seed_product("P1", 10).await;
    app.create_user("somsak", "owner-pw", Role::Owner).await;
    app.create_user("malee", "staff-pw", Role::Staff).await;

    let (_, receipt) = app
        .request(
            "POST",
            "/api/orders",
            None,
            Some(order_body(json!([{ "product_id": "P1", "quantity": 4 }]))),
        )
        .await;
    let order_id = receipt["order_id"].as_str().unwrap().to_owned();
    assert_eq!(app.stock_of("P1").await, 6);

    let staff = app.login("malee", "staff-pw").await;
    let (status, _) = app
        .request("DELETE", &format!("/api/orders/{order_id}"), Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.stock_of("P1").await, 6);

    let owner = app.login("somsak", "owner-pw").await;
    let (status, _) = app
        .request("DELETE", &format!("/api/orders/{order_id}"), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.stock_of("P1").await, 10);

    let (status, _) = app
        .request("DELETE", &format!("/api/orders/{order_id}"), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pending_transfer_is_verified_exactly_once() {
    let app = TestApp::spawn().await;
    app.seed_product("P1", 10).await;
    app.create_user("malee", "staff-pw", Role::Staff).await;

    let mut body = order_body(json!([{ "product_id": "P1", "quantity": 1 }]));
    body["status"] = json!("pending_verification");
    body["payment_method"] = json!("transfer");
    let (_, receipt) = app.request("POST", "/api/orders", None, Some(body)).await;
    let order_id = receipt["order_id"].as_str().unwrap().to_owned();

    let token = app.login("malee", "staff-pw").await;
    let path = format!("/api/orders/{order_id}/status");

    let (status, _) = app
        .request("PATCH", &path, Some(&token), Some(json!({ "status": "completed" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    // already completed; the transition is one-way
    let (status, _) = app
        .request("PATCH", &path, Some(&token), Some(json!({ "status": "completed" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .request("PATCH", &path, Some(&token), Some(json!({ "status": "cancelled" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn discount_rate_setting_applies_to_the_cart() {
    let app = TestApp::spawn().await;
    app.seed_product("P1", 10).await;
    app.create_user("somsak", "owner-pw", Role::Owner).await;
    let owner = app.login("somsak", "owner-pw").await;

    let (status, _) = app
        .request(
            "POST",
            "/api/settings",
            Some(&owner),
            Some(json!({ "discount_rate": "10" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, receipt) = app
        .request(
            "POST",
            "/api/orders",
            None,
            Some(order_body(json!([{ "product_id": "P1", "quantity": 2 }]))),
        )
        .await;
    assert_eq!(money(&receipt["total"]), dec!(180));
}
