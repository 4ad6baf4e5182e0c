//! Integration test harness for Tamarind POS.
//!
//! Drives the full router in process against an in-memory database, so
//! the tests cover everything from JSON parsing and the auth extractors
//! down to the SQL without a listening socket.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

use tamarind_core::{ProductId, Role};
use tamarind_server::config::ServerConfig;
use tamarind_server::db::products::{self, NewProduct};
use tamarind_server::db::users::{self, NewUser};
use tamarind_server::services::{RateLimiter, TokenService, password};
use tamarind_server::state::AppState;
use tamarind_server::{build_router, db};

/// A router plus direct pool access for seeding and assertions.
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
}

fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: SecretString::from("sqlite::memory:"),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        token_secret: SecretString::from("k9J2mQ7xW4vN8bR5tY1uP3sD6fG0hL9a"),
        sentry_dsn: None,
    }
}

impl TestApp {
    /// Spawn an app with the default rate limits.
    pub async fn spawn() -> Self {
        let pool = db::create_in_memory_pool().await.unwrap();
        let state = AppState::new(test_config(), pool.clone());
        Self {
            router: build_router(state),
            pool,
        }
    }

    /// Spawn an app with injected login/order rate limiters.
    pub async fn spawn_with_limiters(login: RateLimiter, order: RateLimiter) -> Self {
        let pool = db::create_in_memory_pool().await.unwrap();
        let config = test_config();
        let tokens = TokenService::new(config.token_secret.clone());
        let state = AppState::with_limiters(config, pool.clone(), tokens, login, order);
        Self {
            router: build_router(state),
            pool,
        }
    }

    /// Issue a request and return the status plus the parsed JSON body
    /// (`Value::Null` when the body is empty or not JSON).
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    /// Create an account directly in the store with a hashed credential.
    pub async fn create_user(&self, username: &str, pass: &str, role: Role) {
        users::create(
            &self.pool,
            &NewUser {
                username: username.to_owned(),
                credential: password::hash_password(pass),
                name: format!("{username} (test)"),
                role,
            },
        )
        .await
        .unwrap();
    }

    /// Create an account whose stored credential is legacy plain text.
    pub async fn create_legacy_user(&self, username: &str, pass: &str, role: Role) {
        users::create(
            &self.pool,
            &NewUser {
                username: username.to_owned(),
                credential: pass.to_owned(),
                name: format!("{username} (test)"),
                role,
            },
        )
        .await
        .unwrap();
    }

    /// Fetch the stored credential string for a username.
    pub async fn stored_credential(&self, username: &str) -> String {
        users::get_with_credential(&self.pool, username)
            .await
            .unwrap()
            .map(|(_, credential)| credential)
            .unwrap()
    }

    /// Seed a product at 100/90/85 tier pricing.
    pub async fn seed_product(&self, id: &str, stock: i64) {
        products::create(
            &self.pool,
            &NewProduct {
                id: Some(ProductId::from(id)),
                name: format!("Product {id}"),
                sku: format!("SKU-{id}"),
                price: Decimal::from(100),
                price_dealer: Decimal::from(90),
                price_vip: Decimal::from(85),
                cost: Decimal::from(70),
                stock,
                min_stock: 5,
                unit: "pc".to_owned(),
                category: "general".to_owned(),
                image: String::new(),
            },
        )
        .await
        .unwrap();
    }

    /// Current stock level of a product.
    pub async fn stock_of(&self, id: &str) -> i64 {
        products::get(&self.pool, &ProductId::from(id))
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    /// Log in over HTTP and return the issued token.
    pub async fn login(&self, username: &str, pass: &str) -> String {
        let (status, body) = self
            .request(
                "POST",
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "username": username, "password": pass })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_owned()
    }
}
