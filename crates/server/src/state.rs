//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use crate::config::ServerConfig;
use crate::services::{RateLimiter, TokenService};

/// Login attempts allowed per source address per window.
const LOGIN_ATTEMPTS: u32 = 5;
const LOGIN_WINDOW: Duration = Duration::from_secs(60);

/// Checkout submissions allowed per source address per window.
const ORDER_ATTEMPTS: u32 = 30;
const ORDER_WINDOW: Duration = Duration::from_secs(60);

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the connection pool and the token service.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: SqlitePool,
    tokens: TokenService,
    login_limiter: RateLimiter,
    order_limiter: RateLimiter,
}

impl AppState {
    /// Create a new application state with the default rate limiters.
    #[must_use]
    pub fn new(config: ServerConfig, pool: SqlitePool) -> Self {
        let tokens = TokenService::new(config.token_secret.clone());
        Self::with_limiters(
            config,
            pool,
            tokens,
            RateLimiter::new(LOGIN_ATTEMPTS, LOGIN_WINDOW),
            RateLimiter::new(ORDER_ATTEMPTS, ORDER_WINDOW),
        )
    }

    /// Create application state with injected limiters (used by tests to
    /// tighten or widen the windows).
    #[must_use]
    pub fn with_limiters(
        config: ServerConfig,
        pool: SqlitePool,
        tokens: TokenService,
        login_limiter: RateLimiter,
        order_limiter: RateLimiter,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                login_limiter,
                order_limiter,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Get a reference to the token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Get the rate limiter guarding the login endpoint.
    #[must_use]
    pub fn login_limiter(&self) -> &RateLimiter {
        &self.inner.login_limiter
    }

    /// Get the rate limiter guarding checkout submissions.
    #[must_use]
    pub fn order_limiter(&self) -> &RateLimiter {
        &self.inner.order_limiter
    }
}
