//! Domain services sitting between the HTTP surface and the stores.

pub mod auth;
pub mod checkout;
pub mod password;
pub mod rate_limit;
pub mod token;

pub use auth::{AuthError, AuthService};
pub use checkout::{Cart, CartLine, CheckoutError, CheckoutReceipt, CheckoutService};
pub use rate_limit::{RateDecision, RateLimiter};
pub use token::{Claims, TokenError, TokenService};
