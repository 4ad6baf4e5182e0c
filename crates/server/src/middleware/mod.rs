//! Request extractors shared by the route handlers.

pub mod auth;
pub mod client_ip;

pub use auth::{OptionalAuth, RequireAuth, RequireOwner};
pub use client_ip::ClientIp;
