//! Core types for Tamarind POS.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod role;
pub mod status;

pub use id::*;
pub use role::{PriceTier, Role};
pub use status::OrderStatus;
