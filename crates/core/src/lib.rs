//! Tamarind Core - Shared types library.
//!
//! This crate provides common types used across all Tamarind POS components:
//! - `server` - HTTP API serving the POS and store admin
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, roles, pricing tiers, and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
