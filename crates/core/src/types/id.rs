//! Newtype IDs for type-safe entity references.
//!
//! Products and orders carry external string identifiers that survive exports,
//! receipts and ledger references (e.g. `P240115093055123`, `ORD240115093210042`).
//! Use the `define_external_id!` macro to create type-safe wrappers that prevent
//! accidentally mixing IDs from different entity types.

use serde::{Deserialize, Serialize};

/// Macro to define a type-safe external ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `generate()` producing `<prefix><YYMMDDHHMMSS><3 random digits>`
///
/// # Example
///
/// ```rust
/// # use tamarind_core::define_external_id;
/// define_external_id!(ProductId, "P");
/// define_external_id!(OrderId, "ORD");
///
/// let product_id = ProductId::generate();
/// assert!(product_id.as_str().starts_with('P'));
///
/// // These are different types, so this won't compile:
/// // let _: ProductId = OrderId::generate();
/// ```
#[macro_export]
macro_rules! define_external_id {
    ($name:ident, $prefix:literal) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an ID from an existing string value.
            #[must_use]
            pub const fn new(id: String) -> Self {
                Self(id)
            }

            /// Generate a fresh ID: prefix, UTC timestamp, 3 random digits.
            #[must_use]
            pub fn generate() -> Self {
                let date_part = ::chrono::Utc::now().format("%y%m%d%H%M%S");
                let random_part: u32 = ::rand::Rng::random_range(&mut ::rand::rng(), 0..1000);
                Self(format!("{}{}{:03}", $prefix, date_part, random_part))
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Define standard entity IDs
define_external_id!(ProductId, "P");
define_external_id!(OrderId, "ORD");

/// Internal numeric user ID (database row ID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Create a new user ID from an i64 value.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the underlying i64 value.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_carry_prefix_and_length() {
        let product = ProductId::generate();
        let order = OrderId::generate();

        // "P" + 12 timestamp digits + 3 random digits
        assert!(product.as_str().starts_with('P'));
        assert_eq!(product.as_str().len(), 16);

        assert!(order.as_str().starts_with("ORD"));
        assert_eq!(order.as_str().len(), 18);
    }

    #[test]
    fn ids_round_trip_through_serde_as_plain_strings() {
        let id = ProductId::from("P240101000000001");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"P240101000000001\"");

        let back: ProductId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
