//! Order status and its allowed transitions.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Transitions are one-way: an order awaiting slip verification can be
/// confirmed, and nothing else moves. Cancellation is not a status flip -
/// it is the stock-restoring deletion path, so `Cancelled` only ever
/// appears on orders written that way at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Completed,
    PendingVerification,
    Cancelled,
}

impl OrderStatus {
    /// Whether a status transition is allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::PendingVerification, Self::Completed)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::PendingVerification => write!(f, "pending_verification"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(Self::Completed),
            "pending_verification" => Ok(Self::PendingVerification),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}
