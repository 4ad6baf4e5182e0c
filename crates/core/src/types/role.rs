//! User roles and the pricing tiers they resolve to.
//!
//! Tier resolution is the single most security-sensitive mapping in the
//! system: the server charges a line at the tier derived from the verified
//! token role, never at whatever tier (or price) the client claims.

use serde::{Deserialize, Serialize};

/// User role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access to all store management features.
    Owner,
    /// Places orders at retail pricing, no store administration.
    Staff,
    /// Reseller buying at the dealer price column.
    Dealer,
    /// High-volume reseller buying at the VIP price column.
    DealerVip,
}

impl Role {
    /// Resolve the pricing tier this role buys at.
    ///
    /// Owner and staff buy at retail, same as a guest with no token.
    #[must_use]
    pub const fn price_tier(self) -> PriceTier {
        match self {
            Self::Owner | Self::Staff => PriceTier::Retail,
            Self::Dealer => PriceTier::Dealer,
            Self::DealerVip => PriceTier::Vip,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owner => write!(f, "owner"),
            Self::Staff => write!(f, "staff"),
            Self::Dealer => write!(f, "dealer"),
            Self::DealerVip => write!(f, "dealer_vip"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "staff" => Ok(Self::Staff),
            "dealer" => Ok(Self::Dealer),
            "dealer_vip" => Ok(Self::DealerVip),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Pricing class determining which stored price column applies to a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriceTier {
    /// Standard walk-in price. Also the fallback when a tier price is unset.
    #[default]
    Retail,
    Dealer,
    Vip,
}

impl std::fmt::Display for PriceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retail => write!(f, "retail"),
            Self::Dealer => write!(f, "dealer"),
            Self::Vip => write!(f, "vip"),
        }
    }
}
