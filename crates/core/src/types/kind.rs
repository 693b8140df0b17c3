//! Collection kinds.

use serde::{Deserialize, Serialize};

/// The two item collections a shopper owns.
///
/// Each kind has its own device storage key and its own REST resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// Items the shopper intends to buy.
    Cart,
    /// Items the shopper saved for later.
    Wishlist,
}

impl CollectionKind {
    /// Key of the device storage blob holding the anonymous snapshot.
    #[must_use]
    pub const fn storage_key(self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Wishlist => "wishlist",
        }
    }

    /// REST resource segment (`/cart`, `/wishlist`).
    #[must_use]
    pub const fn resource(self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Wishlist => "wishlist",
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cart => write!(f, "cart"),
            Self::Wishlist => write!(f, "wishlist"),
        }
    }
}

impl std::str::FromStr for CollectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cart" => Ok(Self::Cart),
            "wishlist" => Ok(Self::Wishlist),
            _ => Err(format!("invalid collection kind: {s}")),
        }
    }
}
