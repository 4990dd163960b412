//! Listing records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of photos attached to one listing.
pub const MAX_PHOTOS: usize = 50;

/// Telegram user id of a listing owner.
pub type OwnerId = i64;

/// Listing identifier, assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub u64);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ListingId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Opaque reference to a photo stored on Telegram's side.
///
/// The transport decides the encoding; the store only keeps the string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoRef(pub String);

impl PhotoRef {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Whether the listing address was picked from geocoder results or still
/// waits for a moderator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressStatus {
    #[default]
    Verified,
    PendingReview,
}

/// A stored rental listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub owner_id: OwnerId,
    pub city: String,
    pub street: Option<String>,
    pub address: String,
    pub price: f64,
    pub storey: i32,
    pub rooms: u32,
    pub description: String,
    #[serde(default)]
    pub photos: Vec<PhotoRef>,
    pub is_available: bool,
    #[serde(default)]
    pub address_status: AddressStatus,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// Human-readable availability label.
    #[must_use]
    pub const fn status_label(&self) -> &'static str {
        if self.is_available {
            "✅ Available"
        } else {
            "❌ Taken"
        }
    }

    /// Whether renters may see this listing.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.is_available && self.address_status == AddressStatus::Verified
    }
}

/// Data needed to create a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    pub owner_id: OwnerId,
    pub city: String,
    pub street: Option<String>,
    pub address: String,
    pub price: f64,
    pub storey: i32,
    pub rooms: u32,
    pub description: String,
    pub photos: Vec<PhotoRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_id_parse() {
        assert_eq!(" 42 ".parse::<ListingId>().ok(), Some(ListingId(42)));
        assert!("x".parse::<ListingId>().is_err());
        assert!("-1".parse::<ListingId>().is_err());
    }

    #[test]
    fn test_address_status_serde() {
        let json = serde_json::to_string(&AddressStatus::PendingReview).unwrap();
        assert_eq!(json, "\"pending_review\"");
    }
}
