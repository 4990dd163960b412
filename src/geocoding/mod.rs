//! Address resolution.
//!
//! Maps free-text addresses typed by landlords to ranked candidates the
//! user can pick from.

mod nominatim;
mod rate_limiter;

use std::future::Future;

use serde::{Deserialize, Serialize};

pub use nominatim::{GeocodingError, NominatimResolver};
pub use rate_limiter::RateLimiter;

/// Placeholder for candidates without a region.
pub const UNKNOWN_REGION: &str = "Not specified";

/// One geocoder match with the parts the bot needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressCandidate {
    pub house_number: String,
    pub road: String,
    pub region: Option<String>,
    pub city: String,
    pub display_name: String,
}

impl AddressCandidate {
    /// Region, or a placeholder when the geocoder had none.
    #[must_use]
    pub fn region_label(&self) -> &str {
        self.region.as_deref().unwrap_or(UNKNOWN_REGION)
    }

    /// Address stored on the listing: `road, house, region, city`.
    #[must_use]
    pub fn full_address(&self) -> String {
        format!(
            "{}, {}, {}, {}",
            self.road,
            self.house_number,
            self.region_label(),
            self.city
        )
    }
}

/// Resolves free text into address candidates.
pub trait AddressResolver: Send + Sync {
    fn resolve(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<AddressCandidate>, GeocodingError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_address() {
        let candidate = AddressCandidate {
            house_number: "1".to_owned(),
            road: "Red Square".to_owned(),
            region: None,
            city: "Moscow".to_owned(),
            display_name: "1, Red Square, Moscow, Russia".to_owned(),
        };
        assert_eq!(candidate.full_address(), "Red Square, 1, Not specified, Moscow");
    }
}
