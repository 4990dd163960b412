//! Nominatim (OpenStreetMap) geocoder client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::{AddressCandidate, AddressResolver, RateLimiter};

/// Nominatim asks for at most one request per second.
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur while geocoding.
#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("Geocoder request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Geocoder returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Deserialize)]
struct Place {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    address: PlaceAddress,
}

#[derive(Debug, Default, Deserialize)]
struct PlaceAddress {
    house_number: Option<String>,
    road: Option<String>,
    pedestrian: Option<String>,
    path: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    county: Option<String>,
    state_district: Option<String>,
    state: Option<String>,
}

impl Place {
    /// Keeps only places precise enough to rent out: house, road and city.
    fn into_candidate(self) -> Option<AddressCandidate> {
        let PlaceAddress {
            house_number,
            road,
            pedestrian,
            path,
            city,
            town,
            village,
            county,
            state_district,
            state,
        } = self.address;

        Some(AddressCandidate {
            house_number: house_number?,
            road: road.or(pedestrian).or(path)?,
            region: county.or(state_district).or(state),
            city: city.or(town).or(village)?,
            display_name: self.display_name,
        })
    }
}

/// Geocoder backed by a Nominatim-compatible HTTP API.
#[derive(Debug)]
pub struct NominatimResolver {
    client: Client,
    base_url: String,
    limit: usize,
    rate_limiter: RateLimiter,
}

impl NominatimResolver {
    /// Creates a resolver.
    ///
    /// The contact e-mail goes into the `User-Agent` header as required by
    /// the Nominatim usage policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, contact_email: &str, limit: usize) -> Result<Self, GeocodingError> {
        let client = Client::builder()
            .user_agent(format!(
                "rental_listing_bot/{} ({contact_email})",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            limit,
            rate_limiter: RateLimiter::new(MIN_REQUEST_INTERVAL),
        })
    }
}

impl AddressResolver for NominatimResolver {
    async fn resolve(&self, query: &str) -> Result<Vec<AddressCandidate>, GeocodingError> {
        let waited = self.rate_limiter.wait_and_acquire().await;
        if !waited.is_zero() {
            debug!("Waited {:?} for geocoder rate limit", waited);
        }

        let limit = self.limit.to_string();
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("addressdetails", "1"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Geocoder returned {} for query", status);
            return Err(GeocodingError::Status(status));
        }

        let places: Vec<Place> = response.json().await?;
        let total = places.len();
        let candidates = extract_candidates(places);
        debug!(
            "Geocoder returned {} places, {} usable",
            total,
            candidates.len()
        );
        Ok(candidates)
    }
}

fn extract_candidates(places: Vec<Place>) -> Vec<AddressCandidate> {
    places.into_iter().filter_map(Place::into_candidate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "display_name": "1, Red Square, Tverskoy, Moscow, Russia",
            "address": {
                "house_number": "1",
                "road": "Red Square",
                "state_district": "Central",
                "state": "Moscow",
                "city": "Moscow"
            }
        },
        {
            "display_name": "Red Square, Moscow",
            "address": { "road": "Red Square", "city": "Moscow" }
        },
        {
            "display_name": "5, Market Walk, Hamlet",
            "address": { "house_number": "5", "pedestrian": "Market Walk", "village": "Hamlet" }
        },
        { "display_name": "Somewhere" }
    ]"#;

    #[test]
    fn test_extract_candidates() {
        let places: Vec<Place> = serde_json::from_str(SAMPLE).unwrap();
        let candidates = extract_candidates(places);

        assert_eq!(candidates.len(), 2);

        assert_eq!(candidates[0].road, "Red Square");
        assert_eq!(candidates[0].region.as_deref(), Some("Central"));
        assert_eq!(candidates[0].city, "Moscow");

        assert_eq!(candidates[1].road, "Market Walk");
        assert_eq!(candidates[1].city, "Hamlet");
        assert_eq!(candidates[1].region, None);
        assert_eq!(candidates[1].region_label(), "Not specified");
    }

    #[test]
    fn test_county_preferred_over_state() {
        let places: Vec<Place> = serde_json::from_str(
            r#"[{"display_name":"x","address":{"house_number":"2","road":"Main","town":"Klin","county":"Klinsky","state":"Moscow Oblast"}}]"#,
        )
        .unwrap();
        let candidates = extract_candidates(places);
        assert_eq!(candidates[0].region.as_deref(), Some("Klinsky"));
        assert_eq!(candidates[0].city, "Klin");
    }

    #[test]
    fn test_new_trims_base_url() {
        let resolver = NominatimResolver::new("https://example.org/", "ops@example.org", 5).unwrap();
        assert_eq!(resolver.base_url, "https://example.org");
    }
}
