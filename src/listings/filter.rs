//! Renter search filters.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Listing;

/// A field of the search form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterField {
    City,
    Address,
    PriceMin,
    PriceMax,
    Rooms,
    Storey,
}

impl FilterField {
    /// All fields, in form order.
    pub const ALL: [Self; 6] = [
        Self::City,
        Self::Address,
        Self::PriceMin,
        Self::PriceMax,
        Self::Rooms,
        Self::Storey,
    ];

    /// Stable key used in callback data.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::City => "city",
            Self::Address => "address",
            Self::PriceMin => "price_min",
            Self::PriceMax => "price_max",
            Self::Rooms => "rooms",
            Self::Storey => "floor",
        }
    }

    /// Label shown on the form buttons.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::City => "City",
            Self::Address => "Address",
            Self::PriceMin => "Min price",
            Self::PriceMax => "Max price",
            Self::Rooms => "Rooms",
            Self::Storey => "Floor",
        }
    }

    /// Looks a field up by its callback key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rejected filter value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterValueError {
    #[error("Enter a valid number for the price.")]
    NotANumber,

    #[error("Enter a whole number for this field.")]
    NotAnInteger,

    #[error("The value must not be empty.")]
    Empty,
}

/// Optional constraints applied to available listings.
///
/// Unset fields do not constrain the search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub city: Option<String>,
    pub address: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub rooms: Option<u32>,
    pub storey: Option<i32>,
}

impl SearchFilters {
    /// Parses and stores a value for `field`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not parse for the field type.
    pub fn set(&mut self, field: FilterField, raw: &str) -> Result<(), FilterValueError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(FilterValueError::Empty);
        }

        match field {
            FilterField::City => self.city = Some(value.to_owned()),
            FilterField::Address => self.address = Some(value.to_owned()),
            FilterField::PriceMin => self.price_min = Some(parse_price(value)?),
            FilterField::PriceMax => self.price_max = Some(parse_price(value)?),
            FilterField::Rooms => {
                self.rooms = Some(value.parse().map_err(|_| FilterValueError::NotAnInteger)?);
            }
            FilterField::Storey => {
                self.storey = Some(value.parse().map_err(|_| FilterValueError::NotAnInteger)?);
            }
        }
        Ok(())
    }

    /// Clears a single field.
    pub fn clear(&mut self, field: FilterField) {
        match field {
            FilterField::City => self.city = None,
            FilterField::Address => self.address = None,
            FilterField::PriceMin => self.price_min = None,
            FilterField::PriceMax => self.price_max = None,
            FilterField::Rooms => self.rooms = None,
            FilterField::Storey => self.storey = None,
        }
    }

    /// Current value of a field formatted for display.
    #[must_use]
    pub fn display(&self, field: FilterField) -> Option<String> {
        match field {
            FilterField::City => self.city.clone(),
            FilterField::Address => self.address.clone(),
            FilterField::PriceMin => self.price_min.map(|p| p.to_string()),
            FilterField::PriceMax => self.price_max.map(|p| p.to_string()),
            FilterField::Rooms => self.rooms.map(|r| r.to_string()),
            FilterField::Storey => self.storey.map(|s| s.to_string()),
        }
    }

    /// Checks the listing fields against every set constraint.
    ///
    /// Visibility (availability, moderation) is checked by the store.
    #[must_use]
    pub fn matches(&self, listing: &Listing) -> bool {
        if let Some(city) = &self.city
            && !contains_ignore_case(&listing.city, city)
        {
            return false;
        }
        if let Some(address) = &self.address
            && !contains_ignore_case(&listing.address, address)
        {
            return false;
        }
        if self.price_min.is_some_and(|min| listing.price < min) {
            return false;
        }
        if self.price_max.is_some_and(|max| listing.price > max) {
            return false;
        }
        if self.rooms.is_some_and(|rooms| listing.rooms != rooms) {
            return false;
        }
        if self.storey.is_some_and(|storey| listing.storey != storey) {
            return false;
        }
        true
    }
}

fn parse_price(value: &str) -> Result<f64, FilterValueError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .ok_or(FilterValueError::NotANumber)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
