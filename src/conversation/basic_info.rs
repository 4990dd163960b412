//! Parsing of the first listing form: `price, floor, rooms, description`.

use thiserror::Error;

/// Example shown in the prompt.
pub const BASIC_INFO_EXAMPLE: &str = "50000, 1, 2, Cozy apartment, 77.2 m²";

/// Errors for malformed basic info.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BasicInfoError {
    #[error("Expected 4 values: price, floor, rooms, description.")]
    WrongPartCount,

    #[error("Price must be a positive number.")]
    InvalidPrice,

    #[error("Floor must be a whole number.")]
    InvalidStorey,

    #[error("Rooms must be a whole number greater than zero.")]
    InvalidRooms,

    #[error("Description must not be empty.")]
    EmptyDescription,
}

/// Validated basic listing data.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicInfo {
    pub price: f64,
    pub storey: i32,
    pub rooms: u32,
    pub description: String,
}

impl BasicInfo {
    /// Parses `price, floor, rooms, description`.
    ///
    /// Only the first three commas separate fields, so the description may
    /// contain commas of its own.
    ///
    /// # Errors
    ///
    /// Returns the first field that fails validation.
    pub fn parse(text: &str) -> Result<Self, BasicInfoError> {
        let parts: Vec<&str> = text.splitn(4, ',').map(str::trim).collect();
        let [price, storey, rooms, description] = parts.as_slice() else {
            return Err(BasicInfoError::WrongPartCount);
        };

        let price = price
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or(BasicInfoError::InvalidPrice)?;

        let storey = storey.parse::<i32>().map_err(|_| BasicInfoError::InvalidStorey)?;

        let rooms = rooms
            .parse::<u32>()
            .ok()
            .filter(|&r| r > 0)
            .ok_or(BasicInfoError::InvalidRooms)?;

        if description.is_empty() {
            return Err(BasicInfoError::EmptyDescription);
        }

        Ok(Self {
            price,
            storey,
            rooms,
            description: (*description).to_owned(),
        })
    }
}
