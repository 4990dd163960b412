//! Rental listings: records, search filters and persistence.

mod filter;
mod model;
mod store;

pub use filter::{FilterField, FilterValueError, SearchFilters};
pub use model::{
    AddressStatus, Listing, ListingId, MAX_PHOTOS, NewListing, OwnerId, PhotoRef,
};
pub use store::{JsonListingStore, ListingStore, StoreError};
