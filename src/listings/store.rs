//! Listing persistence.
//!
//! [`ListingStore`] is the seam the conversation handler talks to.
//! [`JsonListingStore`] keeps every listing in one JSON document which is
//! rewritten after each mutation. The document is re-read before every
//! operation, so changes made by the moderation tool while the bot is
//! running are picked up and never overwritten.

use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::{
    AddressStatus, Listing, ListingId, MAX_PHOTOS, NewListing, OwnerId, SearchFilters,
};

/// Errors returned by listing stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Listing {0} was not found.")]
    NotFound(ListingId),

    #[error("Listing {0} belongs to another user.")]
    NotOwner(ListingId),

    #[error("Too many photos: {0} (max: {MAX_PHOTOS}).")]
    TooManyPhotos(usize),

    #[error("Failed to access listing store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse listing store: {0}")]
    Json(#[from] serde_json::Error),
}

/// Listing persistence operations.
pub trait ListingStore: Send + Sync {
    /// Stores a new, available listing with a verified address.
    fn create(&self, listing: NewListing)
    -> impl Future<Output = Result<Listing, StoreError>> + Send;

    /// Stores a listing whose address must be checked by a moderator.
    fn submit_for_review(
        &self,
        listing: NewListing,
    ) -> impl Future<Output = Result<Listing, StoreError>> + Send;

    fn get(&self, id: ListingId) -> impl Future<Output = Result<Listing, StoreError>> + Send;

    /// Listings of one owner, ordered by id.
    fn list_by_owner(
        &self,
        owner: OwnerId,
    ) -> impl Future<Output = Result<Vec<Listing>, StoreError>> + Send;

    /// Deletes a listing if `owner` owns it.
    fn delete(
        &self,
        id: ListingId,
        owner: OwnerId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Flips availability if `owner` owns the listing.
    fn toggle_availability(
        &self,
        id: ListingId,
        owner: OwnerId,
    ) -> impl Future<Output = Result<Listing, StoreError>> + Send;

    /// Visible listings matching the filters, ordered by id.
    fn search(
        &self,
        filters: &SearchFilters,
    ) -> impl Future<Output = Result<Vec<Listing>, StoreError>> + Send;

    /// Listings waiting for address moderation.
    fn pending_review(&self) -> impl Future<Output = Result<Vec<Listing>, StoreError>> + Send;

    /// Marks a pending listing's address as verified.
    fn approve(&self, id: ListingId) -> impl Future<Output = Result<Listing, StoreError>> + Send;

    /// Removes a pending listing.
    fn reject(&self, id: ListingId) -> impl Future<Output = Result<Listing, StoreError>> + Send;
}

/// On-disk document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    next_id: u64,
    listings: Vec<Listing>,
}

impl StoreData {
    fn insert(&mut self, new: NewListing, status: AddressStatus) -> Result<Listing, StoreError> {
        if new.photos.len() > MAX_PHOTOS {
            return Err(StoreError::TooManyPhotos(new.photos.len()));
        }

        self.next_id = self.next_id.max(self.max_id()) + 1;
        let listing = Listing {
            id: ListingId(self.next_id),
            owner_id: new.owner_id,
            city: new.city,
            street: new.street,
            address: new.address,
            price: new.price,
            storey: new.storey,
            rooms: new.rooms,
            description: new.description,
            photos: new.photos,
            is_available: true,
            address_status: status,
            created_at: Utc::now(),
        };
        self.listings.push(listing.clone());
        Ok(listing)
    }

    fn max_id(&self) -> u64 {
        self.listings.iter().map(|l| l.id.0).max().unwrap_or(0)
    }

    fn position(&self, id: ListingId) -> Result<usize, StoreError> {
        self.listings
            .iter()
            .position(|l| l.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    fn owned_position(&self, id: ListingId, owner: OwnerId) -> Result<usize, StoreError> {
        let idx = self.position(id)?;
        if self.listings[idx].owner_id != owner {
            return Err(StoreError::NotOwner(id));
        }
        Ok(idx)
    }

    fn pending_position(&self, id: ListingId) -> Result<usize, StoreError> {
        let idx = self.position(id)?;
        if self.listings[idx].address_status != AddressStatus::PendingReview {
            return Err(StoreError::NotFound(id));
        }
        Ok(idx)
    }
}

/// Listing store backed by a JSON file.
#[derive(Debug)]
pub struct JsonListingStore {
    /// `None` keeps everything in memory.
    path: Option<PathBuf>,
    data: Mutex<StoreData>,
}

impl JsonListingStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let data = if let Some(data) = read_document(&path).await? {
            data
        } else {
            info!("Listing store {} not found, starting empty", path.display());
            StoreData::default()
        };

        info!(
            "Loaded {} listings from {}",
            data.listings.len(),
            path.display()
        );

        Ok(Self {
            path: Some(path),
            data: Mutex::new(data),
        })
    }

    /// Creates a store that never touches the disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Mutex::new(StoreData::default()),
        }
    }

    /// Locks the document, first replacing it with the current file contents.
    async fn lock(&self) -> Result<MutexGuard<'_, StoreData>, StoreError> {
        let mut data = self.data.lock().await;
        if let Some(path) = &self.path
            && let Some(current) = read_document(path).await?
        {
            *data = current;
        }
        Ok(data)
    }

    /// Writes the document to a temporary file and renames it into place.
    async fn persist(&self, data: &StoreData) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(data)?;
        let tmp = path.with_extension(format!("json.{}.tmp", std::process::id()));
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!("Persisted {} listings", data.listings.len());
        Ok(())
    }

    async fn insert(&self, new: NewListing, status: AddressStatus) -> Result<Listing, StoreError> {
        let mut data = self.lock().await?;
        let listing = data.insert(new, status)?;
        if let Err(e) = self.persist(&data).await {
            data.listings.pop();
            return Err(e);
        }
        info!(
            "Created listing {} for owner {} ({:?})",
            listing.id, listing.owner_id, status
        );
        Ok(listing)
    }
}

/// Reads the document at `path`, or `None` if there is no file yet.
async fn read_document(path: &Path) -> Result<Option<StoreData>, StoreError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl ListingStore for JsonListingStore {
    async fn create(&self, listing: NewListing) -> Result<Listing, StoreError> {
        self.insert(listing, AddressStatus::Verified).await
    }

    async fn submit_for_review(&self, listing: NewListing) -> Result<Listing, StoreError> {
        self.insert(listing, AddressStatus::PendingReview).await
    }

    async fn get(&self, id: ListingId) -> Result<Listing, StoreError> {
        let data = self.lock().await?;
        let idx = data.position(id)?;
        Ok(data.listings[idx].clone())
    }

    async fn list_by_owner(&self, owner: OwnerId) -> Result<Vec<Listing>, StoreError> {
        let data = self.lock().await?;
        let mut listings: Vec<Listing> = data
            .listings
            .iter()
            .filter(|l| l.owner_id == owner)
            .cloned()
            .collect();
        listings.sort_by_key(|l| l.id);
        Ok(listings)
    }

    async fn delete(&self, id: ListingId, owner: OwnerId) -> Result<(), StoreError> {
        let mut data = self.lock().await?;
        let idx = data.owned_position(id, owner)?;
        let removed = data.listings.remove(idx);

        if let Err(e) = self.persist(&data).await {
            data.listings.insert(idx, removed); // Rollback
            return Err(e);
        }
        info!("Deleted listing {} of owner {}", id, owner);
        Ok(())
    }

    async fn toggle_availability(&self, id: ListingId, owner: OwnerId) -> Result<Listing, StoreError> {
        let mut data = self.lock().await?;
        let idx = data.owned_position(id, owner)?;
        data.listings[idx].is_available = !data.listings[idx].is_available;

        if let Err(e) = self.persist(&data).await {
            data.listings[idx].is_available = !data.listings[idx].is_available; // Rollback
            return Err(e);
        }
        let listing = data.listings[idx].clone();
        info!(
            "Listing {} availability set to {}",
            id, listing.is_available
        );
        Ok(listing)
    }

    async fn search(&self, filters: &SearchFilters) -> Result<Vec<Listing>, StoreError> {
        let data = self.lock().await?;
        let mut listings: Vec<Listing> = data
            .listings
            .iter()
            .filter(|l| l.is_visible() && filters.matches(l))
            .cloned()
            .collect();
        listings.sort_by_key(|l| l.id);
        debug!("Search matched {} listings", listings.len());
        Ok(listings)
    }

    async fn pending_review(&self) -> Result<Vec<Listing>, StoreError> {
        let data = self.lock().await?;
        Ok(data
            .listings
            .iter()
            .filter(|l| l.address_status == AddressStatus::PendingReview)
            .cloned()
            .collect())
    }

    async fn approve(&self, id: ListingId) -> Result<Listing, StoreError> {
        let mut data = self.lock().await?;
        let idx = data.pending_position(id)?;
        data.listings[idx].address_status = AddressStatus::Verified;

        if let Err(e) = self.persist(&data).await {
            data.listings[idx].address_status = AddressStatus::PendingReview; // Rollback
            return Err(e);
        }
        Ok(data.listings[idx].clone())
    }

    async fn reject(&self, id: ListingId) -> Result<Listing, StoreError> {
        let mut data = self.lock().await?;
        let idx = data.pending_position(id)?;
        let removed = data.listings.remove(idx);

        if let Err(e) = self.persist(&data).await {
            data.listings.insert(idx, removed); // Rollback
            return Err(e);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::{FilterField, PhotoRef};

    fn new_listing(owner: OwnerId, city: &str, price: f64) -> NewListing {
        NewListing {
            owner_id: owner,
            city: city.to_owned(),
            street: Some("Lenina".to_owned()),
            address: format!("Lenina, 1, Central, {city}"),
            price,
            storey: 3,
            rooms: 2,
            description: "Bright flat".to_owned(),
            photos: vec![PhotoRef("p1".to_owned())],
        }
    }

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let store = JsonListingStore::in_memory();
        let a = store.create(new_listing(1, "Moscow", 10.0)).await.unwrap();
        let b = store.create(new_listing(1, "Moscow", 20.0)).await.unwrap();
        assert_eq!(a.id, ListingId(1));
        assert_eq!(b.id, ListingId(2));
        assert!(a.is_available);
        assert_eq!(a.address_status, AddressStatus::Verified);
    }

    #[tokio::test]
    async fn test_create_rejects_too_many_photos() {
        let store = JsonListingStore::in_memory();
        let mut listing = new_listing(1, "Moscow", 10.0);
        listing.photos = (0..=MAX_PHOTOS).map(|i| PhotoRef(i.to_string())).collect();
        let err = store.create(listing).await.unwrap_err();
        assert!(matches!(err, StoreError::TooManyPhotos(51)));
        assert!(store.list_by_owner(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_checks_owner() {
        let store = JsonListingStore::in_memory();
        let listing = store.create(new_listing(1, "Moscow", 10.0)).await.unwrap();

        let err = store.delete(listing.id, 2).await.unwrap_err();
        assert!(matches!(err, StoreError::NotOwner(_)));

        store.delete(listing.id, 1).await.unwrap();
        let err = store.delete(listing.id, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_toggle_availability_checks_owner() {
        let store = JsonListingStore::in_memory();
        let listing = store.create(new_listing(1, "Moscow", 10.0)).await.unwrap();

        assert!(matches!(
            store.toggle_availability(listing.id, 9).await,
            Err(StoreError::NotOwner(_))
        ));

        let toggled = store.toggle_availability(listing.id, 1).await.unwrap();
        assert!(!toggled.is_available);
        let toggled = store.toggle_availability(listing.id, 1).await.unwrap();
        assert!(toggled.is_available);
    }

    #[tokio::test]
    async fn test_search_skips_hidden_listings() {
        let store = JsonListingStore::in_memory();
        let visible = store.create(new_listing(1, "Moscow", 10.0)).await.unwrap();
        let taken = store.create(new_listing(1, "Moscow", 20.0)).await.unwrap();
        store.toggle_availability(taken.id, 1).await.unwrap();
        store
            .submit_for_review(new_listing(2, "Moscow", 30.0))
            .await
            .unwrap();
        store.create(new_listing(3, "Kazan", 40.0)).await.unwrap();

        let mut filters = SearchFilters::default();
        filters.set(FilterField::City, "moscow").unwrap();
        let found = store.search(&filters).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, visible.id);
    }

    #[tokio::test]
    async fn test_moderation_approve_and_reject() {
        let store = JsonListingStore::in_memory();
        let a = store
            .submit_for_review(new_listing(1, "Moscow", 10.0))
            .await
            .unwrap();
        let b = store
            .submit_for_review(new_listing(1, "Moscow", 20.0))
            .await
            .unwrap();
        assert_eq!(store.pending_review().await.unwrap().len(), 2);

        let approved = store.approve(a.id).await.unwrap();
        assert_eq!(approved.address_status, AddressStatus::Verified);
        assert!(matches!(store.approve(a.id).await, Err(StoreError::NotFound(_))));

        store.reject(b.id).await.unwrap();
        assert!(store.pending_review().await.unwrap().is_empty());
        assert_eq!(store.search(&SearchFilters::default()).await.unwrap().len(), 1);
    }

    fn temp_store_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "rental_bot_{name}_{}_{}.json",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ))
    }

    #[tokio::test]
    async fn test_persists_and_reloads() {
        let path = temp_store_path("reload");

        let store = JsonListingStore::open(&path).await.unwrap();
        let created = store.create(new_listing(5, "Moscow", 10.0)).await.unwrap();
        drop(store);

        let reopened = JsonListingStore::open(&path).await.unwrap();
        let loaded = reopened.get(created.id).await.unwrap();
        assert_eq!(loaded, created);

        let next = reopened.create(new_listing(5, "Moscow", 11.0)).await.unwrap();
        assert_eq!(next.id, ListingId(2));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_approval_from_another_store_is_kept() {
        let path = temp_store_path("approve");
        let bot = JsonListingStore::open(&path).await.unwrap();
        let moderation = JsonListingStore::open(&path).await.unwrap();

        let pending = bot
            .submit_for_review(new_listing(1, "Moscow", 10.0))
            .await
            .unwrap();
        moderation.approve(pending.id).await.unwrap();

        let found = bot.search(&SearchFilters::default()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, pending.id);

        let other = bot.create(new_listing(2, "Kazan", 20.0)).await.unwrap();
        assert_eq!(other.id, ListingId(2));

        let reopened = JsonListingStore::open(&path).await.unwrap();
        assert!(reopened.pending_review().await.unwrap().is_empty());
        assert_eq!(
            reopened.get(pending.id).await.unwrap().address_status,
            AddressStatus::Verified
        );

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_rejection_from_another_store_is_kept() {
        let path = temp_store_path("reject");
        let bot = JsonListingStore::open(&path).await.unwrap();
        let moderation = JsonListingStore::open(&path).await.unwrap();

        let pending = bot
            .submit_for_review(new_listing(1, "Moscow", 10.0))
            .await
            .unwrap();
        moderation.reject(pending.id).await.unwrap();

        assert!(matches!(
            bot.get(pending.id).await,
            Err(StoreError::NotFound(_))
        ));
        bot.create(new_listing(2, "Kazan", 20.0)).await.unwrap();

        let reopened = JsonListingStore::open(&path).await.unwrap();
        assert!(reopened.pending_review().await.unwrap().is_empty());
        assert!(matches!(
            reopened.get(pending.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(reopened.list_by_owner(1).await.unwrap().len(), 0);

        let _ = std::fs::remove_file(&path);
    }
}
