//! Per-user conversation state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use super::BasicInfo;
use crate::geocoding::AddressCandidate;
use crate::listings::{FilterField, NewListing, OwnerId, PhotoRef, SearchFilters};

/// Telegram user id.
pub type UserId = i64;

/// Listing data collected before the address is known.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDraft {
    pub owner_id: OwnerId,
    pub price: f64,
    pub storey: i32,
    pub rooms: u32,
    pub description: String,
    pub photos: Vec<PhotoRef>,
}

impl ListingDraft {
    #[must_use]
    pub fn new(owner_id: OwnerId, info: BasicInfo) -> Self {
        Self {
            owner_id,
            price: info.price,
            storey: info.storey,
            rooms: info.rooms,
            description: info.description,
            photos: Vec::new(),
        }
    }

    /// Completes the draft with a geocoded address.
    #[must_use]
    pub fn with_candidate(self, candidate: &AddressCandidate) -> NewListing {
        self.into_listing(
            candidate.city.clone(),
            Some(candidate.road.clone()),
            candidate.full_address(),
        )
    }

    /// Completes the draft with the address exactly as typed.
    ///
    /// City and street are guessed from the leading comma-separated parts
    /// (`City, Street, House`); a moderator corrects them if needed.
    #[must_use]
    pub fn with_raw_address(self, raw: &str) -> NewListing {
        let mut parts = raw.split(',').map(str::trim).filter(|p| !p.is_empty());
        let city = parts.next().unwrap_or(raw).to_owned();
        let street = parts.next().map(str::to_owned);
        self.into_listing(city, street, raw.trim().to_owned())
    }

    fn into_listing(self, city: String, street: Option<String>, address: String) -> NewListing {
        NewListing {
            owner_id: self.owner_id,
            city,
            street,
            address,
            price: self.price,
            storey: self.storey,
            rooms: self.rooms,
            description: self.description,
            photos: self.photos,
        }
    }
}

/// Renter search state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSession {
    pub filters: SearchFilters,
    pub page: usize,
    /// Field whose new value the next text message provides.
    pub editing: Option<FilterField>,
}

/// Where the user is in the conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Step {
    #[default]
    Idle,

    /// Waiting for `price, floor, rooms, description`.
    BasicInfo,

    /// Collecting photos until `/done`.
    Photos { draft: ListingDraft },

    /// Waiting for a free-text address.
    AddressEntry { draft: ListingDraft },

    /// Waiting for the user to pick a candidate, retry or ask a moderator.
    ConfirmAddress {
        draft: ListingDraft,
        candidates: Vec<AddressCandidate>,
        /// Index of the first candidate on the current page.
        offset: usize,
        /// Address as the user typed it.
        raw_input: String,
    },

    /// Editing filters or browsing results.
    Searching(SearchSession),
}

impl Step {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::BasicInfo => "basic_info",
            Self::Photos { .. } => "photos",
            Self::AddressEntry { .. } => "address_entry",
            Self::ConfirmAddress { .. } => "confirm_address",
            Self::Searching(_) => "searching",
        }
    }
}

/// Conversation state of one user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub step: Step,

    /// Page cursor for "my listings".
    pub listings_page: usize,
}

impl Session {
    /// Returns to the idle state and rewinds cursors.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Takes the current step out, leaving `Idle` behind.
    pub fn take_step(&mut self) -> Step {
        std::mem::take(&mut self.step)
    }
}

/// In-memory session storage.
///
/// Each session sits behind its own lock, so updates from one user never
/// interleave while different users proceed in parallel. Sessions back in
/// their default state are dropped on release.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<UserId, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the session of `user`, creating it on first contact.
    pub async fn acquire(&self, user: UserId) -> OwnedMutexGuard<Session> {
        let session = {
            let mut sessions = self.sessions.lock().await;
            Arc::clone(sessions.entry(user).or_default())
        };
        session.lock_owned().await
    }

    /// Unlocks a session, forgetting it if it is back to its default state.
    ///
    /// The entry is kept while another update of the same user still holds
    /// a handle to it.
    pub async fn release(&self, user: UserId, session: OwnedMutexGuard<Session>) {
        let mut sessions = self.sessions.lock().await;
        if *session == Session::default()
            && Arc::strong_count(OwnedMutexGuard::mutex(&session)) == 2
        {
            sessions.remove(&user);
        }
        drop(session);
    }

    /// Number of users with a stored session.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ListingDraft {
        ListingDraft::new(
            1,
            BasicInfo {
                price: 100.0,
                storey: 2,
                rooms: 1,
                description: "Nice".to_owned(),
            },
        )
    }

    #[test]
    fn test_raw_address_guesses_city_and_street() {
        let listing = draft().with_raw_address(" Moscow, Red Square, 1 ");
        assert_eq!(listing.city, "Moscow");
        assert_eq!(listing.street.as_deref(), Some("Red Square"));
        assert_eq!(listing.address, "Moscow, Red Square, 1");

        let listing = draft().with_raw_address("Somewhere");
        assert_eq!(listing.city, "Somewhere");
        assert_eq!(listing.street, None);
    }

    #[test]
    fn test_candidate_address() {
        let candidate = AddressCandidate {
            house_number: "5".to_owned(),
            road: "Arbat".to_owned(),
            region: Some("Central".to_owned()),
            city: "Moscow".to_owned(),
            display_name: String::new(),
        };
        let listing = draft().with_candidate(&candidate);
        assert_eq!(listing.city, "Moscow");
        assert_eq!(listing.street.as_deref(), Some("Arbat"));
        assert_eq!(listing.address, "Arbat, 5, Central, Moscow");
    }

    #[test]
    fn test_reset_and_take_step() {
        let mut session = Session {
            step: Step::BasicInfo,
            listings_page: 3,
        };
        assert_eq!(session.take_step(), Step::BasicInfo);
        assert_eq!(session.step, Step::Idle);

        session.step = Step::Searching(SearchSession::default());
        session.reset();
        assert_eq!(session, Session::default());
    }

    #[tokio::test]
    async fn test_store_keeps_state_per_user() {
        let store = SessionStore::new();
        {
            let mut session = store.acquire(1).await;
            session.step = Step::BasicInfo;
        }
        assert_eq!(store.acquire(1).await.step, Step::BasicInfo);
        assert_eq!(store.acquire(2).await.step, Step::Idle);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_release_forgets_idle_sessions() {
        let store = SessionStore::new();

        let session = store.acquire(1).await;
        store.release(1, session).await;
        assert!(store.is_empty().await);

        let mut session = store.acquire(2).await;
        session.step = Step::BasicInfo;
        store.release(2, session).await;
        assert_eq!(store.len().await, 1);

        let mut session = store.acquire(2).await;
        assert_eq!(session.step, Step::BasicInfo);
        session.reset();
        store.release(2, session).await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_release_keeps_session_with_waiting_update() {
        let store = Arc::new(SessionStore::new());
        let session = store.acquire(1).await;

        let waiting = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let mut session = store.acquire(1).await;
                session.step = Step::BasicInfo;
                store.release(1, session).await;
            })
        };
        while Arc::strong_count(OwnedMutexGuard::mutex(&session)) < 3 {
            tokio::task::yield_now().await;
        }

        store.release(1, session).await;
        waiting.await.unwrap();
        assert_eq!(store.acquire(1).await.step, Step::BasicInfo);
    }
}
