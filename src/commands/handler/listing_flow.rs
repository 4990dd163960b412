//! Listing creation: basic info → photos → address → confirmation.

use tracing::{info, warn};

use super::{BotHandler, Outcome, STALE_ACTION};
use crate::conversation::{BASIC_INFO_EXAMPLE, BasicInfo, ListingDraft, Session, Step, UserId};
use crate::geocoding::AddressResolver;
use crate::listings::{ListingStore, MAX_PHOTOS, PhotoRef};
use crate::presentation::cards::{self, ADDRESS_PAGE_SIZE};
use crate::presentation::Reply;

const ADDRESS_PROMPT: &str = "Now enter the apartment address. For example:\nMoscow, Red Square, 1";

/// Stores a photo on the draft, refusing it past the limit.
pub(super) fn add_photo(draft: &mut ListingDraft, photo: PhotoRef) -> Outcome {
    if draft.photos.len() >= MAX_PHOTOS {
        return Outcome::reply(Reply::text(format!(
            "You can upload at most {MAX_PHOTOS} photos. Send /done to continue."
        )));
    }

    draft.photos.push(photo);
    Outcome::reply(Reply::text(format!(
        "Photo received (total: {}). Send more or /done.",
        draft.photos.len()
    )))
}

impl<S, R> BotHandler<S, R>
where
    S: ListingStore,
    R: AddressResolver,
{
    pub(super) fn start_listing(session: &mut Session) -> Outcome {
        session.step = Step::BasicInfo;
        Outcome::reply(Reply::text(format!(
            "Enter the listing details: price, floor, rooms, description\n\
             Example: {BASIC_INFO_EXAMPLE}"
        )))
    }

    pub(super) fn on_basic_info(user: UserId, session: &mut Session, text: &str) -> Outcome {
        match BasicInfo::parse(text) {
            Ok(info) => {
                session.step = Step::Photos {
                    draft: ListingDraft::new(user, info),
                };
                Outcome::reply(Reply::text(
                    "Now send at least one photo. When you are finished, send /done.",
                ))
            }
            Err(e) => Outcome::reply(Reply::text(format!("Error: {e}"))),
        }
    }

    pub(super) fn finish_photos(session: &mut Session) -> Outcome {
        match session.take_step() {
            Step::Photos { draft } if draft.photos.is_empty() => {
                session.step = Step::Photos { draft };
                Outcome::reply(Reply::text(
                    "You have not uploaded any photos. Upload at least one.",
                ))
            }
            Step::Photos { draft } => {
                session.step = Step::AddressEntry { draft };
                Outcome::reply(Reply::text(ADDRESS_PROMPT))
            }
            other => {
                session.step = other;
                Outcome::reply(Reply::text("There is nothing to finish right now."))
            }
        }
    }

    /// Looks up typed text as an address.
    ///
    /// Also used in the confirmation step: a new message there is a new
    /// query rather than noise.
    pub(super) async fn on_address_text(&self, session: &mut Session, text: &str) -> Outcome {
        let raw_input = text.trim();
        if raw_input.is_empty() {
            return Outcome::reply(Reply::text(ADDRESS_PROMPT));
        }

        let draft = match session.take_step() {
            Step::AddressEntry { draft } | Step::ConfirmAddress { draft, .. } => draft,
            other => {
                session.step = other;
                return Outcome::reply(Reply::text(STALE_ACTION));
            }
        };

        let (candidates, reply) = match self.resolver.resolve(raw_input).await {
            Ok(candidates) if !candidates.is_empty() => {
                let reply = cards::address_options(&candidates, 0);
                (candidates, reply)
            }
            Ok(_) => (Vec::new(), cards::address_not_found(false)),
            Err(e) => {
                warn!("Address lookup failed: {}", e);
                (Vec::new(), cards::address_not_found(true))
            }
        };

        session.step = Step::ConfirmAddress {
            draft,
            candidates,
            offset: 0,
            raw_input: raw_input.to_owned(),
        };
        Outcome::reply(reply)
    }

    pub(super) fn retry_address(session: &mut Session) -> Outcome {
        match session.take_step() {
            Step::AddressEntry { draft } | Step::ConfirmAddress { draft, .. } => {
                session.step = Step::AddressEntry { draft };
                Outcome::reply(Reply::text("🏠 Please enter the address again:"))
            }
            other => {
                session.step = other;
                Outcome::alert(STALE_ACTION)
            }
        }
    }

    pub(super) fn more_addresses(session: &mut Session) -> Outcome {
        let Step::ConfirmAddress {
            candidates, offset, ..
        } = &mut session.step
        else {
            return Outcome::alert(STALE_ACTION);
        };

        if candidates.is_empty() {
            return Outcome::alert("⚠️ No address options are available.");
        }
        if *offset + ADDRESS_PAGE_SIZE >= candidates.len() {
            return Outcome::alert("⚠️ There are no more options.");
        }

        *offset += ADDRESS_PAGE_SIZE;
        Outcome::reply(cards::address_options(candidates, *offset))
    }

    pub(super) async fn submit_for_moderation(&self, user: UserId, session: &mut Session) -> Outcome {
        let Step::ConfirmAddress {
            draft, raw_input, ..
        } = &session.step
        else {
            return Outcome::alert(STALE_ACTION);
        };

        let listing = draft.clone().with_raw_address(raw_input);
        match self.store.submit_for_review(listing).await {
            Ok(listing) => {
                info!(
                    "User {} sent listing {} for address moderation",
                    user, listing.id
                );
                let reply = Reply::text(format!(
                    "✅ Your address:\n\n{}\n\nhas been sent for moderation. \
                     We will contact you after the review.",
                    listing.address
                ));
                session.reset();
                Outcome::reply(reply)
            }
            Err(e) => {
                warn!("Failed to store listing for moderation: {}", e);
                Outcome::alert(format!("⚠️ Could not save the listing: {e}"))
            }
        }
    }

    pub(super) async fn pick_address(&self, user: UserId, session: &mut Session, index: usize) -> Outcome {
        let Step::ConfirmAddress {
            draft, candidates, ..
        } = &session.step
        else {
            return Outcome::alert(STALE_ACTION);
        };

        let Some(candidate) = candidates.get(index) else {
            return Outcome::alert("⚠️ Invalid option. Please try again.");
        };

        let listing = draft.clone().with_candidate(candidate);
        match self.store.create(listing).await {
            Ok(listing) => {
                info!("User {} created listing {}", user, listing.id);
                let reply = Reply::text(format!(
                    "✅ You chose the address:\n\n\
                     City: {}\nAddress: {}\n\n🎉 Your listing has been created!",
                    listing.city, listing.address
                ));
                session.reset();
                Outcome::reply(reply)
            }
            Err(e) => {
                warn!("Failed to create listing: {}", e);
                Outcome::alert(format!("⚠️ Could not save the listing: {e}"))
            }
        }
    }
}
