//! "My listings": paginated owner cards with delete and toggle.

use tracing::{info, warn};

use super::{BotHandler, Outcome};
use crate::commands::CallbackAction;
use crate::conversation::{PAGE_SIZE, Page, Session, UserId};
use crate::geocoding::AddressResolver;
use crate::listings::{ListingId, ListingStore};
use crate::presentation::{Reply, cards};

impl<S, R> BotHandler<S, R>
where
    S: ListingStore,
    R: AddressResolver,
{
    /// Shows the page under the session cursor.
    pub(super) async fn show_listings(&self, user: UserId, session: &mut Session) -> Outcome {
        let page = session.listings_page;
        self.render_listings_page(user, session, page).await
    }

    pub(super) async fn turn_listings_page(&self, user: UserId, session: &mut Session, forward: bool) -> Outcome {
        let current = session.listings_page;
        let requested = if forward {
            current.saturating_add(1)
        } else {
            current.saturating_sub(1)
        };
        self.render_listings_page(user, session, requested).await
    }

    pub(super) async fn delete_listing(&self, user: UserId, session: &mut Session, id: ListingId) -> Outcome {
        if let Err(e) = self.store.delete(id, user).await {
            warn!("User {} failed to delete listing {}: {}", user, id, e);
            return Outcome::alert(format!("⚠️ {e}"));
        }

        info!("User {} deleted listing {}", user, id);
        let page = session.listings_page;
        self.render_listings_page(user, session, page)
            .await
            .with_toast(format!("🗑️ Listing {id} deleted."))
    }

    pub(super) async fn toggle_listing(&self, user: UserId, id: ListingId) -> Outcome {
        match self.store.toggle_availability(id, user).await {
            Ok(listing) => {
                info!(
                    "User {} set listing {} available={}",
                    user, id, listing.is_available
                );
                Outcome::reply(Reply::text(format!(
                    "Listing {id} status changed: {}",
                    listing.status_label()
                )))
            }
            Err(e) => {
                warn!("User {} failed to toggle listing {}: {}", user, id, e);
                Outcome::alert(format!("⚠️ {e}"))
            }
        }
    }

    /// Renders page `requested`, clamped into range, and stores the cursor.
    async fn render_listings_page(&self, user: UserId, session: &mut Session, requested: usize) -> Outcome {
        let listings = match self.store.list_by_owner(user).await {
            Ok(listings) => listings,
            Err(e) => {
                warn!("Failed to load listings of user {}: {}", user, e);
                return Outcome::reply(Reply::text(format!("⚠️ Could not load your listings: {e}")));
            }
        };

        if listings.is_empty() {
            session.listings_page = 0;
            return Outcome::reply(Reply::with_keyboard(
                "You have no listings.",
                cards::landlord_menu(),
            ));
        }

        let page = Page::resolve(requested, listings.len(), PAGE_SIZE);
        session.listings_page = page.index;

        let mut outcome = Outcome::new();
        for listing in page.slice(&listings) {
            outcome.extend(Reply::albums(&listing.photos));
            outcome.push(cards::owner_card(listing));
        }
        if let Some(nav) = cards::page_navigation(
            &page,
            CallbackAction::ListingsPrev,
            CallbackAction::ListingsNext,
        ) {
            outcome.push(nav);
        }
        outcome
    }
}
