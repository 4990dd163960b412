//! Renter search: filter form editing and paginated results.

use tracing::{debug, warn};

use super::{BotHandler, Outcome};
use crate::commands::CallbackAction;
use crate::conversation::{PAGE_SIZE, Page, SearchSession, Session, Step};
use crate::geocoding::AddressResolver;
use crate::listings::{FilterField, ListingStore};
use crate::presentation::{Reply, cards};

const RESTART_SEARCH: &str = "⚠️ The search has ended. Press \"📌 Rent\" or send /search_rentals to start again.";

/// Value that clears a filter field.
const CLEAR_VALUE: &str = "-";

fn search_mut(session: &mut Session) -> Option<&mut SearchSession> {
    match &mut session.step {
        Step::Searching(search) => Some(search),
        _ => None,
    }
}

impl<S, R> BotHandler<S, R>
where
    S: ListingStore,
    R: AddressResolver,
{
    pub(super) fn start_search(session: &mut Session) -> Outcome {
        let search = SearchSession::default();
        let form = cards::filters_form(&search.filters);
        session.step = Step::Searching(search);
        Outcome::reply(form)
    }

    /// Applies typed text to the field under edit.
    pub(super) fn on_filter_value(session: &mut Session, text: &str) -> Outcome {
        let Some(search) = search_mut(session) else {
            return Outcome::alert(RESTART_SEARCH);
        };

        let Some(field) = search.editing else {
            let mut outcome = Outcome::reply(Reply::text("Tap a filter to change it."));
            outcome.push(cards::filters_form(&search.filters));
            return outcome;
        };

        let value = text.trim();
        let confirmation = if value == CLEAR_VALUE {
            search.filters.clear(field);
            format!("{field} cleared.")
        } else {
            match search.filters.set(field, value) {
                Ok(()) => format!("{field} set to {value}."),
                Err(e) => return Outcome::reply(Reply::text(format!("Error: {e}"))),
            }
        };

        search.editing = None;
        search.page = 0;
        debug!("Filter {} updated: {:?}", field.key(), search.filters.display(field));

        let mut outcome = Outcome::reply(Reply::text(format!("✅ {confirmation}")));
        outcome.push(cards::filters_form(&search.filters));
        outcome
    }

    pub(super) fn edit_filter(session: &mut Session, field: FilterField) -> Outcome {
        let Some(search) = search_mut(session) else {
            return Outcome::alert(RESTART_SEARCH);
        };

        search.editing = Some(field);
        let hint = match field {
            FilterField::City | FilterField::Address => "text",
            FilterField::PriceMin | FilterField::PriceMax => "a number",
            FilterField::Rooms | FilterField::Storey => "a whole number",
        };
        Outcome::reply(Reply::text(format!(
            "Enter a value for \"{field}\" ({hint}), or {CLEAR_VALUE} to clear it:"
        )))
    }

    pub(super) fn reset_filters(session: &mut Session) -> Outcome {
        let Some(search) = search_mut(session) else {
            return Outcome::alert(RESTART_SEARCH);
        };

        *search = SearchSession::default();
        Outcome::reply(cards::filters_form(&search.filters)).with_toast("🔄 Filters reset.")
    }

    pub(super) async fn apply_filters(&self, session: &mut Session) -> Outcome {
        let Some(search) = search_mut(session) else {
            return Outcome::alert(RESTART_SEARCH);
        };

        search.editing = None;
        self.render_results(search, 0).await
    }

    pub(super) async fn turn_results_page(&self, session: &mut Session, forward: bool) -> Outcome {
        let Some(search) = search_mut(session) else {
            return Outcome::alert(RESTART_SEARCH);
        };

        let requested = if forward {
            search.page.saturating_add(1)
        } else {
            search.page.saturating_sub(1)
        };
        self.render_results(search, requested).await
    }

    /// Queries the store and renders page `requested` of the results.
    ///
    /// Results are re-queried on every page turn, so the page is clamped
    /// against the current match count.
    async fn render_results(&self, search: &mut SearchSession, requested: usize) -> Outcome {
        let results = match self.store.search(&search.filters).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Search failed: {}", e);
                return Outcome::reply(Reply::text(format!("⚠️ Search failed: {e}")));
            }
        };

        if results.is_empty() {
            search.page = 0;
            return Outcome::reply(Reply::text(
                "🔍 Nothing found. Change the filters and try again.",
            ));
        }

        let page = Page::resolve(requested, results.len(), PAGE_SIZE);
        search.page = page.index;

        let mut outcome = Outcome::reply(Reply::text(format!(
            "🔍 Listings found: {}",
            results.len()
        )));
        for listing in page.slice(&results) {
            outcome.extend(Reply::albums(&listing.photos));
            outcome.push(cards::renter_card(listing));
        }
        if let Some(nav) = cards::page_navigation(
            &page,
            CallbackAction::ResultsPrev,
            CallbackAction::ResultsNext,
        ) {
            outcome.push(nav);
        }
        outcome
    }
}
