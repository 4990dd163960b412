//! Update handler: routes commands, text, photos and button presses to the
//! conversation flows.

mod listing_flow;
mod my_listings;
mod search;

use tracing::{debug, info};

use super::types::{BotCommand, CallbackAction};
use crate::conversation::{Session, SessionStore, Step, UserId};
use crate::geocoding::AddressResolver;
use crate::listings::{ListingStore, PhotoRef};
use crate::presentation::{Outcome, Reply, cards};

/// Alert for buttons whose flow has already moved on.
const STALE_ACTION: &str = "⚠️ This action is no longer available.";

/// Something a user sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Text(String),
    Photo(PhotoRef),
    /// Callback data of a pressed inline button.
    Callback(String),
}

/// Drives every user's conversation.
///
/// Generic over the listing store and address resolver so flows can be
/// exercised without Telegram or the network.
pub struct BotHandler<S, R> {
    sessions: SessionStore,
    store: S,
    resolver: R,
}

impl<S, R> BotHandler<S, R>
where
    S: ListingStore,
    R: AddressResolver,
{
    /// Creates a new handler.
    #[must_use]
    pub fn new(store: S, resolver: R) -> Self {
        Self {
            sessions: SessionStore::new(),
            store,
            resolver,
        }
    }

    /// Returns the listing store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Number of users with a session.
    pub async fn session_count(&self) -> usize {
        self.sessions.len().await
    }

    /// Handles one update from `user`.
    pub async fn handle(&self, user: UserId, incoming: Incoming) -> Outcome {
        let mut session = self.sessions.acquire(user).await;
        let step_before = session.step.name();

        let outcome = match incoming {
            Incoming::Text(text) => self.on_text(user, &mut session, &text).await,
            Incoming::Photo(photo) => Self::on_photo(&mut session, photo),
            Incoming::Callback(data) => self.on_callback(user, &mut session, &data).await,
        };

        debug!(
            "User {}: {} -> {} ({} replies)",
            user,
            step_before,
            session.step.name(),
            outcome.replies.len()
        );
        self.sessions.release(user, session).await;
        outcome
    }

    async fn on_text(&self, user: UserId, session: &mut Session, text: &str) -> Outcome {
        if let Some(command) = BotCommand::parse(text) {
            debug!("User {} command: {}", user, command);
            return self.on_command(user, session, command).await;
        }

        match &session.step {
            Step::Idle => Outcome::reply(Reply::with_keyboard(
                "Use the menu below or send /help.",
                cards::main_menu(),
            )),
            Step::BasicInfo => Self::on_basic_info(user, session, text),
            Step::Photos { .. } => {
                Outcome::reply(Reply::text("Send a photo, or /done when you are finished."))
            }
            Step::AddressEntry { .. } | Step::ConfirmAddress { .. } => {
                self.on_address_text(session, text).await
            }
            Step::Searching(_) => Self::on_filter_value(session, text),
        }
    }

    async fn on_command(&self, user: UserId, session: &mut Session, command: BotCommand) -> Outcome {
        match command {
            BotCommand::Start => {
                session.reset();
                Outcome::reply(Reply::with_keyboard(
                    "👋 Welcome! Choose an action:",
                    cards::main_menu(),
                ))
            }
            BotCommand::LandlordMenu => Outcome::reply(Reply::with_keyboard(
                "Choose an action:",
                cards::landlord_menu(),
            )),
            BotCommand::Add => Self::start_listing(session),
            BotCommand::Done => Self::finish_photos(session),
            BotCommand::Search => Self::start_search(session),
            BotCommand::MyListings => self.show_listings(user, session).await,
            BotCommand::Back => {
                session.reset();
                Outcome::reply(Reply::with_keyboard("Main menu:", cards::main_menu()))
            }
            BotCommand::Cancel => {
                if session.step != Step::Idle {
                    info!("User {} cancelled {}", user, session.step.name());
                }
                session.reset();
                Outcome::reply(Reply::with_keyboard("❎ Cancelled.", cards::main_menu()))
            }
            BotCommand::Help => Outcome::reply(Reply::text(cards::help_text())),
        }
    }

    async fn on_callback(&self, user: UserId, session: &mut Session, data: &str) -> Outcome {
        let Some(action) = CallbackAction::parse(data) else {
            debug!("User {} sent unknown callback data {:?}", user, data);
            return Outcome::alert("⚠️ Unknown action.");
        };

        match action {
            CallbackAction::AddressRetry => Self::retry_address(session),
            CallbackAction::AddressMore => Self::more_addresses(session),
            CallbackAction::AddressModeration => self.submit_for_moderation(user, session).await,
            CallbackAction::AddressPick(index) => self.pick_address(user, session, index).await,
            CallbackAction::ListingsPrev | CallbackAction::ListingsNext => {
                self.turn_listings_page(user, session, action == CallbackAction::ListingsNext)
                    .await
            }
            CallbackAction::Delete(id) => self.delete_listing(user, session, id).await,
            CallbackAction::Toggle(id) => self.toggle_listing(user, id).await,
            CallbackAction::EditFilter(field) => Self::edit_filter(session, field),
            CallbackAction::ResetFilters => Self::reset_filters(session),
            CallbackAction::ApplyFilters => self.apply_filters(session).await,
            CallbackAction::ResultsPrev | CallbackAction::ResultsNext => {
                self.turn_results_page(session, action == CallbackAction::ResultsNext)
                    .await
            }
        }
    }

    fn on_photo(session: &mut Session, photo: PhotoRef) -> Outcome {
        match &mut session.step {
            Step::Photos { draft } => listing_flow::add_photo(draft, photo),
            _ => Outcome::reply(Reply::text(
                "Photos are only accepted while creating a listing. Use /add to start.",
            )),
        }
    }
}

impl<S, R> std::fmt::Debug for BotHandler<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotHandler").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted collaborators shared by the flow tests.

    use std::sync::Mutex;

    use super::*;
    use crate::geocoding::{AddressCandidate, GeocodingError};
    use crate::listings::JsonListingStore;

    /// Resolver returning canned candidates and recording queries.
    #[derive(Debug, Default)]
    pub struct ScriptedResolver {
        pub candidates: Vec<AddressCandidate>,
        pub queries: Mutex<Vec<String>>,

        /// Answer every lookup with a service error.
        pub unavailable: bool,
    }

    impl ScriptedResolver {
        pub fn with(count: usize) -> Self {
            Self {
                candidates: (1..=count).map(candidate).collect(),
                ..Self::default()
            }
        }

        pub fn unavailable() -> Self {
            Self {
                unavailable: true,
                ..Self::default()
            }
        }
    }

    impl AddressResolver for ScriptedResolver {
        async fn resolve(&self, query: &str) -> Result<Vec<AddressCandidate>, GeocodingError> {
            self.queries.lock().unwrap().push(query.to_owned());
            if self.unavailable {
                return Err(GeocodingError::Status(
                    reqwest::StatusCode::SERVICE_UNAVAILABLE,
                ));
            }
            Ok(self.candidates.clone())
        }
    }

    pub fn candidate(house: usize) -> AddressCandidate {
        AddressCandidate {
            house_number: house.to_string(),
            road: "Tverskaya".to_owned(),
            region: Some("Central".to_owned()),
            city: "Moscow".to_owned(),
            display_name: format!("{house}, Tverskaya, Moscow"),
        }
    }

    pub type TestHandler = BotHandler<JsonListingStore, ScriptedResolver>;

    pub fn handler(candidates: usize) -> TestHandler {
        BotHandler::new(JsonListingStore::in_memory(), ScriptedResolver::with(candidates))
    }

    pub fn handler_without_geocoder() -> TestHandler {
        BotHandler::new(JsonListingStore::in_memory(), ScriptedResolver::unavailable())
    }

    pub async fn text(handler: &TestHandler, user: UserId, text: &str) -> Outcome {
        handler.handle(user, Incoming::Text(text.to_owned())).await
    }

    pub async fn photo(handler: &TestHandler, user: UserId, id: &str) -> Outcome {
        handler.handle(user, Incoming::Photo(PhotoRef(id.to_owned()))).await
    }

    pub async fn press(handler: &TestHandler, user: UserId, action: CallbackAction) -> Outcome {
        handler.handle(user, Incoming::Callback(action.data())).await
    }

    pub fn first_text(outcome: &Outcome) -> &str {
        outcome.texts().next().unwrap_or_default()
    }

    pub fn all_text(outcome: &Outcome) -> String {
        outcome.texts().collect::<Vec<_>>().join("\n")
    }

    pub fn alert_text(outcome: &Outcome) -> Option<&str> {
        outcome
            .notice
            .as_ref()
            .filter(|n| n.alert)
            .map(|n| n.text.as_str())
    }

    pub fn button_data(outcome: &Outcome) -> Vec<String> {
        outcome
            .replies
            .iter()
            .filter_map(Reply::keyboard)
            .flat_map(|k| k.inline_buttons().map(|b| b.data.clone()).collect::<Vec<_>>())
            .collect()
    }

    /// Creates a listing for `user` through the full flow.
    pub async fn create_listing(handler: &TestHandler, user: UserId, price: u32) {
        text(handler, user, "/add").await;
        text(handler, user, &format!("{price}, 2, 1, Listing for {price}")).await;
        photo(handler, user, "photo-1").await;
        text(handler, user, "/done").await;
        text(handler, user, "Moscow, Tverskaya, 1").await;
        press(handler, user, CallbackAction::AddressPick(0)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::commands::labels;
    use crate::presentation::Keyboard;

    #[tokio::test]
    async fn test_start_shows_main_menu_and_resets() {
        let handler = handler(1);
        text(&handler, 1, "/add").await;

        let outcome = text(&handler, 1, "/start").await;
        assert!(first_text(&outcome).contains("Welcome"));
        assert_eq!(
            outcome.replies[0].keyboard(),
            Some(&Keyboard::Menu(vec![vec![
                labels::RENT.to_owned(),
                labels::LANDLORD.to_owned()
            ]]))
        );

        // The creation flow was abandoned, plain text is no longer parsed
        let outcome = text(&handler, 1, "100, 1, 1, Flat").await;
        assert!(first_text(&outcome).contains("/help"));
    }

    #[tokio::test]
    async fn test_landlord_menu() {
        let handler = handler(1);
        let outcome = text(&handler, 1, labels::LANDLORD).await;
        let Some(Keyboard::Menu(rows)) = outcome.replies[0].keyboard() else {
            panic!("expected menu keyboard");
        };
        assert_eq!(rows[0], vec![labels::ADD_LISTING, labels::MY_LISTINGS]);
    }

    #[tokio::test]
    async fn test_cancel_resets_flow() {
        let handler = handler(1);
        text(&handler, 1, "/add").await;
        text(&handler, 1, "100, 1, 1, Flat").await;

        let outcome = text(&handler, 1, "/cancel").await;
        assert!(first_text(&outcome).contains("Cancelled"));

        let outcome = photo(&handler, 1, "p").await;
        assert!(first_text(&outcome).contains("only accepted"));
    }

    #[tokio::test]
    async fn test_unknown_callback_alerts() {
        let handler = handler(1);
        let outcome = handler
            .handle(1, Incoming::Callback("bogus".to_owned()))
            .await;
        assert_eq!(alert_text(&outcome), Some("⚠️ Unknown action."));
        assert!(outcome.replies.is_empty());
    }

    #[tokio::test]
    async fn test_help_lists_commands() {
        let handler = handler(1);
        let outcome = text(&handler, 1, "/help").await;
        assert!(first_text(&outcome).contains("/search_rentals"));
    }

    #[tokio::test]
    async fn test_sessions_are_per_user() {
        let handler = handler(1);
        text(&handler, 1, "/add").await;
        let outcome = text(&handler, 2, "100, 1, 1, Flat").await;
        assert!(first_text(&outcome).contains("/help"));
        assert_eq!(handler.session_count().await, 1);

        text(&handler, 1, "/cancel").await;
        assert_eq!(handler.session_count().await, 0);
    }
}
