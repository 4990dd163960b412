//! Command and button definitions.

use std::fmt;

use crate::listings::{FilterField, ListingId};

/// Labels of the reply-keyboard menu buttons.
pub mod labels {
    pub const RENT: &str = "📌 Rent";
    pub const LANDLORD: &str = "🏠 Landlord";
    pub const ADD_LISTING: &str = "➕ Add listing";
    pub const MY_LISTINGS: &str = "📃 My listings";
    pub const BACK: &str = "⬅️ Back";
}

/// Text commands and menu buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// Show the main menu and reset the session.
    Start,

    /// Show the landlord menu.
    LandlordMenu,

    /// Start creating a listing.
    Add,

    /// Finish photo upload.
    Done,

    /// Start a renter search.
    Search,

    /// Show the caller's listings.
    MyListings,

    /// Return to the main menu.
    Back,

    /// Abort the current flow.
    Cancel,

    /// Show help information.
    Help,
}

impl BotCommand {
    /// Parses a slash command or a menu button label.
    ///
    /// Returns `None` for ordinary text.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();

        match text {
            labels::RENT => return Some(Self::Search),
            labels::LANDLORD => return Some(Self::LandlordMenu),
            labels::ADD_LISTING => return Some(Self::Add),
            labels::MY_LISTINGS => return Some(Self::MyListings),
            labels::BACK => return Some(Self::Back),
            _ => {}
        }

        let command = text.strip_prefix('/')?;
        // Only the first word counts; drop the `@botname` suffix used in groups
        let command = command.split_whitespace().next()?;
        let command = command.split_once('@').map_or(command, |(cmd, _)| cmd);

        match command.to_lowercase().as_str() {
            "start" | "menu" => Some(Self::Start),
            "add" | "new" => Some(Self::Add),
            "done" => Some(Self::Done),
            "search_rentals" | "search" => Some(Self::Search),
            "my_listings" | "listings" => Some(Self::MyListings),
            "cancel" | "reset" => Some(Self::Cancel),
            "help" => Some(Self::Help),
            _ => None,
        }
    }

    /// Returns the command name as it appears in help.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::LandlordMenu => "landlord",
            Self::Add => "add",
            Self::Done => "done",
            Self::Search => "search_rentals",
            Self::MyListings => "my_listings",
            Self::Back => "back",
            Self::Cancel => "cancel",
            Self::Help => "help",
        }
    }

    /// Returns all slash commands with their descriptions.
    #[must_use]
    pub fn all_commands() -> Vec<(&'static str, &'static str)> {
        vec![
            ("/start", "Show the main menu"),
            ("/add", "Create a new listing"),
            ("/done", "Finish uploading photos"),
            ("/my_listings", "Manage your listings"),
            ("/search_rentals", "Search for an apartment"),
            ("/cancel", "Abort the current action"),
            ("/help", "Show this help message"),
        ]
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Inline button payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Enter the address again.
    AddressRetry,

    /// Show the next page of address candidates.
    AddressMore,

    /// Send the typed address to a moderator.
    AddressModeration,

    /// Pick the candidate at this index.
    AddressPick(usize),

    ListingsPrev,
    ListingsNext,

    /// Delete one of the caller's listings.
    Delete(ListingId),

    /// Flip availability of one of the caller's listings.
    Toggle(ListingId),

    /// Ask for a new value of a search filter.
    EditFilter(FilterField),

    ResetFilters,
    ApplyFilters,
    ResultsPrev,
    ResultsNext,
}

impl CallbackAction {
    /// Parses callback data. Returns `None` for unknown or malformed data.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "addr_retry" => return Some(Self::AddressRetry),
            "addr_more" => return Some(Self::AddressMore),
            "addr_mod" | "addr_mod_custom" => return Some(Self::AddressModeration),
            "pubs_prev" => return Some(Self::ListingsPrev),
            "pubs_next" => return Some(Self::ListingsNext),
            "reset_filters" => return Some(Self::ResetFilters),
            "apply_filters" => return Some(Self::ApplyFilters),
            "custom_prev" => return Some(Self::ResultsPrev),
            "custom_next" => return Some(Self::ResultsNext),
            _ => {}
        }

        if let Some(key) = data.strip_prefix("edit_") {
            return FilterField::from_key(key).map(Self::EditFilter);
        }

        let (kind, arg) = data.split_once('|')?;
        match kind {
            "addr" => arg.parse().ok().map(Self::AddressPick),
            "delete" => arg.parse().ok().map(Self::Delete),
            "toggle" => arg.parse().ok().map(Self::Toggle),
            _ => None,
        }
    }

    /// Callback data for this action.
    #[must_use]
    pub fn data(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressRetry => write!(f, "addr_retry"),
            Self::AddressMore => write!(f, "addr_more"),
            Self::AddressModeration => write!(f, "addr_mod"),
            Self::AddressPick(index) => write!(f, "addr|{index}"),
            Self::ListingsPrev => write!(f, "pubs_prev"),
            Self::ListingsNext => write!(f, "pubs_next"),
            Self::Delete(id) => write!(f, "delete|{id}"),
            Self::Toggle(id) => write!(f, "toggle|{id}"),
            Self::EditFilter(field) => write!(f, "edit_{}", field.key()),
            Self::ResetFilters => write!(f, "reset_filters"),
            Self::ApplyFilters => write!(f, "apply_filters"),
            Self::ResultsPrev => write!(f, "custom_prev"),
            Self::ResultsNext => write!(f, "custom_next"),
        }
    }
}
