//! Message texts and keyboards.

use super::{InlineButton, Keyboard, Reply};
use crate::commands::{BotCommand, CallbackAction, labels};
use crate::conversation::Page;
use crate::geocoding::AddressCandidate;
use crate::listings::{FilterField, Listing, SearchFilters};

/// Address candidates shown per page.
pub const ADDRESS_PAGE_SIZE: usize = 5;

const NOT_SET: &str = "Not set";

/// Main menu keyboard.
#[must_use]
pub fn main_menu() -> Keyboard {
    Keyboard::Menu(vec![vec![labels::RENT.to_owned(), labels::LANDLORD.to_owned()]])
}

/// Landlord menu keyboard.
#[must_use]
pub fn landlord_menu() -> Keyboard {
    Keyboard::Menu(vec![
        vec![labels::ADD_LISTING.to_owned(), labels::MY_LISTINGS.to_owned()],
        vec![labels::BACK.to_owned()],
    ])
}

/// Help text listing the slash commands.
#[must_use]
pub fn help_text() -> String {
    let mut lines = vec!["Available commands:".to_owned(), String::new()];
    for (cmd, desc) in BotCommand::all_commands() {
        lines.push(format!("  {cmd} - {desc}"));
    }
    lines.join("\n")
}

/// Formats a price without a trailing `.0` for whole amounts.
#[must_use]
pub fn format_price(price: f64) -> String {
    if price.fract() == 0.0 && price.abs() < 1e15 {
        format!("{price:.0}")
    } else {
        format!("{price:.2}")
    }
}

/// Escapes text for Telegram HTML messages.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Card shown to the owner, with manage buttons.
#[must_use]
pub fn owner_card(listing: &Listing) -> Reply {
    let text = format!(
        "📢 Listing ID: {}\n\
         🏠 City: {}\n\
         🛣️ Street: {}\n\
         📍 Address: {}\n\
         🏢 Floor: {}\n\
         🛏️ Rooms: {}\n\
         💰 Price: {} RUB\n\
         📅 Status: {}\n\
         📝 Description: {}",
        listing.id,
        listing.city,
        listing.street.as_deref().unwrap_or(NOT_SET),
        listing.address,
        listing.storey,
        listing.rooms,
        format_price(listing.price),
        listing.status_label(),
        listing.description,
    );

    let keyboard = Keyboard::Inline(vec![vec![
        InlineButton::new("❌ Delete", CallbackAction::Delete(listing.id).data()),
        InlineButton::new("🔄 Toggle status", CallbackAction::Toggle(listing.id).data()),
    ]]);

    Reply::with_keyboard(text, keyboard)
}

/// Card shown to renters, with a contact link to the owner.
#[must_use]
pub fn renter_card(listing: &Listing) -> Reply {
    Reply::html(format!(
        "📢 <b>Listing ID:</b> {}\n\
         🏠 <b>City:</b> {}\n\
         🛣️ <b>Street:</b> {}\n\
         📍 <b>Address:</b> {}\n\
         🏢 <b>Floor:</b> {}\n\
         🛏️ <b>Rooms:</b> {}\n\
         💰 <b>Price:</b> {} RUB\n\
         📝 <b>Description:</b> {}\n\
         👤 <b>Owner:</b> <a href=\"tg://user?id={}\">Contact</a>",
        listing.id,
        escape_html(&listing.city),
        escape_html(listing.street.as_deref().unwrap_or(NOT_SET)),
        escape_html(&listing.address),
        listing.storey,
        listing.rooms,
        format_price(listing.price),
        escape_html(&listing.description),
        listing.owner_id,
    ))
}

/// Pager under a list; `None` when everything fits on one page.
#[must_use]
pub fn page_navigation(page: &Page, prev: CallbackAction, next: CallbackAction) -> Option<Reply> {
    let mut buttons = Vec::new();
    if page.has_prev() {
        buttons.push(InlineButton::new("⬅️ Back", prev.data()));
    }
    if page.has_next() {
        buttons.push(InlineButton::new("➡️ Next", next.data()));
    }
    if buttons.is_empty() {
        return None;
    }
    Some(Reply::with_keyboard(page.label(), Keyboard::inline_column(buttons)))
}

/// Page of address candidates starting at `offset`.
///
/// Options are numbered across pages so the numbers stay stable when the
/// user asks for more.
#[must_use]
pub fn address_options(candidates: &[AddressCandidate], offset: usize) -> Reply {
    let end = (offset + ADDRESS_PAGE_SIZE).min(candidates.len());
    let start = offset.min(end);

    let mut text = String::from("🏠 Addresses found:\n\n");
    let mut buttons = Vec::new();

    for (index, candidate) in candidates[start..end].iter().enumerate().map(|(i, c)| (start + i, c)) {
        let number = index + 1;
        text.push_str(&format!(
            "Option {number}:\n\
             📌 House: {}\n\
             📍 Street: {}\n\
             📍 Region: {}\n\
             🌆 City: {}\n\n",
            candidate.house_number,
            candidate.road,
            candidate.region_label(),
            candidate.city,
        ));
        buttons.push(InlineButton::new(
            format!("Option {number}"),
            CallbackAction::AddressPick(index).data(),
        ));
    }

    if candidates.len() > end {
        buttons.push(InlineButton::new(
            "➡️ More options",
            CallbackAction::AddressMore.data(),
        ));
    }
    buttons.push(InlineButton::new("🔄 Try again", CallbackAction::AddressRetry.data()));
    buttons.push(InlineButton::new(
        "⚠️ Send to moderator",
        CallbackAction::AddressModeration.data(),
    ));

    Reply::with_keyboard(text.trim_end().to_owned(), Keyboard::inline_column(buttons))
}

/// Shown when the geocoder found nothing usable.
#[must_use]
pub fn address_not_found(lookup_failed: bool) -> Reply {
    let headline = if lookup_failed {
        "❌ The address service is unavailable right now."
    } else {
        "❌ Could not find an exact address."
    };
    let text = format!(
        "{headline}\n\n\
         You can refine the address and try again, or send the address \
         as you typed it to a moderator."
    );
    Reply::with_keyboard(
        text,
        Keyboard::inline_column(vec![
            InlineButton::new("🔄 Try again", CallbackAction::AddressRetry.data()),
            InlineButton::new(
                "✅ Send address to moderator",
                CallbackAction::AddressModeration.data(),
            ),
        ]),
    )
}

/// Search form with one button per filter.
#[must_use]
pub fn filters_form(filters: &SearchFilters) -> Reply {
    let mut rows: Vec<Vec<InlineButton>> = FilterField::ALL
        .into_iter()
        .map(|field| {
            let value = filters.display(field).unwrap_or_else(|| NOT_SET.to_owned());
            vec![InlineButton::new(
                format!("{}: {value}", field.label()),
                CallbackAction::EditFilter(field).data(),
            )]
        })
        .collect();

    rows.push(vec![
        InlineButton::new("🔄 Reset filters", CallbackAction::ResetFilters.data()),
        InlineButton::new("✅ Apply filters", CallbackAction::ApplyFilters.data()),
    ]);

    Reply::with_keyboard(
        "Fill in the search filters (tap to change):",
        Keyboard::Inline(rows),
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::listings::{AddressStatus, ListingId};

    fn candidate(n: usize) -> AddressCandidate {
        AddressCandidate {
            house_number: n.to_string(),
            road: "Main".to_owned(),
            region: None,
            city: "Town".to_owned(),
            display_name: String::new(),
        }
    }

    fn button_data(reply: &Reply) -> Vec<String> {
        reply
            .keyboard()
            .map(|k| k.inline_buttons().map(|b| b.data.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(50000.0), "50000");
        assert_eq!(format_price(1500.5), "1500.50");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>A & B</b>"), "&lt;b&gt;A &amp; B&lt;/b&gt;");
    }

    #[test]
    fn test_address_options_first_page() {
        let candidates: Vec<_> = (0..7).map(candidate).collect();
        let reply = address_options(&candidates, 0);
        assert_eq!(
            button_data(&reply),
            vec!["addr|0", "addr|1", "addr|2", "addr|3", "addr|4", "addr_more", "addr_retry", "addr_mod"]
        );
        assert!(reply.as_text().unwrap().contains("Option 5:"));
    }

    #[test]
    fn test_address_options_second_page_numbering() {
        let candidates: Vec<_> = (0..7).map(candidate).collect();
        let reply = address_options(&candidates, 5);
        assert_eq!(button_data(&reply), vec!["addr|5", "addr|6", "addr_retry", "addr_mod"]);
        let text = reply.as_text().unwrap();
        assert!(text.contains("Option 6:"));
        assert!(text.contains("Region: Not specified"));
    }

    #[test]
    fn test_filters_form_shows_values() {
        let mut filters = SearchFilters::default();
        filters.set(FilterField::City, "Moscow").unwrap();
        let reply = filters_form(&filters);
        let texts: Vec<String> = reply
            .keyboard()
            .unwrap()
            .inline_buttons()
            .map(|b| b.text.clone())
            .collect();
        assert_eq!(texts[0], "City: Moscow");
        assert_eq!(texts[1], "Address: Not set");
        assert_eq!(texts.len(), 8);
    }

    #[test]
    fn test_renter_card_escapes_and_links_owner() {
        let listing = Listing {
            id: ListingId(3),
            owner_id: 42,
            city: "Moscow".to_owned(),
            street: None,
            address: "A <b> street".to_owned(),
            price: 100.0,
            storey: 1,
            rooms: 1,
            description: "x & y".to_owned(),
            photos: vec![],
            is_available: true,
            address_status: AddressStatus::Verified,
            created_at: Utc::now(),
        };
        let reply = renter_card(&listing);
        let text = reply.as_text().unwrap();
        assert!(text.contains("tg://user?id=42"));
        assert!(text.contains("A &lt;b&gt; street"));
        assert!(text.contains("x &amp; y"));
        assert!(matches!(reply, Reply::Text(ref t) if t.html));
    }

    #[test]
    fn test_page_navigation() {
        let single = Page::resolve(0, 3, 5);
        assert!(page_navigation(&single, CallbackAction::ListingsPrev, CallbackAction::ListingsNext).is_none());

        let middle = Page::resolve(1, 15, 5);
        let nav = page_navigation(&middle, CallbackAction::ListingsPrev, CallbackAction::ListingsNext).unwrap();
        assert_eq!(button_data(&nav), vec!["pubs_prev", "pubs_next"]);
        assert_eq!(nav.as_text(), Some("Page 2 of 3"));
    }
}
