//! Presentation: outgoing message model plus the texts and keyboards the
//! bot shows.

pub mod cards;
mod reply;

pub use reply::{ALBUM_CHUNK, InlineButton, Keyboard, Notice, Outcome, Reply, TextReply};
