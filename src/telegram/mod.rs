//! Telegram transport.
//!
//! Turns bot updates into [`Incoming`](crate::commands::Incoming) values and
//! renders the resulting replies, keyboards and photo albums.

mod client;
mod dispatch;
mod photo;

pub use client::{TelegramBot, TelegramError};
use dispatch::UserDispatcher;
pub use photo::StoredPhoto;
