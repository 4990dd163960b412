//! Command handling module.
//!
//! Parses menu labels, slash commands and button payloads, and routes them
//! into the conversation flows.

mod handler;
mod types;

pub use handler::{BotHandler, Incoming};
#[cfg(test)]
pub(crate) use handler::testing;
pub use types::{BotCommand, CallbackAction, labels};
