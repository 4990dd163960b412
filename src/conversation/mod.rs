//! Conversation state: sessions, form parsing and pagination.

mod basic_info;
mod pagination;
mod session;

pub use basic_info::{BASIC_INFO_EXAMPLE, BasicInfo, BasicInfoError};
pub use pagination::{PAGE_SIZE, Page};
pub use session::{ListingDraft, SearchSession, Session, SessionStore, Step, UserId};
