//! Rental Listing Bot Library
//!
//! A Telegram bot for peer-to-peer apartment rentals.
//!
//! This crate provides the core functionality for:
//! - Guiding landlords through listing creation with address geocoding
//! - Managing a landlord's own listings page by page
//! - Searching available listings with renter filters
//! - Persisting listings and the address moderation queue

pub mod commands;
pub mod config;
pub mod conversation;
pub mod geocoding;
pub mod listings;
pub mod presentation;
pub mod telegram;
