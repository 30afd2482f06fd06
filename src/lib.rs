//! Funnel Bot Library
//!
//! A Telegram bot that walks new users through a short marketing funnel.
//!
//! This crate provides the core functionality for:
//! - Signing time-limited tracking links and verifying webhook bodies
//! - Scheduling and cancelling per-user reminders
//! - Delivering photo messages with fallbacks
//! - Serving the redirect and form completion endpoints
//! - Handling user commands via chat messages

pub mod commands;
pub mod config;
pub mod funnel;
pub mod scheduler;
pub mod server;
pub mod signing;
pub mod telegram;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;
