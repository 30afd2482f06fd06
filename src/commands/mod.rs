//! Command handling module.
//!
//! Processes chat commands (`/start`, `/site`, `/help`) sent to the bot.

mod handler;
mod types;

pub use handler::CommandHandler;
pub use types::{BotCommand, CommandResult};
