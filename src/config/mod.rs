//! Configuration module for the funnel bot.
//!
//! Handles loading and validation of the service settings (environment)
//! and of the funnel message script.

mod script;
mod settings;

pub use script::{
    FunnelScript, LINK_PLACEHOLDER, RESERVED_LINK_LENGTH, ScriptError, Step, caption_length,
};
pub use settings::{ConfigError, FunnelSettings, ReminderTiming};

/// Number of configurable photo slots, one per funnel message.
pub const PHOTO_COUNT: usize = 5;

/// Maximum length of a Telegram photo caption.
pub const MAX_CAPTION_LENGTH: usize = 1024;

/// Maximum length of an inline keyboard button label.
pub const MAX_BUTTON_LABEL_LENGTH: usize = 64;
