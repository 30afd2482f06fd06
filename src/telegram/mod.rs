//! Telegram messaging module.
//!
//! Provides the messaging gateway used by the funnel, the Bot API
//! implementation of it, photo handling and the delivery fallback chain.

mod client;
mod delivery;
mod photo;

pub use client::{DeliveryError, LinkButton, MessagingGateway, PhotoUpload, TelegramGateway};
pub use delivery::{Courier, DeliveryReport, DeliveryStrategy, OutboundMessage};
pub use photo::{JPEG_QUALITY, MAX_DIMENSION, PhotoError, PhotoSource, reencode_to_jpeg};
