//! Messaging gateway abstraction and its Telegram Bot API implementation.

use std::path::PathBuf;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use teloxide::RequestError;
use teloxide::payloads::{SendMessageSetters, SendPhotoSetters};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile};
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::PhotoError;
use crate::types::UserId;

/// File name given to in-memory JPEG uploads.
const REENCODED_FILE_NAME: &str = "photo.jpg";

/// Errors that can occur while delivering a message.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Telegram API error: {0}")]
    Api(#[from] RequestError),

    #[error("Photo preparation failed: {0}")]
    Photo(#[from] PhotoError),

    #[error("No photo to send with this strategy")]
    NoPhoto,
}

/// An inline button opening a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkButton {
    pub label: String,
    pub url: Url,
}

/// A photo in the form the gateway uploads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoUpload {
    /// Telegram downloads the photo itself.
    Url(Url),
    /// Uploaded from disk as is.
    File(PathBuf),
    /// Re-encoded JPEG bytes.
    Jpeg(Vec<u8>),
}

/// Sends messages to users.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Sends a text message.
    async fn send_text(
        &self,
        user_id: UserId,
        text: &str,
        button: Option<&LinkButton>,
    ) -> Result<(), DeliveryError>;

    /// Sends a photo with `caption`.
    async fn send_photo(
        &self,
        user_id: UserId,
        photo: PhotoUpload,
        caption: &str,
        button: Option<&LinkButton>,
    ) -> Result<(), DeliveryError>;
}

/// [`MessagingGateway`] backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    /// Creates a gateway for the bot with the given token.
    #[must_use]
    pub fn new(token: &SecretString) -> Self {
        Self::from_bot(Bot::new(token.expose_secret()))
    }

    /// Wraps an existing bot client.
    #[must_use]
    pub const fn from_bot(bot: Bot) -> Self {
        Self { bot }
    }

    /// Returns the underlying bot client.
    #[must_use]
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send_text(
        &self,
        user_id: UserId,
        text: &str,
        button: Option<&LinkButton>,
    ) -> Result<(), DeliveryError> {
        let mut request = self.bot.send_message(ChatId(user_id.get()), text);
        if let Some(button) = button {
            request = request.reply_markup(keyboard(button));
        }

        request.await?;
        debug!(user_id = %user_id, "Sent text message");
        Ok(())
    }

    async fn send_photo(
        &self,
        user_id: UserId,
        photo: PhotoUpload,
        caption: &str,
        button: Option<&LinkButton>,
    ) -> Result<(), DeliveryError> {
        let input = match photo {
            PhotoUpload::Url(url) => InputFile::url(url),
            PhotoUpload::File(path) => InputFile::file(path),
            PhotoUpload::Jpeg(bytes) => InputFile::memory(bytes).file_name(REENCODED_FILE_NAME),
        };

        let mut request = self
            .bot
            .send_photo(ChatId(user_id.get()), input)
            .caption(caption);
        if let Some(button) = button {
            request = request.reply_markup(keyboard(button));
        }

        request.await?;
        debug!(user_id = %user_id, "Sent photo message");
        Ok(())
    }
}

impl std::fmt::Debug for TelegramGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramGateway").finish_non_exhaustive()
    }
}

/// Builds a one-button inline keyboard.
fn keyboard(button: &LinkButton) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url(
        button.label.clone(),
        button.url.clone(),
    )]])
}
