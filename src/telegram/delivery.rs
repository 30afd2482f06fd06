//! Best-effort message delivery.
//!
//! A message with a photo is tried with a list of strategies in order until
//! one succeeds:
//!
//! 1. `original` - the photo as configured (file upload or URL)
//! 2. `reencoded` - local photos only, re-encoded to a plain JPEG
//! 3. `text_only` - the caption as a text message
//!
//! Every failed attempt is logged and recorded in the [`DeliveryReport`];
//! nothing is propagated to the caller.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::{DeliveryError, LinkButton, MessagingGateway, PhotoSource, PhotoUpload};
use super::photo::reencode_to_jpeg_blocking;
use crate::types::UserId;

/// One way of getting a message to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStrategy {
    Original,
    Reencoded,
    TextOnly,
}

impl DeliveryStrategy {
    /// Name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Reencoded => "reencoded",
            Self::TextOnly => "text_only",
        }
    }

    /// Returns the strategies to try, in order, for a message with `photo`.
    #[must_use]
    pub fn plan(photo: Option<&PhotoSource>) -> Vec<Self> {
        match photo {
            None => vec![Self::TextOnly],
            Some(PhotoSource::Remote(_)) => vec![Self::Original, Self::TextOnly],
            Some(PhotoSource::Local(path)) if path.is_file() => {
                vec![Self::Original, Self::Reencoded, Self::TextOnly]
            }
            Some(PhotoSource::Local(path)) => {
                warn!(path = %path.display(), "Photo file not found, sending text only");
                vec![Self::TextOnly]
            }
        }
    }
}

/// A message ready for delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Message text, used as the caption when a photo is sent.
    pub text: String,

    pub photo: Option<PhotoSource>,

    pub button: Option<LinkButton>,
}

impl OutboundMessage {
    /// Creates a text-only message.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// What happened while delivering one message.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    /// The strategy that succeeded, if any.
    pub delivered_via: Option<DeliveryStrategy>,

    /// Failed attempts in the order they were made.
    pub failures: Vec<(DeliveryStrategy, String)>,
}

impl DeliveryReport {
    /// Returns true if some strategy succeeded.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        self.delivered_via.is_some()
    }
}

/// Delivers messages through a [`MessagingGateway`] with the fallback chain.
#[derive(Clone)]
pub struct Courier {
    gateway: Arc<dyn MessagingGateway>,
}

impl Courier {
    /// Creates a courier for the given gateway.
    #[must_use]
    pub fn new(gateway: Arc<dyn MessagingGateway>) -> Self {
        Self { gateway }
    }

    /// Delivers `message` to `user_id`, falling back as needed.
    pub async fn deliver(&self, user_id: UserId, message: &OutboundMessage) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for strategy in DeliveryStrategy::plan(message.photo.as_ref()) {
            match self.attempt(strategy, user_id, message).await {
                Ok(()) => {
                    if !report.failures.is_empty() {
                        info!(
                            user_id = %user_id,
                            strategy = strategy.name(),
                            "Delivered after fallback"
                        );
                    }
                    report.delivered_via = Some(strategy);
                    return report;
                }
                Err(e) => {
                    warn!(
                        user_id = %user_id,
                        strategy = strategy.name(),
                        error = %e,
                        "Delivery attempt failed"
                    );
                    report.failures.push((strategy, e.to_string()));
                }
            }
        }

        error!(
            user_id = %user_id,
            attempts = report.failures.len(),
            "All delivery strategies failed"
        );
        report
    }

    async fn attempt(
        &self,
        strategy: DeliveryStrategy,
        user_id: UserId,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        let button = message.button.as_ref();

        match strategy {
            DeliveryStrategy::Original => {
                let upload = match message.photo.as_ref().ok_or(DeliveryError::NoPhoto)? {
                    PhotoSource::Remote(url) => PhotoUpload::Url(url.clone()),
                    PhotoSource::Local(path) => PhotoUpload::File(path.clone()),
                };
                self.gateway
                    .send_photo(user_id, upload, &message.text, button)
                    .await
            }
            DeliveryStrategy::Reencoded => {
                let path = message
                    .photo
                    .as_ref()
                    .and_then(PhotoSource::local_path)
                    .ok_or(DeliveryError::NoPhoto)?;
                let jpeg = reencode_to_jpeg_blocking(path.to_path_buf()).await?;
                self.gateway
                    .send_photo(user_id, PhotoUpload::Jpeg(jpeg), &message.text, button)
                    .await
            }
            DeliveryStrategy::TextOnly => {
                self.gateway.send_text(user_id, &message.text, button).await
            }
        }
    }
}

impl std::fmt::Debug for Courier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Courier").finish_non_exhaustive()
    }
}
