//! Test doubles shared by unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use teloxide::{ApiError, RequestError};

use crate::telegram::{DeliveryError, LinkButton, MessagingGateway, PhotoUpload};
use crate::types::UserId;

/// A message the gateway accepted.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub user_id: UserId,
    pub text: String,
    pub photo: Option<PhotoUpload>,
    pub button: Option<LinkButton>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureMode {
    Never,
    OriginalPhotos,
    AllPhotos,
    Everything,
}

/// Gateway that records messages instead of sending them.
#[derive(Debug)]
pub struct RecordingGateway {
    sent: Mutex<Vec<SentMessage>>,
    attempts: AtomicUsize,
    failure: FailureMode,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            failure: FailureMode::Never,
        }
    }

    /// Rejects photos sent by URL or file; re-encoded uploads go through.
    pub fn rejecting_original_photos(mut self) -> Self {
        self.failure = FailureMode::OriginalPhotos;
        self
    }

    pub fn rejecting_all_photos(mut self) -> Self {
        self.failure = FailureMode::AllPhotos;
        self
    }

    pub fn rejecting_everything(mut self) -> Self {
        self.failure = FailureMode::Everything;
        self
    }

    /// Messages accepted so far.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Send calls made so far, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn record(
        &self,
        user_id: UserId,
        text: &str,
        photo: Option<PhotoUpload>,
        button: Option<&LinkButton>,
    ) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let rejected = match (self.failure, &photo) {
            (FailureMode::Never, _) => false,
            (FailureMode::Everything, _) => true,
            (FailureMode::AllPhotos, photo) => photo.is_some(),
            (FailureMode::OriginalPhotos, photo) => {
                matches!(photo, Some(PhotoUpload::Url(_) | PhotoUpload::File(_)))
            }
        };
        if rejected {
            return Err(DeliveryError::Api(RequestError::Api(ApiError::Unknown(
                "Bad Request: IMAGE_PROCESS_FAILED".to_owned(),
            ))));
        }

        self.sent.lock().unwrap().push(SentMessage {
            user_id,
            text: text.to_owned(),
            photo,
            button: button.cloned(),
        });
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send_text(
        &self,
        user_id: UserId,
        text: &str,
        button: Option<&LinkButton>,
    ) -> Result<(), DeliveryError> {
        self.record(user_id, text, None, button)
    }

    async fn send_photo(
        &self,
        user_id: UserId,
        photo: PhotoUpload,
        caption: &str,
        button: Option<&LinkButton>,
    ) -> Result<(), DeliveryError> {
        self.record(user_id, caption, Some(photo), button)
    }
}
