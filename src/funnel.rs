//! Funnel context shared by the chat handlers, the HTTP gateway and the timers.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::{FunnelScript, FunnelSettings, PHOTO_COUNT, ReminderTiming, Step};
use crate::scheduler::{ConversionTracker, ReminderPayload, ReminderScheduler, ReminderSlot};
use crate::signing::{LinkSigner, TrackingLinks};
use crate::telegram::{
    Courier, DeliveryReport, LinkButton, MessagingGateway, OutboundMessage, PhotoSource,
};
use crate::types::UserId;

/// What a verified completion changed.
#[derive(Debug)]
pub struct CompletionOutcome {
    /// False if the user was already marked as converted.
    pub newly_submitted: bool,

    /// Reminders that were still pending.
    pub cancelled: usize,

    pub confirmation: DeliveryReport,
}

/// Everything one funnel needs: script, photos, links, tracker, scheduler.
pub struct Funnel {
    script: FunnelScript,
    photos: [Option<PhotoSource>; PHOTO_COUNT],
    links: TrackingLinks,
    tracker: ConversionTracker,
    scheduler: ReminderScheduler,
    courier: Courier,
    timing: ReminderTiming,
}

impl Funnel {
    /// Assembles a funnel from its parts.
    #[must_use]
    pub fn new(
        script: FunnelScript,
        photos: [Option<PhotoSource>; PHOTO_COUNT],
        links: TrackingLinks,
        gateway: Arc<dyn MessagingGateway>,
        timing: ReminderTiming,
    ) -> Self {
        let tracker = ConversionTracker::new();
        let courier = Courier::new(gateway);
        let scheduler = ReminderScheduler::new(tracker.clone(), courier.clone(), links.clone());

        Self {
            script,
            photos,
            links,
            tracker,
            scheduler,
            courier,
            timing,
        }
    }

    /// Builds the funnel described by `settings`.
    #[must_use]
    pub fn from_settings(
        settings: &FunnelSettings,
        script: FunnelScript,
        gateway: Arc<dyn MessagingGateway>,
    ) -> Self {
        let signer = LinkSigner::new(settings.signing_secret.clone()).with_ttl(settings.token_ttl);
        let links = TrackingLinks::new(signer, settings.site_url.clone(), settings.base_url.clone());
        let photos = std::array::from_fn(|i| PhotoSource::resolve(&settings.photos[i], &settings.assets_dir));

        Self::new(script, photos, links, gateway, settings.timing)
    }

    /// Runs the entry sequence for a user who sent `/start`.
    ///
    /// Clears the conversion flag, sends the welcome and the invitation with a
    /// fresh tracking link, then arms both reminders relative to now.
    pub async fn start(&self, user_id: UserId) {
        let entered_at = Instant::now();
        self.tracker.reset(user_id);
        self.log_photo_sources();

        info!(user_id = %user_id, "User entered the funnel");

        let welcome = OutboundMessage {
            text: self.script.welcome.clone(),
            photo: self.photo(Step::Welcome),
            button: None,
        };
        self.courier.deliver(user_id, &welcome).await;

        let link = self.links.tracking_link(user_id);
        let invitation = OutboundMessage {
            text: self.script.invitation_with_link(link.as_str()),
            photo: self.photo(Step::Invitation),
            button: Some(LinkButton {
                label: self.script.button_label.clone(),
                url: link,
            }),
        };
        self.courier.deliver(user_id, &invitation).await;

        for slot in ReminderSlot::ALL {
            let step = slot.step();
            let payload = ReminderPayload {
                text: self.script.text(step).to_owned(),
                photo: self.photo(step),
                link_button_label: Some(self.script.button_label.clone()),
            };
            self.scheduler
                .schedule_at(user_id, slot, entered_at + slot.delay(&self.timing), payload);
        }
    }

    /// Sends the bare tracking link with the invitation photo.
    pub async fn send_site_link(&self, user_id: UserId) -> DeliveryReport {
        let message = OutboundMessage {
            text: self.links.tracking_link(user_id).to_string(),
            photo: self.photo(Step::Invitation),
            button: None,
        };
        self.courier.deliver(user_id, &message).await
    }

    /// Records a verified form submission.
    ///
    /// Marks the user as converted, cancels their reminders and sends the
    /// confirmation. Send failures are logged, never returned.
    pub async fn complete(&self, user_id: UserId) -> CompletionOutcome {
        let newly_submitted = self.tracker.mark_submitted(user_id);
        let cancelled = self.scheduler.cancel_all(user_id);

        info!(
            user_id = %user_id,
            newly_submitted,
            cancelled,
            "Form submission recorded"
        );

        let message = OutboundMessage {
            text: self.script.confirmation.clone(),
            photo: self.photo(Step::Confirmation),
            button: None,
        };
        let confirmation = self.courier.deliver(user_id, &message).await;
        if !confirmation.is_delivered() {
            warn!(user_id = %user_id, "Confirmation could not be delivered");
        }

        CompletionOutcome {
            newly_submitted,
            cancelled,
            confirmation,
        }
    }

    /// Sends a plain text message.
    pub async fn notify(&self, user_id: UserId, text: &str) -> DeliveryReport {
        self.courier.deliver(user_id, &OutboundMessage::text(text)).await
    }

    /// Logs where each photo is taken from and whether local files exist.
    pub fn log_photo_sources(&self) {
        for (i, photo) in self.photos.iter().enumerate() {
            match photo {
                None => info!(photo = i + 1, "No photo configured"),
                Some(PhotoSource::Remote(url)) => info!(photo = i + 1, source = %url, "Remote photo"),
                Some(PhotoSource::Local(path)) => info!(
                    photo = i + 1,
                    source = %path.display(),
                    exists = path.is_file(),
                    "Local photo"
                ),
            }
        }
    }

    fn photo(&self, step: Step) -> Option<PhotoSource> {
        self.photos[step.photo_index()].clone()
    }

    #[must_use]
    pub fn links(&self) -> &TrackingLinks {
        &self.links
    }

    #[must_use]
    pub fn signer(&self) -> &LinkSigner {
        self.links.signer()
    }

    #[must_use]
    pub fn tracker(&self) -> &ConversionTracker {
        &self.tracker
    }

    #[must_use]
    pub fn scheduler(&self) -> &ReminderScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn script(&self) -> &FunnelScript {
        &self.script
    }
}

impl std::fmt::Debug for Funnel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Funnel")
            .field("photos", &self.photos)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}
