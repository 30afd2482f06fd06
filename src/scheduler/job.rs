//! Reminder slots, payloads and job state.

use std::fmt;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::{ReminderTiming, Step};
use crate::telegram::{DeliveryReport, PhotoSource};

/// One of the two reminder positions a user can have pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReminderSlot {
    ShortDelay,
    LongDelay,
}

impl ReminderSlot {
    /// Both slots, shortest first.
    pub const ALL: [Self; 2] = [Self::ShortDelay, Self::LongDelay];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ShortDelay => "short_delay",
            Self::LongDelay => "long_delay",
        }
    }

    /// The script step whose text and photo this slot sends.
    #[must_use]
    pub const fn step(self) -> Step {
        match self {
            Self::ShortDelay => Step::ShortReminder,
            Self::LongDelay => Step::LongReminder,
        }
    }

    /// Delay of this slot, measured from funnel entry.
    #[must_use]
    pub const fn delay(self, timing: &ReminderTiming) -> Duration {
        match self {
            Self::ShortDelay => timing.short_delay,
            Self::LongDelay => timing.long_delay,
        }
    }
}

impl fmt::Display for ReminderSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a reminder sends when it fires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderPayload {
    pub text: String,

    pub photo: Option<PhotoSource>,

    /// If set, a tracking-link button with this label is minted at fire time.
    pub link_button_label: Option<String>,
}

/// Lifecycle of a reminder job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    /// No job was ever scheduled for the key.
    #[default]
    Unscheduled,
    /// Armed and waiting for its fire time.
    Scheduled,
    /// Fired; the send may have been suppressed for a converted user.
    Fired,
    /// Cancelled before firing.
    Cancelled,
}

/// Result of a fire attempt.
#[derive(Debug)]
pub enum FireOutcome {
    /// The payload went through the delivery chain.
    Sent(DeliveryReport),
    /// The user had converted; nothing was sent.
    Suppressed,
    /// The job was cancelled, superseded or already fired.
    Stale,
}

/// Entry of the job table.
#[derive(Debug)]
pub(super) struct JobEntry {
    /// Distinguishes a re-armed job from the one it replaced.
    pub(super) generation: u64,
    pub(super) state: JobState,
    pub(super) fire_at: Instant,
    /// Taken by whoever claims the job.
    pub(super) payload: Option<ReminderPayload>,
    pub(super) handle: Option<JoinHandle<()>>,
}

impl JobEntry {
    /// Aborts the timer task if it is still armed. Returns true if the job was pending.
    pub(super) fn disarm(&mut self, next: JobState) -> bool {
        if self.state != JobState::Scheduled {
            return false;
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.payload = None;
        self.state = next;
        true
    }
}
