//! Reminder scheduler runner.
//!
//! Every `(user, slot)` key owns at most one live job. A job follows a small
//! state machine:
//!
//! 1. `schedule`/`schedule_at` disarms whatever job the key had and arms a new
//!    timer task with a fresh generation number
//! 2. When the timer elapses, the task claims the job. Only a job that is still
//!    `Scheduled` with the task's generation may be claimed; claiming moves it
//!    to `Fired`
//! 3. A converted user gets nothing. Anyone else gets the payload through the
//!    delivery chain
//!
//! `cancel` aborts the timer task and moves the job to `Cancelled`. All table
//! changes happen under the key's shard lock, which is never held across an
//! `.await`.
//!
//! Entries outlive their job so that [`ReminderScheduler::state`] can still
//! report `Fired` or `Cancelled`. A finished entry keeps no payload and no task
//! handle, and re-arming reuses it, so the table holds at most one small entry
//! per `(user, slot)` ever scheduled, the same growth as the conversion set.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use super::{ConversionTracker, FireOutcome, JobState, ReminderPayload, ReminderSlot};
use super::job::JobEntry;
use crate::signing::TrackingLinks;
use crate::telegram::{Courier, LinkButton, OutboundMessage};
use crate::types::UserId;

type JobKey = (UserId, ReminderSlot);

/// Per-user delayed reminders. Clones share the same job table.
#[derive(Clone)]
pub struct ReminderScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    jobs: DashMap<JobKey, JobEntry>,
    next_generation: AtomicU64,
    tracker: ConversionTracker,
    courier: Courier,
    links: TrackingLinks,
}

impl ReminderScheduler {
    /// Creates a scheduler delivering through `courier`.
    ///
    /// `links` mints the tracking link for payloads that ask for a button.
    #[must_use]
    pub fn new(tracker: ConversionTracker, courier: Courier, links: TrackingLinks) -> Self {
        Self {
            inner: Arc::new(Inner {
                jobs: DashMap::new(),
                next_generation: AtomicU64::new(1),
                tracker,
                courier,
                links,
            }),
        }
    }

    /// Schedules a reminder `delay` from now, replacing any pending one.
    pub fn schedule(
        &self,
        user_id: UserId,
        slot: ReminderSlot,
        delay: Duration,
        payload: ReminderPayload,
    ) {
        self.schedule_at(user_id, slot, Instant::now() + delay, payload);
    }

    /// Schedules a reminder at `fire_at`, replacing any pending one.
    pub fn schedule_at(
        &self,
        user_id: UserId,
        slot: ReminderSlot,
        fire_at: Instant,
        payload: ReminderPayload,
    ) {
        let key = (user_id, slot);
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);

        // The guard is held until the new entry is in place, so the timer task
        // cannot claim before it sees its own generation.
        let mut entry = self.inner.jobs.entry(key).or_insert_with(|| JobEntry {
            generation: 0,
            state: JobState::Unscheduled,
            fire_at,
            payload: None,
            handle: None,
        });

        if entry.disarm(JobState::Cancelled) {
            debug!(user_id = %user_id, slot = %slot, "Replaced pending reminder");
        }

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            sleep_until(fire_at).await;
            inner.fire(key, Some(generation)).await;
        });

        *entry = JobEntry {
            generation,
            state: JobState::Scheduled,
            fire_at,
            payload: Some(payload),
            handle: Some(handle),
        };

        debug!(
            user_id = %user_id,
            slot = %slot,
            in_secs = fire_at.saturating_duration_since(Instant::now()).as_secs(),
            "Reminder scheduled"
        );
    }

    /// Fires the reminder now, as its timer would.
    ///
    /// The pending timer is aborted. Returns [`FireOutcome::Stale`] if the key
    /// has no pending job.
    pub async fn on_fire(&self, user_id: UserId, slot: ReminderSlot) -> FireOutcome {
        self.inner.fire((user_id, slot), None).await
    }

    /// Cancels the pending reminder. Returns false if there was none.
    pub fn cancel(&self, user_id: UserId, slot: ReminderSlot) -> bool {
        let cancelled = self
            .inner
            .jobs
            .get_mut(&(user_id, slot))
            .is_some_and(|mut entry| entry.disarm(JobState::Cancelled));

        if cancelled {
            debug!(user_id = %user_id, slot = %slot, "Reminder cancelled");
        }
        cancelled
    }

    /// Cancels every pending reminder of the user. Returns how many were pending.
    pub fn cancel_all(&self, user_id: UserId) -> usize {
        ReminderSlot::ALL
            .iter()
            .filter(|&&slot| self.cancel(user_id, slot))
            .count()
    }

    /// Returns the state of the job at `(user_id, slot)`.
    #[must_use]
    pub fn state(&self, user_id: UserId, slot: ReminderSlot) -> JobState {
        self.inner
            .jobs
            .get(&(user_id, slot))
            .map_or(JobState::Unscheduled, |entry| entry.state)
    }

    /// Returns when the pending job at `(user_id, slot)` fires.
    #[must_use]
    pub fn fire_at(&self, user_id: UserId, slot: ReminderSlot) -> Option<Instant> {
        self.inner
            .jobs
            .get(&(user_id, slot))
            .filter(|entry| entry.state == JobState::Scheduled)
            .map(|entry| entry.fire_at)
    }

    /// Number of jobs waiting to fire.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner
            .jobs
            .iter()
            .filter(|entry| entry.state == JobState::Scheduled)
            .count()
    }
}

impl Inner {
    /// Claims the job at `key` and delivers its payload.
    ///
    /// `expected` is the generation of the calling timer task, or `None` for
    /// an external trigger, which also aborts the timer.
    async fn fire(&self, key: JobKey, expected: Option<u64>) -> FireOutcome {
        let (user_id, slot) = key;

        let payload = {
            let Some(mut entry) = self.jobs.get_mut(&key) else {
                return FireOutcome::Stale;
            };
            if entry.state != JobState::Scheduled
                || expected.is_some_and(|generation| generation != entry.generation)
            {
                return FireOutcome::Stale;
            }
            let Some(payload) = entry.payload.take() else {
                return FireOutcome::Stale;
            };

            let handle = entry.handle.take();
            if expected.is_none() {
                if let Some(handle) = handle {
                    handle.abort();
                }
            }
            entry.state = JobState::Fired;
            payload
        };

        if self.tracker.is_submitted(user_id) {
            info!(user_id = %user_id, slot = %slot, "User already converted, reminder suppressed");
            return FireOutcome::Suppressed;
        }

        let button = payload.link_button_label.map(|label| LinkButton {
            label,
            url: self.links.tracking_link(user_id),
        });
        let message = OutboundMessage {
            text: payload.text,
            photo: payload.photo,
            button,
        };

        let report = self.courier.deliver(user_id, &message).await;
        info!(
            user_id = %user_id,
            slot = %slot,
            delivered = report.is_delivered(),
            "Reminder fired"
        );
        FireOutcome::Sent(report)
    }
}

impl std::fmt::Debug for ReminderScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderScheduler")
            .field("jobs", &self.inner.jobs.len())
            .finish_non_exhaustive()
    }
}
