//! Reminder scheduling module.
//!
//! Keeps per-user delayed reminders and the set of users who converted,
//! whose reminders are suppressed.

mod job;
mod runner;
mod tracker;

pub use job::{FireOutcome, JobState, ReminderPayload, ReminderSlot};
pub use runner::ReminderScheduler;
pub use tracker::ConversionTracker;
