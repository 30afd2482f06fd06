//! Set of users who completed the funnel.

use std::sync::Arc;

use dashmap::DashSet;

use crate::types::UserId;

/// Process-wide conversion flags. Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct ConversionTracker {
    submitted: Arc<DashSet<UserId>>,
}

impl ConversionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the user as converted. Returns true if they were not already.
    pub fn mark_submitted(&self, user_id: UserId) -> bool {
        self.submitted.insert(user_id)
    }

    #[must_use]
    pub fn is_submitted(&self, user_id: UserId) -> bool {
        self.submitted.contains(&user_id)
    }

    /// Clears the flag so the user can go through the funnel again.
    pub fn reset(&self, user_id: UserId) {
        self.submitted.remove(&user_id);
    }

    /// Number of converted users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.submitted.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.submitted.is_empty()
    }
}
