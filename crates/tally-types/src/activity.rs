//! Per-user message counts.

use std::collections::HashMap;

use serde::Serialize;

/// Counted messages for one user, in total and per channel.
///
/// The fields are private so that [`record`](UserActivity::record) is the
/// only mutation: `total` always equals the sum of `channel_counts`, and a
/// channel key exists only once the user has a counted message there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserActivity {
    user_id: String,
    total: u64,
    channel_counts: HashMap<String, u64>,
}

impl UserActivity {
    /// A user with no counted messages yet.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            total: 0,
            channel_counts: HashMap::new(),
        }
    }

    /// Count one message in `channel_id`.
    pub fn record(&mut self, channel_id: &str) {
        self.total += 1;
        *self
            .channel_counts
            .entry(channel_id.to_owned())
            .or_insert(0) += 1;
    }

    /// The user identifier.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Counted messages across all channels.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Counted messages in one channel (0 if the user never posted there).
    pub fn channel_count(&self, channel_id: &str) -> u64 {
        self.channel_counts.get(channel_id).copied().unwrap_or(0)
    }

    /// Per-channel breakdown.
    pub fn channel_counts(&self) -> &HashMap<String, u64> {
        &self.channel_counts
    }
}
