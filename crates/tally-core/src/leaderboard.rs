//! Query Service: global and per-channel leaderboards.
//!
//! Both queries sort a store snapshot by count, descending, with a stable
//! sort so that equal counts keep the store's first-insertion order, then
//! truncate to [`LEADERBOARD_LIMIT`].

use std::fmt::Write as _;
use std::sync::Arc;

use crate::store::ActivityStore;

/// Maximum number of ranked entries in a leaderboard.
pub const LEADERBOARD_LIMIT: usize = 100;

/// Reply when no message has been counted at all.
pub const NO_MESSAGES_TRACKED: &str = "No messages tracked yet.";

/// Reply when nobody has a counted message in the queried channel.
pub const NO_CHANNEL_ACTIVITY: &str = "No activity in this channel yet.";

/// One ranked row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// The ranked user.
    pub user_id: String,
    /// Their total (global) or channel count (channel-scoped).
    pub count: u64,
}

/// What a leaderboard ranks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// All channels.
    Global,
    /// One channel.
    Channel(String),
}

/// A ranked, truncated view of the counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaderboard {
    scope: Scope,
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    /// The ranked rows, best first.
    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    /// The scope this board was computed for.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns `true` when there is nothing to rank.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plain-text reply.
    ///
    /// An empty board renders as the scope's "no data" message, never as a
    /// bare header.
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return match self.scope {
                Scope::Global => NO_MESSAGES_TRACKED.to_owned(),
                Scope::Channel(_) => NO_CHANNEL_ACTIVITY.to_owned(),
            };
        }

        let mut out = match &self.scope {
            Scope::Global => "Top 100 Most Active Members:".to_owned(),
            Scope::Channel(id) => format!("Top 100 Members in <#{id}>:"),
        };
        for (i, entry) in self.entries.iter().enumerate() {
            let _ = write!(
                out,
                "\n{}. <@{}> — {} messages",
                i + 1,
                entry.user_id,
                entry.count
            );
        }
        out
    }
}

/// Read-only queries over an [`ActivityStore`].
#[derive(Clone)]
pub struct LeaderboardService {
    store: Arc<dyn ActivityStore>,
}

impl LeaderboardService {
    /// Query `store`.
    pub fn new(store: Arc<dyn ActivityStore>) -> Self {
        Self { store }
    }

    /// Top [`LEADERBOARD_LIMIT`] users by total.
    pub fn global(&self) -> Leaderboard {
        self.global_top(LEADERBOARD_LIMIT)
    }

    /// Top [`LEADERBOARD_LIMIT`] users by count in `channel_id`.
    pub fn channel(&self, channel_id: &str) -> Leaderboard {
        self.channel_top(channel_id, LEADERBOARD_LIMIT)
    }

    /// Top `limit` users by total. [`Leaderboard::render`] labels every
    /// board with [`LEADERBOARD_LIMIT`].
    pub(crate) fn global_top(&self, limit: usize) -> Leaderboard {
        let entries = self
            .store
            .snapshot()
            .into_iter()
            .map(|activity| LeaderboardEntry {
                count: activity.total(),
                user_id: activity.user_id().to_owned(),
            })
            .collect();
        Leaderboard {
            scope: Scope::Global,
            entries: rank(entries, limit),
        }
    }

    /// Top `limit` users by count in `channel_id`; users with no count
    /// there are excluded.
    pub(crate) fn channel_top(&self, channel_id: &str, limit: usize) -> Leaderboard {
        let entries = self
            .store
            .snapshot()
            .into_iter()
            .filter_map(|activity| {
                let count = activity.channel_count(channel_id);
                (count > 0).then(|| LeaderboardEntry {
                    user_id: activity.user_id().to_owned(),
                    count,
                })
            })
            .collect();
        Leaderboard {
            scope: Scope::Channel(channel_id.to_owned()),
            entries: rank(entries, limit),
        }
    }
}

/// Stable descending sort, then truncate.
fn rank(mut entries: Vec<LeaderboardEntry>, limit: usize) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(limit);
    entries
}
