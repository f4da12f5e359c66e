//! Backfill Traverser: replays recent channel history into the counter.
//!
//! The traversal lists public channels once, then walks them strictly in
//! listing order. Each channel is optionally joined and membership-checked
//! (see [`MembershipPolicy`]), then its history inside the trailing window
//! is paged through with a continuation cursor and every qualifying
//! message goes through the same [`ActivityCounter`] as live traffic.
//!
//! Replays are additive: running a backfill twice counts the same history
//! twice. A failed traversal is not rolled back.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use tally_types::config::MembershipPolicy;
use tally_types::error::ChannelError;
use tally_types::event::MessageEvent;

use crate::counter::ActivityCounter;

/// Trailing window replayed by a backfill: 90 days, in seconds.
pub const BACKFILL_WINDOW_SECS: i64 = 90 * 24 * 3600;

/// Messages requested per history page.
pub const HISTORY_PAGE_SIZE: u32 = 200;

/// Channels requested by the single channel-list call.
pub const CHANNEL_LIST_LIMIT: u32 = 1000;

/// A listed public channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSummary {
    /// Channel identifier.
    pub id: String,
    /// Display name, for logs.
    pub name: String,
}

/// One history page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    /// Channel to read.
    pub channel_id: String,
    /// Lower bound, Unix seconds. Older messages are not returned.
    pub oldest: i64,
    /// Continuation cursor from the previous page; `None` for the first.
    pub cursor: Option<String>,
    /// Page size.
    pub limit: u32,
}

/// A message as returned by a history page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryMessage {
    /// Author, if the message has a real user behind it.
    pub author_id: Option<String>,
    /// Set for bot and integration messages.
    pub automated: bool,
}

/// One page of channel history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryPage {
    /// Messages on this page.
    pub messages: Vec<HistoryMessage>,
    /// Whether another page follows.
    pub has_more: bool,
    /// Cursor for the next page.
    pub next_cursor: Option<String>,
}

/// The chat-platform capabilities a backfill needs.
#[async_trait]
pub trait ConversationSource: Send + Sync {
    /// Public channels, at most `limit`.
    async fn list_public_channels(&self, limit: u32) -> Result<Vec<ChannelSummary>, ChannelError>;

    /// Join a channel as the bot.
    async fn join_channel(&self, channel_id: &str) -> Result<(), ChannelError>;

    /// User ids of every member of a channel.
    async fn channel_members(&self, channel_id: &str) -> Result<Vec<String>, ChannelError>;

    /// One page of a channel's history.
    async fn history_page(&self, request: &HistoryRequest) -> Result<HistoryPage, ChannelError>;
}

/// Outcome of a completed traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Channels returned by the listing.
    pub channels_seen: usize,
    /// Channels whose history was read.
    pub channels_counted: usize,
    /// Channels skipped by the membership check.
    pub channels_skipped: usize,
    /// Messages passed to the counter.
    pub messages_counted: u64,
}

/// Replays channel history through an [`ActivityCounter`].
pub struct BackfillTraverser {
    source: Arc<dyn ConversationSource>,
    counter: Arc<ActivityCounter>,
    policy: MembershipPolicy,
    bot_user_id: Option<String>,
}

impl BackfillTraverser {
    /// Replay from `source` into `counter`.
    ///
    /// `bot_user_id` is required by [`MembershipPolicy::JoinAndVerify`];
    /// without it every channel fails the membership check.
    pub fn new(
        source: Arc<dyn ConversationSource>,
        counter: Arc<ActivityCounter>,
        policy: MembershipPolicy,
        bot_user_id: Option<String>,
    ) -> Self {
        Self {
            source,
            counter,
            policy,
            bot_user_id: bot_user_id.filter(|id| !id.is_empty()),
        }
    }

    /// Run a traversal with the window ending now.
    pub async fn run(&self) -> Result<BackfillReport, ChannelError> {
        self.run_at(Utc::now()).await
    }

    /// Run a traversal with the window ending at `now`.
    ///
    /// Join and member-lookup failures skip (or, for joins, are ignored
    /// for) a single channel. A failed channel listing or history page
    /// aborts the whole traversal; counts applied before the failure stay.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<BackfillReport, ChannelError> {
        let oldest = now.timestamp() - BACKFILL_WINDOW_SECS;
        info!(oldest, policy = ?self.policy, "backfill started");

        let result = self.traverse(oldest).await;
        match &result {
            Ok(report) => info!(
                channels_seen = report.channels_seen,
                channels_counted = report.channels_counted,
                channels_skipped = report.channels_skipped,
                messages_counted = report.messages_counted,
                "backfill complete"
            ),
            Err(e) => error!(error = %e, "backfill failed"),
        }
        result
    }

    async fn traverse(&self, oldest: i64) -> Result<BackfillReport, ChannelError> {
        let channels = self.source.list_public_channels(CHANNEL_LIST_LIMIT).await?;
        let mut report = BackfillReport {
            channels_seen: channels.len(),
            ..BackfillReport::default()
        };

        for channel in &channels {
            if !self.admit(channel).await {
                report.channels_skipped += 1;
                continue;
            }
            let counted = self.replay_channel(channel, oldest).await?;
            info!(channel = %channel.id, name = %channel.name, counted, "channel replayed");
            report.channels_counted += 1;
            report.messages_counted += counted;
        }
        Ok(report)
    }

    /// Apply the membership policy. Returns `false` to skip the channel.
    async fn admit(&self, channel: &ChannelSummary) -> bool {
        if self.policy.joins() {
            match self.source.join_channel(&channel.id).await {
                Ok(()) => debug!(channel = %channel.id, "joined"),
                Err(e) => warn!(channel = %channel.id, error = %e, "join failed"),
            }
        }
        if !self.policy.verifies() {
            return true;
        }

        let Some(bot) = self.bot_user_id.as_deref() else {
            warn!(channel = %channel.id, "bot user id unknown, skipping channel");
            return false;
        };
        match self.source.channel_members(&channel.id).await {
            Ok(members) if members.iter().any(|m| m == bot) => true,
            Ok(_) => {
                info!(channel = %channel.id, name = %channel.name, "bot not a member, skipping");
                false
            }
            Err(e) => {
                warn!(channel = %channel.id, error = %e, "member lookup failed, skipping");
                false
            }
        }
    }

    async fn replay_channel(&self, channel: &ChannelSummary, oldest: i64) -> Result<u64, ChannelError> {
        let mut request = HistoryRequest {
            channel_id: channel.id.clone(),
            oldest,
            cursor: None,
            limit: HISTORY_PAGE_SIZE,
        };
        let mut counted = 0u64;

        loop {
            let page = self.source.history_page(&request).await?;
            debug!(
                channel = %channel.id,
                messages = page.messages.len(),
                has_more = page.has_more,
                "history page"
            );

            for message in page.messages {
                let event = MessageEvent {
                    author_id: message.author_id,
                    channel_id: Some(channel.id.clone()),
                    automated: message.automated,
                };
                if let Some((author, channel_id)) = event.countable() {
                    self.counter.accumulate(author, channel_id);
                    counted += 1;
                }
            }

            if !page.has_more {
                break;
            }
            match page.next_cursor.filter(|c| !c.is_empty()) {
                Some(cursor) => request.cursor = Some(cursor),
                None => {
                    warn!(channel = %channel.id, "has_more without a cursor, stopping");
                    break;
                }
            }
        }
        Ok(counted)
    }
}
