//! Inbound records handed to the core by the platform adapter.
//!
//! [`MessageEvent`] is one message notification, [`CommandRequest`] one
//! slash-command invocation. Both are platform-neutral.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A message notification from the chat platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Author identifier, absent for system and some bot messages.
    #[serde(default)]
    pub author_id: Option<String>,

    /// Channel the message was posted in.
    #[serde(default)]
    pub channel_id: Option<String>,

    /// Set when the message originates from a bot or integration.
    #[serde(default)]
    pub automated: bool,
}

impl MessageEvent {
    /// Build an event from its three fields.
    pub fn new(
        author_id: Option<impl Into<String>>,
        channel_id: Option<impl Into<String>>,
        automated: bool,
    ) -> Self {
        Self {
            author_id: author_id.map(Into::into),
            channel_id: channel_id.map(Into::into),
            automated,
        }
    }

    /// The `(author, channel)` pair to count, or `None` when the event must
    /// be dropped (automated, or either identifier missing or empty).
    pub fn countable(&self) -> Option<(&str, &str)> {
        if self.automated {
            return None;
        }
        let author = self.author_id.as_deref().filter(|s| !s.is_empty())?;
        let channel = self.channel_id.as_deref().filter(|s| !s.is_empty())?;
        Some((author, channel))
    }
}

/// The admin commands the tracker answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Global top 100.
    Leaderboard,
    /// Top 100 in the channel the command was issued from.
    LeaderboardChannel,
    /// Replay the last 90 days of public channel history.
    Backfill,
}

impl CommandKind {
    /// The slash-command name, including the leading `/`.
    pub fn slash_name(self) -> &'static str {
        match self {
            Self::Leaderboard => "/leaderboard",
            Self::LeaderboardChannel => "/leaderboard_channel",
            Self::Backfill => "/backfill",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slash_name())
    }
}

/// Error returned when a slash-command name is not one of ours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown command: {}", self.0)
    }
}

impl std::error::Error for UnknownCommand {}

impl FromStr for CommandKind {
    type Err = UnknownCommand;

    /// Accepts the name with or without the leading `/`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('/') {
            "leaderboard" => Ok(Self::Leaderboard),
            "leaderboard_channel" => Ok(Self::LeaderboardChannel),
            "backfill" => Ok(Self::Backfill),
            _ => Err(UnknownCommand(s.to_owned())),
        }
    }
}

/// A command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Which command was invoked.
    pub kind: CommandKind,

    /// Who invoked it.
    pub caller_id: String,

    /// Channel the command was issued from, if the platform reports one.
    #[serde(default)]
    pub channel_id: Option<String>,
}

impl CommandRequest {
    /// Build a request.
    pub fn new(kind: CommandKind, caller_id: impl Into<String>, channel_id: Option<String>) -> Self {
        Self {
            kind,
            caller_id: caller_id.into(),
            channel_id,
        }
    }
}
