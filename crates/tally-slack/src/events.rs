//! Slack Events API, slash-command and Web API payload types.

use serde::Deserialize;

use tally_types::event::{CommandKind, CommandRequest, MessageEvent, UnknownCommand};

/// A JSON body POSTed by the Events API.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventsRequest {
    /// Sent once when the request URL is configured; echo the challenge.
    UrlVerification {
        /// Value to echo back.
        challenge: String,
    },

    /// A subscribed event.
    EventCallback {
        /// The workspace the event came from.
        #[serde(default)]
        team_id: Option<String>,
        /// The inner event.
        event: SlackEvent,
    },

    /// Anything else (e.g. `app_rate_limited`); acknowledged and ignored.
    #[serde(other)]
    Other,
}

/// An inner Events API event.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackEvent {
    /// Event type: `"message"`, `"app_mention"`, etc.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Message subtype, e.g. `"bot_message"` or `"message_changed"`.
    #[serde(default)]
    pub subtype: Option<String>,

    /// Channel the event occurred in.
    #[serde(default)]
    pub channel: Option<String>,

    /// Author of the message.
    #[serde(default)]
    pub user: Option<String>,

    /// Set when a bot or integration posted the message.
    #[serde(default)]
    pub bot_id: Option<String>,

    /// Message timestamp.
    #[serde(default)]
    pub ts: Option<String>,
}

impl SlackEvent {
    /// Convert a `message` event into a [`MessageEvent`]; other event
    /// types yield `None`.
    pub fn to_message_event(&self) -> Option<MessageEvent> {
        if self.event_type != "message" {
            return None;
        }
        Some(MessageEvent {
            author_id: self.user.clone(),
            channel_id: self.channel.clone(),
            automated: is_automated(self.bot_id.as_deref(), self.subtype.as_deref()),
        })
    }
}

/// The form body POSTed for a slash command.
#[derive(Debug, Clone, Deserialize)]
pub struct SlashCommand {
    /// The command name, including `/`.
    pub command: String,

    /// Who invoked the command.
    pub user_id: String,

    /// Where the command was invoked.
    #[serde(default)]
    pub channel_id: Option<String>,

    /// Text after the command name.
    #[serde(default)]
    pub text: String,

    /// URL that accepts delayed replies for 30 minutes.
    pub response_url: String,

    /// The workspace the command came from.
    #[serde(default)]
    pub team_id: Option<String>,
}

impl SlashCommand {
    /// Map onto a [`CommandRequest`], failing for commands we do not serve.
    pub fn to_request(&self) -> Result<CommandRequest, UnknownCommand> {
        let kind: CommandKind = self.command.parse()?;
        let channel_id = self.channel_id.clone().filter(|id| !id.is_empty());
        Ok(CommandRequest::new(kind, self.user_id.clone(), channel_id))
    }
}

/// A bot id or the `bot_message` subtype marks a message as automated.
pub(crate) fn is_automated(bot_id: Option<&str>, subtype: Option<&str>) -> bool {
    bot_id.is_some_and(|id| !id.is_empty()) || subtype == Some("bot_message")
}

// ── Web API responses ───────────────────────────────────────────────────

/// Fields common to every Web API response; the method-specific fields
/// are flattened into `body`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub ok: bool,

    /// Error code when `ok` is `false`.
    #[serde(default)]
    pub error: Option<String>,

    /// Method-specific payload.
    #[serde(flatten)]
    pub body: T,
}

/// Pagination metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMetadata {
    /// Cursor for the next page; empty or absent on the last page.
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl ResponseMetadata {
    /// The next cursor, treating an empty string as "no more pages".
    pub fn cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// `auth.test`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthTest {
    /// The bot's own user id.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Workspace id.
    #[serde(default)]
    pub team_id: Option<String>,
}

/// A channel entry in `conversations.list`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelInfo {
    /// Channel id.
    pub id: String,

    /// Channel name without `#`.
    #[serde(default)]
    pub name: String,

    /// Archived channels are excluded by the request but reported anyway
    /// by some workspaces.
    #[serde(default)]
    pub is_archived: bool,
}

/// `conversations.list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationsList {
    /// The listed channels.
    #[serde(default)]
    pub channels: Vec<ChannelInfo>,
}

/// `conversations.members`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationsMembers {
    /// Member user ids on this page.
    #[serde(default)]
    pub members: Vec<String>,

    /// Pagination.
    #[serde(default)]
    pub response_metadata: ResponseMetadata,
}

/// A message in `conversations.history`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryItem {
    /// Author, absent for some system and bot messages.
    #[serde(default)]
    pub user: Option<String>,

    /// Set for bot messages.
    #[serde(default)]
    pub bot_id: Option<String>,

    /// Message subtype.
    #[serde(default)]
    pub subtype: Option<String>,

    /// Message timestamp.
    #[serde(default)]
    pub ts: Option<String>,
}

/// `conversations.history`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationsHistory {
    /// Messages on this page, newest first.
    #[serde(default)]
    pub messages: Vec<HistoryItem>,

    /// Whether older messages remain.
    #[serde(default)]
    pub has_more: bool,

    /// Pagination.
    #[serde(default)]
    pub response_metadata: ResponseMetadata,
}

/// Methods whose success payload we ignore (e.g. `conversations.join`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Empty {}
