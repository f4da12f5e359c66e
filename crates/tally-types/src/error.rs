//! Error types for tally.
//!
//! [`TallyError`] is the top-level error type; [`ChannelError`] covers
//! failures talking to the chat platform. Both are non-exhaustive.

use thiserror::Error;

/// Top-level error type for tally.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TallyError {
    /// Configuration is malformed or semantically invalid.
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A chat-platform call failed.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Chat-platform error type.
///
/// Returned by every external capability (channel listing, joins, member
/// lookups, history pages, replies).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ChannelError {
    /// The HTTP request could not be completed or its body could not be read.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The token was rejected.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The platform kept throttling after every retry was spent.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Delay requested by the last throttled response.
        retry_after_secs: u64,
    },

    /// The platform answered but reported a failure (`ok: false`).
    #[error("{method} failed: {error}")]
    Api {
        /// Web API method name, e.g. `conversations.history`.
        method: String,
        /// Platform error code, e.g. `channel_not_found`.
        error: String,
    },

    /// Sending a reply failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Catch-all for errors that do not fit other variants.
    #[error("{0}")]
    Other(String),
}

/// A convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, TallyError>;
