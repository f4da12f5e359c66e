//! Slack Web API client.
//!
//! [`SlackApiClient`] provides typed methods for the subset of the
//! Slack Web API the tracker uses: `auth.test`, `conversations.list`,
//! `conversations.join`, `conversations.members`, and
//! `conversations.history`. Every call is a form-encoded POST with the
//! bot token as a bearer credential. Throttled calls (HTTP 429) are
//! retried after the `Retry-After` delay.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use tally_types::error::ChannelError;
use tally_types::secret::SecretString;

use crate::events::{
    ApiResponse, AuthTest, ChannelInfo, ConversationsHistory, ConversationsList,
    ConversationsMembers, Empty,
};

/// Base URL for the Slack Web API.
const SLACK_API_BASE: &str = "https://slack.com/api";

/// Retries spent on a throttled call before giving up.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Delay used when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Page size for `conversations.members`.
const MEMBERS_PAGE_SIZE: u32 = 1000;

/// HTTP client for the Slack Web API.
///
/// Wraps a [`reqwest::Client`] and the bot token. The base URL can be
/// overridden to point at a mock server.
#[derive(Clone)]
pub struct SlackApiClient {
    /// Shared HTTP client.
    http: Client,
    /// Bot token for API authorization.
    bot_token: SecretString,
    /// Base URL for API calls.
    base_url: String,
}

impl SlackApiClient {
    /// Create a new client with the given bot token.
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            http: Client::new(),
            bot_token,
            base_url: SLACK_API_BASE.to_owned(),
        }
    }

    /// Point the client at a different base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Return the base URL used for API requests.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying HTTP client, shared with reply delivery.
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Call `auth.test` and return the bot's own user id.
    pub async fn auth_test(&self) -> Result<String, ChannelError> {
        let body: AuthTest = self.call("auth.test", &[]).await?;
        body.user_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ChannelError::AuthFailed("auth.test returned no user_id".into()))
    }

    /// Call `conversations.list` for public, unarchived channels.
    ///
    /// Only the first page is fetched.
    pub async fn conversations_list(&self, limit: u32) -> Result<Vec<ChannelInfo>, ChannelError> {
        let limit = limit.to_string();
        let body: ConversationsList = self
            .call(
                "conversations.list",
                &[
                    ("types", "public_channel"),
                    ("exclude_archived", "true"),
                    ("limit", limit.as_str()),
                ],
            )
            .await?;
        Ok(body.channels)
    }

    /// Call `conversations.join`.
    pub async fn conversations_join(&self, channel: &str) -> Result<(), ChannelError> {
        let _: Empty = self
            .call("conversations.join", &[("channel", channel)])
            .await?;
        Ok(())
    }

    /// Call `conversations.members`, following cursors until every member
    /// has been collected.
    pub async fn conversations_members(&self, channel: &str) -> Result<Vec<String>, ChannelError> {
        let limit = MEMBERS_PAGE_SIZE.to_string();
        let mut members = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut params = vec![("channel", channel), ("limit", limit.as_str())];
            if let Some(c) = cursor.as_deref() {
                params.push(("cursor", c));
            }
            let page: ConversationsMembers = self.call("conversations.members", &params).await?;
            members.extend(page.members);
            match page.response_metadata.cursor() {
                Some(next) => cursor = Some(next.to_owned()),
                None => return Ok(members),
            }
        }
    }

    /// Call `conversations.history` for one page.
    pub async fn conversations_history(
        &self,
        channel: &str,
        oldest: i64,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<ConversationsHistory, ChannelError> {
        let oldest = oldest.to_string();
        let limit = limit.to_string();
        let mut params = vec![
            ("channel", channel),
            ("oldest", oldest.as_str()),
            ("limit", limit.as_str()),
        ];
        if let Some(c) = cursor {
            params.push(("cursor", c));
        }
        self.call("conversations.history", &params).await
    }

    /// POST `params` to `method`, retrying on 429, and unwrap the payload.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ChannelError> {
        let url = format!("{}/{method}", self.base_url);
        let mut retries = 0;

        loop {
            debug!(method, "calling slack api");

            let resp = self
                .http
                .post(&url)
                .bearer_auth(self.bot_token.expose())
                .form(params)
                .send()
                .await
                .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;

            if resp.status() == StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = resp
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                if retries >= MAX_RATE_LIMIT_RETRIES {
                    warn!(method, retries, "rate limited, giving up");
                    return Err(ChannelError::RateLimited { retry_after_secs });
                }
                retries += 1;
                warn!(method, retry_after_secs, attempt = retries, "rate limited, retrying");
                tokio::time::sleep(Duration::from_secs(retry_after_secs)).await;
                continue;
            }

            let body: ApiResponse<T> = resp
                .json()
                .await
                .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;

            if !body.ok {
                return Err(ChannelError::Api {
                    method: method.to_owned(),
                    error: body.error.unwrap_or_else(|| "unknown_error".into()),
                });
            }
            return Ok(body.body);
        }
    }
}
