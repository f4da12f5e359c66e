//! [`ConversationSource`] backed by the Slack Web API.

use async_trait::async_trait;

use tally_core::backfill::{
    ChannelSummary, ConversationSource, HistoryMessage, HistoryPage, HistoryRequest,
};
use tally_types::error::ChannelError;

use crate::api::SlackApiClient;
use crate::events::is_automated;

#[async_trait]
impl ConversationSource for SlackApiClient {
    async fn list_public_channels(&self, limit: u32) -> Result<Vec<ChannelSummary>, ChannelError> {
        let channels = self.conversations_list(limit).await?;
        Ok(channels
            .into_iter()
            .filter(|c| !c.is_archived)
            .map(|c| ChannelSummary {
                id: c.id,
                name: c.name,
            })
            .collect())
    }

    async fn join_channel(&self, channel_id: &str) -> Result<(), ChannelError> {
        self.conversations_join(channel_id).await
    }

    async fn channel_members(&self, channel_id: &str) -> Result<Vec<String>, ChannelError> {
        self.conversations_members(channel_id).await
    }

    async fn history_page(&self, request: &HistoryRequest) -> Result<HistoryPage, ChannelError> {
        let page = self
            .conversations_history(
                &request.channel_id,
                request.oldest,
                request.limit,
                request.cursor.as_deref(),
            )
            .await?;
        let next_cursor = page.response_metadata.cursor().map(str::to_owned);
        Ok(HistoryPage {
            messages: page
                .messages
                .into_iter()
                .map(|m| HistoryMessage {
                    automated: is_automated(m.bot_id.as_deref(), m.subtype.as_deref()),
                    author_id: m.user,
                })
                .collect(),
            has_more: page.has_more,
            next_cursor,
        })
    }
}
