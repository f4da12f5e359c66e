//! Slash-command replies through the command's `response_url`.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use tally_core::commands::Responder;
use tally_types::error::ChannelError;

/// Posts ephemeral replies to a slash command's `response_url`.
///
/// Only the caller sees the replies. Slack accepts up to five posts per
/// URL within thirty minutes, which covers the start and completion
/// messages of a backfill.
pub struct ResponseUrlResponder {
    http: Client,
    response_url: String,
}

impl ResponseUrlResponder {
    /// Reply through `response_url` using `http`.
    pub fn new(http: Client, response_url: impl Into<String>) -> Self {
        Self {
            http,
            response_url: response_url.into(),
        }
    }
}

#[async_trait]
impl Responder for ResponseUrlResponder {
    async fn respond(&self, text: &str) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "response_type": "ephemeral",
            "text": text,
        });

        debug!(len = text.len(), "posting command reply");

        let resp = self
            .http
            .post(&self.response_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed(format!(
                "response_url returned {status}: {detail}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;

    #[tokio::test]
    async fn posts_ephemeral_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/commands/T1/123/abc")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "response_type": "ephemeral",
                "text": "Backfill complete.",
            })))
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let responder = ResponseUrlResponder::new(
            Client::new(),
            format!("{}/commands/T1/123/abc", server.url()),
        );
        responder.respond("Backfill complete.").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_send_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/expired")
            .with_status(404)
            .with_body("expired_url")
            .create_async()
            .await;

        let responder = ResponseUrlResponder::new(Client::new(), format!("{}/expired", server.url()));
        let err = responder.respond("hi").await.unwrap_err();
        match err {
            ChannelError::SendFailed(msg) => assert!(msg.contains("expired_url")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
