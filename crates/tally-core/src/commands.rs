//! Command routing: Admin Gate, then leaderboard or backfill.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use tally_types::error::ChannelError;
use tally_types::event::{CommandKind, CommandRequest};

use crate::auth::Authorizer;
use crate::backfill::{BackfillReport, BackfillTraverser};
use crate::leaderboard::LeaderboardService;

/// Reply to a caller who is not the admin.
pub const ADMIN_ONLY: &str = "This command is only available to admins.";

/// Acknowledgement sent before a backfill starts.
pub const BACKFILL_STARTED: &str =
    "Backfill started: replaying the last 90 days of public channel history.";

/// Reply when a backfill finishes.
pub const BACKFILL_COMPLETE: &str = "Backfill complete.";

/// Reply when a backfill aborts. Details go to the log only.
pub const BACKFILL_FAILED: &str = "Backfill failed. Check the logs for details.";

/// Sends plain-text replies back to whoever issued a command.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Deliver one reply.
    async fn respond(&self, text: &str) -> Result<(), ChannelError>;
}

/// What a dispatched command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The caller was not authorized; nothing was read or written.
    Denied,
    /// A leaderboard was rendered and sent.
    Answered,
    /// A backfill ran to completion.
    BackfillCompleted(BackfillReport),
    /// A backfill aborted.
    BackfillFailed,
}

/// Routes authorized commands to the query service or the backfill.
pub struct CommandRouter {
    authorizer: Arc<dyn Authorizer>,
    leaderboards: LeaderboardService,
    backfill: Arc<BackfillTraverser>,
}

impl CommandRouter {
    /// Build a router.
    pub fn new(
        authorizer: Arc<dyn Authorizer>,
        leaderboards: LeaderboardService,
        backfill: Arc<BackfillTraverser>,
    ) -> Self {
        Self {
            authorizer,
            leaderboards,
            backfill,
        }
    }

    /// Handle one command, sending every reply through `responder`.
    ///
    /// Reply delivery failures are logged and do not change the outcome.
    pub async fn dispatch(&self, request: &CommandRequest, responder: &dyn Responder) -> CommandOutcome {
        if !self.authorizer.is_authorized(&request.caller_id) {
            warn!(caller = %request.caller_id, command = %request.kind, "unauthorized command");
            send(responder, ADMIN_ONLY).await;
            return CommandOutcome::Denied;
        }

        info!(caller = %request.caller_id, command = %request.kind, "running command");
        match request.kind {
            CommandKind::Leaderboard => {
                send(responder, &self.leaderboards.global().render()).await;
                CommandOutcome::Answered
            }
            CommandKind::LeaderboardChannel => {
                let channel_id = request.channel_id.as_deref().unwrap_or_default();
                send(responder, &self.leaderboards.channel(channel_id).render()).await;
                CommandOutcome::Answered
            }
            CommandKind::Backfill => {
                send(responder, BACKFILL_STARTED).await;
                match self.backfill.run().await {
                    Ok(report) => {
                        send(responder, BACKFILL_COMPLETE).await;
                        CommandOutcome::BackfillCompleted(report)
                    }
                    Err(_) => {
                        send(responder, BACKFILL_FAILED).await;
                        CommandOutcome::BackfillFailed
                    }
                }
            }
        }
    }
}

async fn send(responder: &dyn Responder, text: &str) {
    if let Err(e) = responder.respond(text).await {
        warn!(error = %e, "failed to deliver reply");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use tally_types::UserActivity;
    use tally_types::config::MembershipPolicy;

    use super::*;
    use crate::auth::AdminOnly;
    use crate::backfill::{
        ChannelSummary, ConversationSource, HistoryMessage, HistoryPage, HistoryRequest,
    };
    use crate::counter::ActivityCounter;
    use crate::leaderboard::NO_CHANNEL_ACTIVITY;
    use crate::store::{ActivityStore, InMemoryActivityStore};

    const ADMIN: &str = "U01F9QU9JLD";

    #[derive(Default)]
    struct Recorder {
        replies: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Responder for Recorder {
        async fn respond(&self, text: &str) -> Result<(), ChannelError> {
            self.replies.lock().push(text.to_owned());
            Ok(())
        }
    }

    struct FailingResponder;

    #[async_trait]
    impl Responder for FailingResponder {
        async fn respond(&self, _text: &str) -> Result<(), ChannelError> {
            Err(ChannelError::SendFailed("expired_url".into()))
        }
    }

    /// Store wrapper that counts every access.
    struct SpyStore {
        inner: InMemoryActivityStore,
        reads: AtomicUsize,
        writes: AtomicUsize,
    }

    impl ActivityStore for SpyStore {
        fn get(&self, user_id: &str) -> Option<UserActivity> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get(user_id)
        }

        fn update(&self, user_id: &str, apply: &mut dyn FnMut(&mut UserActivity)) -> UserActivity {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.update(user_id, apply)
        }

        fn snapshot(&self) -> Vec<UserActivity> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.snapshot()
        }

        fn len(&self) -> usize {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.len()
        }
    }

    /// One channel, one page, with a switch to fail the listing.
    #[derive(Default)]
    struct OneChannel {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ConversationSource for OneChannel {
        async fn list_public_channels(&self, _limit: u32) -> Result<Vec<ChannelSummary>, ChannelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ChannelError::ConnectionFailed("boom".into()));
            }
            Ok(vec![ChannelSummary {
                id: "C1".into(),
                name: "general".into(),
            }])
        }

        async fn join_channel(&self, _channel_id: &str) -> Result<(), ChannelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn channel_members(&self, _channel_id: &str) -> Result<Vec<String>, ChannelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["UBOT".into()])
        }

        async fn history_page(&self, _request: &HistoryRequest) -> Result<HistoryPage, ChannelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HistoryPage {
                messages: vec![HistoryMessage {
                    author_id: Some("U7".into()),
                    automated: false,
                }],
                has_more: false,
                next_cursor: None,
            })
        }
    }

    struct Fixture {
        router: CommandRouter,
        store: Arc<SpyStore>,
        source: Arc<OneChannel>,
        counter: Arc<ActivityCounter>,
    }

    fn fixture(source: OneChannel) -> Fixture {
        let store = Arc::new(SpyStore {
            inner: InMemoryActivityStore::new(),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        });
        let source = Arc::new(source);
        let counter = Arc::new(ActivityCounter::new(store.clone()));
        let backfill = Arc::new(BackfillTraverser::new(
            source.clone(),
            counter.clone(),
            MembershipPolicy::JoinAndVerify,
            Some("UBOT".into()),
        ));
        let router = CommandRouter::new(
            Arc::new(AdminOnly::new(ADMIN)),
            LeaderboardService::new(store.clone()),
            backfill,
        );
        Fixture {
            router,
            store,
            source,
            counter,
        }
    }

    fn request(kind: CommandKind, caller: &str) -> CommandRequest {
        CommandRequest::new(kind, caller, Some("C1".into()))
    }

    #[tokio::test]
    async fn non_admin_is_denied_for_every_command_without_side_effects() {
        let fx = fixture(OneChannel::default());
        for kind in [
            CommandKind::Leaderboard,
            CommandKind::LeaderboardChannel,
            CommandKind::Backfill,
        ] {
            let recorder = Recorder::default();
            let outcome = fx.router.dispatch(&request(kind, "U999"), &recorder).await;
            assert_eq!(outcome, CommandOutcome::Denied);
            assert_eq!(*recorder.replies.lock(), vec![ADMIN_ONLY]);
        }
        assert_eq!(fx.store.reads.load(Ordering::SeqCst), 0);
        assert_eq!(fx.store.writes.load(Ordering::SeqCst), 0);
        assert_eq!(fx.source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn admin_gets_global_leaderboard() {
        let fx = fixture(OneChannel::default());
        fx.counter.accumulate("U1", "C1");
        let recorder = Recorder::default();
        let outcome = fx
            .router
            .dispatch(&request(CommandKind::Leaderboard, ADMIN), &recorder)
            .await;
        assert_eq!(outcome, CommandOutcome::Answered);
        assert_eq!(
            *recorder.replies.lock(),
            vec!["Top 100 Most Active Members:\n1. <@U1> — 1 messages"]
        );
    }

    #[tokio::test]
    async fn admin_gets_no_messages_on_empty_store() {
        let fx = fixture(OneChannel::default());
        let recorder = Recorder::default();
        fx.router
            .dispatch(&request(CommandKind::Leaderboard, ADMIN), &recorder)
            .await;
        assert_eq!(*recorder.replies.lock(), vec!["No messages tracked yet."]);
    }

    #[tokio::test]
    async fn channel_leaderboard_uses_issuing_channel() {
        let fx = fixture(OneChannel::default());
        fx.counter.accumulate("U1", "C1");
        fx.counter.accumulate("U2", "C2");
        let recorder = Recorder::default();
        fx.router
            .dispatch(&request(CommandKind::LeaderboardChannel, ADMIN), &recorder)
            .await;
        assert_eq!(
            *recorder.replies.lock(),
            vec!["Top 100 Members in <#C1>:\n1. <@U1> — 1 messages"]
        );
    }

    #[tokio::test]
    async fn channel_leaderboard_without_channel_has_no_activity() {
        let fx = fixture(OneChannel::default());
        fx.counter.accumulate("U1", "C1");
        let recorder = Recorder::default();
        let req = CommandRequest::new(CommandKind::LeaderboardChannel, ADMIN, None);
        fx.router.dispatch(&req, &recorder).await;
        assert_eq!(*recorder.replies.lock(), vec![NO_CHANNEL_ACTIVITY]);
    }

    #[tokio::test]
    async fn backfill_reports_start_and_completion() {
        let fx = fixture(OneChannel::default());
        let recorder = Recorder::default();
        let outcome = fx
            .router
            .dispatch(&request(CommandKind::Backfill, ADMIN), &recorder)
            .await;
        match outcome {
            CommandOutcome::BackfillCompleted(report) => assert_eq!(report.messages_counted, 1),
            other => panic!("expected completion, got {other:?}"),
        }
        assert_eq!(
            *recorder.replies.lock(),
            vec![BACKFILL_STARTED, BACKFILL_COMPLETE]
        );
        assert_eq!(fx.store.inner.get("U7").map(|a| a.total()), Some(1));
    }

    #[tokio::test]
    async fn backfill_failure_sends_generic_message() {
        let fx = fixture(OneChannel {
            fail: true,
            ..OneChannel::default()
        });
        let recorder = Recorder::default();
        let outcome = fx
            .router
            .dispatch(&request(CommandKind::Backfill, ADMIN), &recorder)
            .await;
        assert_eq!(outcome, CommandOutcome::BackfillFailed);
        let replies = recorder.replies.lock();
        assert_eq!(*replies, vec![BACKFILL_STARTED, BACKFILL_FAILED]);
        assert!(!replies[1].contains("boom"));
    }

    #[tokio::test]
    async fn reply_failures_do_not_change_outcome() {
        let fx = fixture(OneChannel::default());
        let outcome = fx
            .router
            .dispatch(&request(CommandKind::Leaderboard, ADMIN), &FailingResponder)
            .await;
        assert_eq!(outcome, CommandOutcome::Answered);
    }
}
