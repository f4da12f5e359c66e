//! `tally serve` -- run the Slack receiver.
//!
//! # Lifecycle
//!
//! ```text
//! 1. Load config, apply --port, validate
//! 2. Resolve the bot's own user id (config, else auth.test)
//! 3. Build store -> counter -> ingestor / backfill -> command router
//! 4. Bind the HTTP receiver and serve
//! 5. Wait for Ctrl+C, then shut down gracefully
//! ```
//!
//! Counts live in memory only and are lost when the process exits.

use std::sync::Arc;

use axum::Router;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tally_core::{
    ActivityCounter, ActivityStore, AdminOnly, BackfillTraverser, CommandRouter, EventIngestor,
    InMemoryActivityStore, LeaderboardService,
};
use tally_slack::{GatewayState, SlackApiClient, build_router};
use tally_types::config::Config;

use super::load_config;

/// Arguments for the `tally serve` subcommand.
#[derive(Args)]
pub struct ServeArgs {
    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<String>,

    /// Listen port (overrides config and `PORT`).
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Run the serve command.
pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    info!("starting tally");

    let mut config = load_config(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;
    if config.access.admin_user_id.is_empty() {
        warn!("access.admin_user_id is empty; every command will be denied");
    }

    let api = SlackApiClient::new(config.slack.bot_token.clone());
    let bot_user_id = resolve_bot_user_id(&config, &api).await;
    let app = build_app(&config, api, bot_user_id);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))?;
    info!(
        addr = %addr,
        path = %config.slack.webhook_path,
        "receiver listening -- press Ctrl+C to stop"
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
    });

    tokio::select! {
        result = &mut server => {
            result??;
            warn!("receiver stopped unexpectedly");
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("received shutdown signal");
        }
    }

    cancel.cancel();
    server.await??;
    info!("shutdown complete");
    Ok(())
}

/// Wire the store, services and receiver into one router.
///
/// Live ingestion and backfill share a single counter over a single store.
pub fn build_app(config: &Config, api: SlackApiClient, bot_user_id: Option<String>) -> Router {
    let store: Arc<dyn ActivityStore> = Arc::new(InMemoryActivityStore::new());
    let counter = Arc::new(ActivityCounter::new(store.clone()));
    let ingestor = Arc::new(EventIngestor::new(counter.clone()));
    let http = api.http().clone();

    let backfill = Arc::new(BackfillTraverser::new(
        Arc::new(api),
        counter,
        config.backfill.membership,
        bot_user_id,
    ));
    let commands = Arc::new(CommandRouter::new(
        Arc::new(AdminOnly::new(config.access.admin_user_id.clone())),
        LeaderboardService::new(store),
        backfill,
    ));

    build_router(Arc::new(GatewayState::new(
        config.slack.signing_secret.clone(),
        config.slack.webhook_path.clone(),
        ingestor,
        commands,
        http,
    )))
}

/// The configured bot user id, else the one `auth.test` reports.
async fn resolve_bot_user_id(config: &Config, api: &SlackApiClient) -> Option<String> {
    if !config.slack.bot_user_id.is_empty() {
        return Some(config.slack.bot_user_id.clone());
    }
    match api.auth_test().await {
        Ok(id) => {
            info!(bot_user_id = %id, "resolved bot user id");
            Some(id)
        }
        Err(e) => {
            warn!(
                error = %e,
                "could not resolve bot user id; backfill will skip channels that need membership"
            );
            None
        }
    }
}
