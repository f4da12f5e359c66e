//! # tally-slack
//!
//! Slack adapter for the tally activity tracker.
//!
//! - **[`api`]** -- Web API client used by the backfill and at startup
//! - **[`source`]** -- [`ConversationSource`](tally_core::ConversationSource) over the Web API
//! - **[`gateway`]** -- axum receiver for Events API callbacks and slash commands
//! - **[`responder`]** -- slash-command replies via `response_url`
//! - **[`signature`]** -- request signature verification
//! - **[`events`]** -- wire types

pub mod api;
pub mod events;
pub mod gateway;
pub mod responder;
pub mod signature;
pub mod source;

pub use api::SlackApiClient;
pub use gateway::{GatewayState, build_router};
pub use responder::ResponseUrlResponder;
