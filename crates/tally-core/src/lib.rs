//! # tally-core
//!
//! Counting engine for the tally chat activity tracker.
//!
//! Everything here is platform-agnostic; the chat platform is reached only
//! through the capability traits [`ConversationSource`](backfill::ConversationSource)
//! and [`Responder`](commands::Responder), and storage only through
//! [`ActivityStore`](store::ActivityStore).
//!
//! # Data flow
//!
//! ```text
//! MessageEvent ──> EventIngestor ──┐
//!                                  ├──> ActivityCounter ──> ActivityStore
//! ConversationSource ──> Backfill ─┘                             │
//!                                                                │ snapshot
//! CommandRequest ──> CommandRouter ──(Authorizer)──> LeaderboardService
//!                                   └──────────────> BackfillTraverser
//! ```

pub mod auth;
pub mod backfill;
pub mod commands;
pub mod counter;
pub mod ingest;
pub mod leaderboard;
pub mod store;

pub use auth::{AdminOnly, Authorizer};
pub use backfill::{BackfillReport, BackfillTraverser, ConversationSource};
pub use commands::{CommandOutcome, CommandRouter, Responder};
pub use counter::ActivityCounter;
pub use ingest::EventIngestor;
pub use leaderboard::{Leaderboard, LeaderboardService};
pub use store::{ActivityStore, InMemoryActivityStore};
