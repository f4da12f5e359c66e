//! # tally-types
//!
//! Core type definitions for the tally chat activity tracker.
//!
//! This crate is the foundation of the dependency graph -- all other
//! tally crates depend on it. It contains:
//!
//! - **[`activity`]** -- [`UserActivity`], the per-user count record
//! - **[`config`]** -- Configuration schema and environment overlay
//! - **[`error`]** -- [`TallyError`] and [`ChannelError`] error types
//! - **[`event`]** -- Inbound message events and command requests
//! - **[`secret`]** -- [`SecretString`] for tokens and signing secrets

pub mod activity;
pub mod config;
pub mod error;
pub mod event;
pub mod secret;

pub use activity::UserActivity;
pub use error::{ChannelError, Result, TallyError};
pub use secret::SecretString;
