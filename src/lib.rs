//! # Standup Recap Service Library
//!
//! Core functionality for the Standup Recap service: identity resolution
//! across Slack/Google/GitHub accounts, per-source activity collectors,
//! aggregation and LLM summarization, and the daily recap record store.

pub mod aggregator;
pub mod collectors;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod repositories;
pub mod server;
pub mod slack;
pub mod summarizer;
pub mod telemetry;
pub use migration;
