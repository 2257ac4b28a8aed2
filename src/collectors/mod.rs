//! Source collectors
//!
//! The three independent fetch-and-normalize adapters over the upstream
//! activity sources, plus the shared day-window type:
//! - GitHub commit collector
//! - Slack message collector
//! - Google Calendar event collector
//!
//! All collectors share the same contract shape: given credentials and a
//! day window, return an ordered, capped sequence of normalized activity
//! items attributable to the target user. Per-item and per-repository
//! fetch failures degrade to skips, never to a failed collection.

pub mod github;
pub mod google_calendar;
pub mod slack;
pub mod window;

pub use github::{CommitActivity, GitHubCollector};
pub use google_calendar::{EventActivity, GoogleCalendarCollector, GoogleTokens};
pub use slack::{MessageActivity, SlackMessageCollector};
pub use window::ActivityWindow;
