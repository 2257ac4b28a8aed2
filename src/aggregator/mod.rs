//! Cross-source activity aggregation
//!
//! Runs the three collectors for whichever sources a connection has
//! credentials for, then folds the normalized items into a single prompt
//! context for summarization. A context is only produced when at least one
//! source returned something; sections always appear in the same order and
//! empty sections are omitted entirely.

use chrono::Timelike;
use tracing::debug;

use crate::collectors::{
    ActivityWindow, CommitActivity, EventActivity, GitHubCollector, GoogleCalendarCollector,
    GoogleTokens, MessageActivity, SlackMessageCollector,
};
use crate::collectors::github::RepoScope;
use crate::models::connection;

/// The normalized activity gathered for one user over one window.
#[derive(Debug, Clone, Default)]
pub struct ActivityContext {
    pub commits: Vec<CommitActivity>,
    pub messages: Vec<MessageActivity>,
    pub events: Vec<EventActivity>,
}

impl ActivityContext {
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty() && self.messages.is_empty() && self.events.is_empty()
    }
}

/// Fans out to the source collectors and assembles prompt context.
#[derive(Debug, Clone)]
pub struct Aggregator {
    github: GitHubCollector,
    slack: SlackMessageCollector,
    calendar: GoogleCalendarCollector,
}

impl Aggregator {
    pub fn new(
        github: GitHubCollector,
        slack: SlackMessageCollector,
        calendar: GoogleCalendarCollector,
    ) -> Self {
        Self {
            github,
            slack,
            calendar,
        }
    }

    /// Collects activity for a connection across every source it has
    /// credentials for. Sources without credentials contribute nothing;
    /// source failures already degrade to empty inside each collector, so
    /// this never fails outright.
    pub async fn collect(
        &self,
        conn: &connection::Model,
        channel: Option<&str>,
        window: &ActivityWindow,
    ) -> ActivityContext {
        let mut ctx = ActivityContext::default();

        if let Some(ref token) = conn.github_token {
            let scope = match (&conn.github_owner, &conn.github_repo) {
                (Some(owner), Some(repo)) => Some(RepoScope {
                    owner: owner.clone(),
                    repo: repo.clone(),
                }),
                _ => None,
            };
            ctx.commits = self.github.collect(token, scope.as_ref(), window).await;
        }

        if let Some(channel) = channel {
            ctx.messages = self.slack.collect(channel, &conn.slack_user_id, window).await;
        }

        if conn.google_access_token.is_some() || conn.google_refresh_token.is_some() {
            let tokens = GoogleTokens {
                access_token: conn.google_access_token.clone(),
                refresh_token: conn.google_refresh_token.clone(),
                id_token: conn.google_id_token.clone(),
                expiry: conn.google_token_expiry.map(|e| e.to_utc()),
            };
            ctx.events = self.calendar.collect(&tokens, window).await;
        }

        debug!(
            commits = ctx.commits.len(),
            messages = ctx.messages.len(),
            events = ctx.events.len(),
            "aggregated activity"
        );
        ctx
    }
}

/// Renders the prompt context fed to the summarizer.
///
/// Returns `None` when every source came back empty, which callers treat
/// as "nothing to summarize". Sections appear in a fixed order (commits,
/// then Slack messages, then calendar events) and a source with no items
/// contributes no section header.
pub fn prompt_context(ctx: &ActivityContext) -> Option<String> {
    if ctx.is_empty() {
        return None;
    }

    let mut out = String::new();

    if !ctx.commits.is_empty() {
        out.push_str("Recent commits:\n");
        for commit in &ctx.commits {
            out.push_str(&format!("- [{}] {}\n", commit.repository, commit.message));
        }
    }

    if !ctx.messages.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("Slack activity:\n");
        for message in &ctx.messages {
            out.push_str(&format!("- {}\n", message.text));
        }
    }

    if !ctx.events.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("Calendar events:\n");
        for event in &ctx.events {
            if event.is_all_day {
                out.push_str(&format!("- {} (all day)\n", event.title));
            } else {
                out.push_str(&format!(
                    "- {} at {:02}:{:02} UTC\n",
                    event.title,
                    event.start_time.hour(),
                    event.start_time.minute()
                ));
            }
        }
    }

    Some(out)
}
