//! Notification dispatch
//!
//! Sends each team member their daily standup nudge over Slack DM. Members
//! who already have a recap row for the day, or a freshly drafted one
//! sitting in the cache, get a "review your recap" message; everyone else
//! gets a "write your recap" prompt. Sends are independent: one failed DM
//! never blocks the rest, and the report carries success and failure
//! counts.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::repositories::RecapRepository;
use crate::slack::SlackClient;
use crate::summarizer::RecapDraft;

/// Holds drafts between generation and the user's review.
///
/// Reads are one-shot: `take` removes the draft, so a reviewed draft can
/// never be served twice. The cache is an explicit collaborator, not a
/// hidden side effect of generation.
#[derive(Debug, Default)]
pub struct DraftCache {
    drafts: Mutex<HashMap<(String, String), RecapDraft>>,
}

impl DraftCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user_id: &str, team_id: &str, draft: RecapDraft) {
        let mut drafts = self.drafts.lock().await;
        drafts.insert((user_id.to_string(), team_id.to_string()), draft);
    }

    /// Removes and returns the cached draft, if any.
    pub async fn take(&self, user_id: &str, team_id: &str) -> Option<RecapDraft> {
        let mut drafts = self.drafts.lock().await;
        drafts.remove(&(user_id.to_string(), team_id.to_string()))
    }

    /// True when a draft is cached, without consuming it.
    pub async fn contains(&self, user_id: &str, team_id: &str) -> bool {
        let drafts = self.drafts.lock().await;
        drafts.contains_key(&(user_id.to_string(), team_id.to_string()))
    }
}

/// Outcome counts for one dispatch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
}

/// Sends standup nudges over Slack.
pub struct Dispatcher {
    slack: SlackClient,
    recaps: RecapRepository,
}

impl Dispatcher {
    pub fn new(slack: SlackClient, recaps: RecapRepository) -> Self {
        Self { slack, recaps }
    }

    /// Nudges every human member of `channel` for `day`.
    pub async fn notify_channel(
        &self,
        channel: &str,
        team_id: &str,
        day: NaiveDate,
        cache: &DraftCache,
    ) -> DispatchReport {
        let members = match self.slack.conversations_members(channel).await {
            Ok(members) => members,
            Err(e) => {
                warn!(channel, error = %e, "could not list channel members, nothing dispatched");
                return DispatchReport { sent: 0, failed: 0 };
            }
        };

        let bots = self.bot_ids().await;
        let mut report = DispatchReport::default();
        for member in members {
            if bots.contains(&member) {
                continue;
            }
            if self.notify_user(&member, team_id, day, cache).await {
                report.sent += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(
            channel,
            sent = report.sent,
            failed = report.failed,
            "dispatched standup nudges"
        );
        report
    }

    /// Nudges one user. Returns whether the DM was delivered.
    pub async fn notify_user(
        &self,
        user_id: &str,
        team_id: &str,
        day: NaiveDate,
        cache: &DraftCache,
    ) -> bool {
        let has_row = match self.recaps.find_for_day(user_id, team_id, day).await {
            Ok(row) => row.is_some(),
            Err(e) => {
                warn!(user_id, error = %e, "recap lookup failed, assuming none");
                false
            }
        };
        let has_draft = cache.contains(user_id, team_id).await;

        let (text, blocks) = if has_row || has_draft {
            review_message(day)
        } else {
            write_message(day)
        };

        match self.slack.post_message(user_id, &text, Some(blocks)).await {
            Ok(()) => {
                metrics::counter!("notifications_sent").increment(1);
                true
            }
            Err(e) => {
                warn!(user_id, error = %e, "standup nudge failed");
                metrics::counter!("notifications_failed").increment(1);
                false
            }
        }
    }

    /// IDs of workspace bots, so channel-wide nudges skip them. An empty
    /// set on directory failure just means bots get a harmless DM attempt.
    async fn bot_ids(&self) -> Vec<String> {
        match self.slack.users_list().await {
            Ok(users) => users.into_iter().filter(|u| u.is_bot).map(|u| u.id).collect(),
            Err(e) => {
                warn!(error = %e, "could not fetch user directory, not filtering bots");
                Vec::new()
            }
        }
    }
}

fn review_message(day: NaiveDate) -> (String, serde_json::Value) {
    let text = format!("Your recap for {} is drafted and ready to review.", day);
    let blocks = serde_json::json!([
        {
            "type": "section",
            "text": {"type": "mrkdwn", "text": text}
        },
        {
            "type": "actions",
            "elements": [{
                "type": "button",
                "text": {"type": "plain_text", "text": "Review recap"},
                "action_id": "review_recap",
                "style": "primary"
            }]
        }
    ]);
    (text, blocks)
}

fn write_message(day: NaiveDate) -> (String, serde_json::Value) {
    let text = format!("Time to write your recap for {}.", day);
    let blocks = serde_json::json!([
        {
            "type": "section",
            "text": {"type": "mrkdwn", "text": text}
        },
        {
            "type": "actions",
            "elements": [{
                "type": "button",
                "text": {"type": "plain_text", "text": "Write recap"},
                "action_id": "write_recap",
                "style": "primary"
            }]
        }
    ]);
    (text, blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn test_repo() -> RecapRepository {
        let db = sea_orm::Database::connect("sqlite::memory:")
            .await
            .expect("sqlite");
        use migration::MigratorTrait;
        migration::Migrator::up(&db, None).await.expect("migrate");
        RecapRepository::new(Arc::new(db))
    }

    fn draft() -> RecapDraft {
        RecapDraft {
            progress: "Shipped".to_string(),
            blockers: "".to_string(),
            plan: "Continue".to_string(),
        }
    }

    #[tokio::test]
    async fn draft_cache_reads_are_one_shot() {
        let cache = DraftCache::new();
        cache.insert("U1", "T1", draft()).await;

        assert!(cache.contains("U1", "T1").await);
        assert_eq!(cache.take("U1", "T1").await, Some(draft()));
        assert_eq!(cache.take("U1", "T1").await, None);
        assert!(!cache.contains("U1", "T1").await);
    }

    #[tokio::test]
    async fn users_with_a_draft_get_the_review_prompt() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(body_partial_json(serde_json::json!({"channel": "U1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = Dispatcher::new(
            SlackClient::new(server.uri(), "xoxb-test".to_string()),
            test_repo().await,
        );
        let cache = DraftCache::new();
        cache.insert("U1", "T1", draft()).await;

        let day = chrono::NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        assert!(dispatcher.notify_user("U1", "T1", day, &cache).await);

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body["text"].as_str().unwrap().contains("ready to review"));
    }

    #[tokio::test]
    async fn one_failed_send_does_not_block_the_rest() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/conversations.members"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "members": ["U1", "U2", "UBOT"]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/users.list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "members": [
                    {"id": "U1"},
                    {"id": "U2"},
                    {"id": "UBOT", "is_bot": true}
                ],
                "response_metadata": {"next_cursor": ""}
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(body_partial_json(serde_json::json!({"channel": "U1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "error": "cannot_dm_user"
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(body_partial_json(serde_json::json!({"channel": "U2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let dispatcher = Dispatcher::new(
            SlackClient::new(server.uri(), "xoxb-test".to_string()),
            test_repo().await,
        );
        let cache = DraftCache::new();
        let day = chrono::NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();

        let report = dispatcher.notify_channel("C123", "T1", day, &cache).await;
        assert_eq!(report, DispatchReport { sent: 1, failed: 1 });
    }
}
