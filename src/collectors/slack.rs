//! Slack message collector
//!
//! Pulls a channel's history over the day window and keeps only human
//! messages sent by the target user, normalized into [`MessageActivity`]
//! records. Bot messages and messages with a subtype (joins, topic
//! changes) are excluded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::collectors::window::ActivityWindow;
use crate::slack::{SlackClient, SlackMessage};

/// A normalized channel message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageActivity {
    pub text: String,
    pub sender_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Slack message collector
#[derive(Debug, Clone)]
pub struct SlackMessageCollector {
    client: SlackClient,
    max_messages: usize,
}

impl SlackMessageCollector {
    pub fn new(client: SlackClient, max_messages: usize) -> Self {
        Self {
            client,
            max_messages,
        }
    }

    /// Collects the user's messages in `channel` inside the window.
    ///
    /// Degrades to an empty sequence when the history fetch fails. Results
    /// are most-recent-first and capped at `max_messages`.
    pub async fn collect(
        &self,
        channel: &str,
        user_id: &str,
        window: &ActivityWindow,
    ) -> Vec<MessageActivity> {
        let oldest = window.start().timestamp() as f64;
        let latest = window.end_exclusive().timestamp() as f64;

        let history = match self
            .client
            .conversations_history(channel, oldest, latest, 200)
            .await
        {
            Ok(history) => history,
            Err(e) => {
                warn!(channel, error = %e, "could not fetch channel history, skipping message collection");
                return Vec::new();
            }
        };

        let mut messages: Vec<MessageActivity> = history
            .into_iter()
            .filter_map(|m| normalize_message(m, user_id))
            .filter(|m| window.contains(m.timestamp))
            .collect();

        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        messages.truncate(self.max_messages);
        debug!(channel, count = messages.len(), "collected Slack messages");
        messages
    }
}

/// Normalizes one raw message, dropping bot messages, subtyped events, and
/// messages from other senders.
fn normalize_message(message: SlackMessage, user_id: &str) -> Option<MessageActivity> {
    if message.bot_id.is_some() || message.subtype.is_some() {
        return None;
    }
    let sender = message.user?;
    if sender != user_id {
        return None;
    }
    let timestamp = parse_slack_ts(&message.ts)?;
    Some(MessageActivity {
        text: message.text,
        sender_id: sender,
        timestamp,
    })
}

/// Parses a Slack `ts` value (`"1717236000.000100"`) into a UTC timestamp.
/// The suffix after the dot is a uniqueness sequence, not sub-second
/// precision worth keeping.
fn parse_slack_ts(ts: &str) -> Option<DateTime<Utc>> {
    let seconds: i64 = ts.split('.').next()?.parse().ok()?;
    DateTime::from_timestamp(seconds, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn window() -> ActivityWindow {
        ActivityWindow::today_and_yesterday(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    fn collector(server: &MockServer, max: usize) -> SlackMessageCollector {
        SlackMessageCollector::new(
            SlackClient::new(server.uri(), "xoxb-test".to_string()),
            max,
        )
    }

    // 2024-06-01T10:00:00Z
    const IN_WINDOW_TS: &str = "1717236000.000100";

    #[tokio::test]
    async fn keeps_only_the_users_human_messages() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/conversations.history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "messages": [
                    {"user": "U1", "text": "shipped the retry fix", "ts": IN_WINDOW_TS},
                    {"user": "U2", "text": "someone else", "ts": IN_WINDOW_TS},
                    {"bot_id": "B1", "text": "build passed", "ts": IN_WINDOW_TS},
                    {"user": "U1", "subtype": "channel_join", "text": "joined", "ts": IN_WINDOW_TS}
                ]
            })))
            .mount(&server)
            .await;

        let messages = collector(&server, 30).collect("C123", "U1", &window()).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "shipped the retry fix");
        assert_eq!(messages[0].sender_id, "U1");
    }

    #[tokio::test]
    async fn history_failure_degrades_to_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/conversations.history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "error": "channel_not_found"
            })))
            .mount(&server)
            .await;

        let messages = collector(&server, 30).collect("C404", "U1", &window()).await;
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn results_are_capped_most_recent_first() {
        let server = MockServer::start().await;

        // 10:00, 10:01 and 10:02 on 2024-06-01.
        Mock::given(method("GET"))
            .and(path("/conversations.history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "messages": [
                    {"user": "U1", "text": "first", "ts": "1717236000.000100"},
                    {"user": "U1", "text": "second", "ts": "1717236060.000100"},
                    {"user": "U1", "text": "third", "ts": "1717236120.000100"}
                ]
            })))
            .mount(&server)
            .await;

        let messages = collector(&server, 2).collect("C123", "U1", &window()).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "third");
        assert_eq!(messages[1].text, "second");
    }

    #[test]
    fn slack_ts_parses_to_whole_seconds() {
        let ts = parse_slack_ts("1717236000.000100").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap());
        assert!(parse_slack_ts("not-a-ts").is_none());
    }
}
