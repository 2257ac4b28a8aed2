//! Slack Web API client
//!
//! Thin REST client over the Slack Web API methods the service needs:
//! workspace user directory, channel membership, channel history, and
//! direct messages with structured blocks. Slack wraps failures in an
//! `ok: false` envelope, so every call checks the envelope before
//! deserializing the payload.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Slack client specific errors
#[derive(Debug, Error)]
pub enum SlackError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Slack API call {method} failed: {error}")]
    ApiError { method: String, error: String },

    #[error("Malformed Slack response from {method}: {details}")]
    MalformedResponse { method: String, details: String },
}

/// A workspace user as returned by `users.list` / `users.info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub profile: SlackProfile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackProfile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
}

/// A channel message as returned by `conversations.history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackMessage {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: String,
    /// Slack timestamp, seconds since epoch with a sequence suffix
    /// (`"1717236000.000100"`)
    pub ts: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    rest: serde_json::Value,
}

/// Slack Web API client
#[derive(Debug, Clone)]
pub struct SlackClient {
    api_base: String,
    bot_token: String,
    http: reqwest::Client,
}

impl SlackClient {
    /// Create a new Slack client against the given API base URL
    pub fn new(api_base: String, bot_token: String) -> Self {
        Self {
            api_base,
            bot_token,
            http: reqwest::Client::new(),
        }
    }

    async fn call(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, SlackError> {
        let response = self
            .http
            .get(format!("{}/{}", self.api_base, method))
            .bearer_auth(&self.bot_token)
            .query(params)
            .send()
            .await?;

        let envelope: Envelope = response.json().await?;
        if !envelope.ok {
            return Err(SlackError::ApiError {
                method: method.to_string(),
                error: envelope.error.unwrap_or_else(|| "unknown_error".to_string()),
            });
        }
        Ok(envelope.rest)
    }

    async fn post(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, SlackError> {
        let response = self
            .http
            .post(format!("{}/{}", self.api_base, method))
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await?;

        let envelope: Envelope = response.json().await?;
        if !envelope.ok {
            return Err(SlackError::ApiError {
                method: method.to_string(),
                error: envelope.error.unwrap_or_else(|| "unknown_error".to_string()),
            });
        }
        Ok(envelope.rest)
    }

    /// Lists all workspace users, following pagination cursors.
    pub async fn users_list(&self) -> Result<Vec<SlackUser>, SlackError> {
        let mut members = Vec::new();
        let mut cursor: Option<String> = None;

        // Slack caps page size at 200; bound pages to keep directory scans finite.
        for _ in 0..50 {
            let mut params = vec![("limit", "200".to_string())];
            if let Some(ref c) = cursor {
                params.push(("cursor", c.clone()));
            }

            let rest = self.call("users.list", &params).await?;
            let page: Vec<SlackUser> = serde_json::from_value(
                rest.get("members").cloned().unwrap_or_default(),
            )
            .map_err(|e| SlackError::MalformedResponse {
                method: "users.list".to_string(),
                details: e.to_string(),
            })?;
            members.extend(page);

            cursor = rest
                .get("response_metadata")
                .and_then(|m| m.get("next_cursor"))
                .and_then(|c| c.as_str())
                .filter(|c| !c.is_empty())
                .map(|c| c.to_string());
            if cursor.is_none() {
                break;
            }
        }

        debug!(count = members.len(), "fetched Slack user directory");
        Ok(members)
    }

    /// Fetches a single user's profile.
    pub async fn user_info(&self, user_id: &str) -> Result<SlackUser, SlackError> {
        let rest = self
            .call("users.info", &[("user", user_id.to_string())])
            .await?;
        serde_json::from_value(rest.get("user").cloned().unwrap_or_default()).map_err(|e| {
            SlackError::MalformedResponse {
                method: "users.info".to_string(),
                details: e.to_string(),
            }
        })
    }

    /// Lists member user IDs of a channel.
    pub async fn conversations_members(&self, channel: &str) -> Result<Vec<String>, SlackError> {
        let rest = self
            .call(
                "conversations.members",
                &[("channel", channel.to_string()), ("limit", "200".to_string())],
            )
            .await?;
        serde_json::from_value(rest.get("members").cloned().unwrap_or_default()).map_err(|e| {
            SlackError::MalformedResponse {
                method: "conversations.members".to_string(),
                details: e.to_string(),
            }
        })
    }

    /// Fetches channel history between `oldest` and `latest` (epoch seconds).
    pub async fn conversations_history(
        &self,
        channel: &str,
        oldest: f64,
        latest: f64,
        limit: usize,
    ) -> Result<Vec<SlackMessage>, SlackError> {
        let rest = self
            .call(
                "conversations.history",
                &[
                    ("channel", channel.to_string()),
                    ("oldest", format!("{:.6}", oldest)),
                    ("latest", format!("{:.6}", latest)),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        serde_json::from_value(rest.get("messages").cloned().unwrap_or_default()).map_err(|e| {
            SlackError::MalformedResponse {
                method: "conversations.history".to_string(),
                details: e.to_string(),
            }
        })
    }

    /// Sends a direct message with optional Block Kit blocks.
    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        blocks: Option<serde_json::Value>,
    ) -> Result<(), SlackError> {
        let mut body = serde_json::json!({
            "channel": channel,
            "text": text,
        });
        if let Some(blocks) = blocks {
            body["blocks"] = blocks;
        }
        self.post("chat.postMessage", body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SlackClient {
        SlackClient::new(server.uri(), "xoxb-test".to_string())
    }

    #[tokio::test]
    async fn users_list_follows_pagination() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users.list"))
            .and(query_param("cursor", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "members": [{"id": "U2", "profile": {"email": "b@example.com"}}],
                "response_metadata": {"next_cursor": ""}
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/users.list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "members": [{"id": "U1", "is_bot": false, "profile": {"email": "a@example.com"}}],
                "response_metadata": {"next_cursor": "page2"}
            })))
            .mount(&server)
            .await;

        let users = client(&server).users_list().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, "U1");
        assert_eq!(users[1].id, "U2");
    }

    #[tokio::test]
    async fn error_envelope_becomes_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users.info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "error": "user_not_found"
            })))
            .mount(&server)
            .await;

        let err = client(&server).user_info("U404").await.unwrap_err();
        match err {
            SlackError::ApiError { method, error } => {
                assert_eq!(method, "users.info");
                assert_eq!(error, "user_not_found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn conversations_history_parses_messages() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/conversations.history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "messages": [
                    {"user": "U1", "text": "shipped the thing", "ts": "1717236000.000100"},
                    {"bot_id": "B1", "text": "build passed", "ts": "1717236100.000200"}
                ]
            })))
            .mount(&server)
            .await;

        let messages = client(&server)
            .conversations_history("C123", 1717200000.0, 1717286400.0, 100)
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].user.as_deref(), Some("U1"));
        assert_eq!(messages[1].bot_id.as_deref(), Some("B1"));
    }
}
