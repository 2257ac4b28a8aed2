//! Cross-service identity resolution
//!
//! Links the same person across Slack and Google. Slack lookups match by
//! email, case-insensitively, against the workspace directory. The Google
//! account email is read from the ID token's claim set locally first, with
//! a userinfo request as fallback so a claim-less token still resolves.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use thiserror::Error;
use tracing::{debug, warn};

use crate::collectors::GoogleTokens;
use crate::slack::{SlackClient, SlackError};

/// Identity resolution specific errors
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Slack error: {0}")]
    Slack(#[from] SlackError),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("No Google credentials available to resolve an email")]
    NoGoogleCredentials,
}

/// Resolves users across Slack and Google.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    slack: SlackClient,
    userinfo_base: String,
    http: reqwest::Client,
}

impl IdentityResolver {
    pub fn new(slack: SlackClient, userinfo_base: String) -> Self {
        Self {
            slack,
            userinfo_base,
            http: reqwest::Client::new(),
        }
    }

    /// Finds the Slack user ID whose profile email matches, ignoring case.
    pub async fn resolve_email_to_user(&self, email: &str) -> Result<Option<String>, IdentityError> {
        let users = self.slack.users_list().await?;
        let found = users.into_iter().find(|u| {
            u.profile
                .email
                .as_deref()
                .map(|e| e.eq_ignore_ascii_case(email))
                .unwrap_or(false)
        });
        if found.is_none() {
            debug!(email, "no Slack user with a matching profile email");
        }
        Ok(found.map(|u| u.id))
    }

    /// Returns the profile email of a Slack user, if set.
    pub async fn resolve_user_to_email(&self, user_id: &str) -> Result<Option<String>, IdentityError> {
        let user = self.slack.user_info(user_id).await?;
        Ok(user.profile.email)
    }

    /// Resolves the email of the Google account behind `tokens`.
    ///
    /// Prefers the `email` claim embedded in the ID token, which avoids a
    /// network round trip. Falls back to the userinfo endpoint with the
    /// access token when the claim is absent or unreadable.
    pub async fn google_account_email(&self, tokens: &GoogleTokens) -> Result<String, IdentityError> {
        if let Some(ref id_token) = tokens.id_token {
            if let Some(email) = email_claim(id_token) {
                return Ok(email);
            }
            warn!("ID token carried no readable email claim, falling back to userinfo");
        }

        let access_token = tokens
            .access_token
            .as_deref()
            .ok_or(IdentityError::NoGoogleCredentials)?;
        let userinfo: Userinfo = self
            .http
            .get(format!("{}/oauth2/v2/userinfo", self.userinfo_base))
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(userinfo.email)
    }
}

/// Extracts the `email` claim from a JWT payload without verifying the
/// signature. The token came straight from Google over TLS during the
/// OAuth exchange; this read is for identity linking, not authentication.
fn email_claim(id_token: &str) -> Option<String> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims
        .get("email")
        .and_then(|e| e.as_str())
        .map(|e| e.to_string())
}

#[derive(Debug, serde::Deserialize)]
struct Userinfo {
    email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn id_token_with(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        format!("{header}.{payload}.sig")
    }

    fn resolver(server: &MockServer) -> IdentityResolver {
        IdentityResolver::new(
            SlackClient::new(server.uri(), "xoxb-test".to_string()),
            server.uri(),
        )
    }

    #[test]
    fn email_claim_is_read_from_the_payload_segment() {
        let token = id_token_with(serde_json::json!({"sub": "123", "email": "dev@example.com"}));
        assert_eq!(email_claim(&token).as_deref(), Some("dev@example.com"));
        assert!(email_claim("garbage").is_none());
        assert!(email_claim(&id_token_with(serde_json::json!({"sub": "123"}))).is_none());
    }

    #[tokio::test]
    async fn email_lookup_ignores_case() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users.list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "members": [
                    {"id": "U1", "profile": {"email": "Dev@Example.com"}},
                    {"id": "U2", "profile": {"email": "other@example.com"}}
                ],
                "response_metadata": {"next_cursor": ""}
            })))
            .mount(&server)
            .await;

        let found = resolver(&server)
            .resolve_email_to_user("dev@example.COM")
            .await
            .unwrap();
        assert_eq!(found.as_deref(), Some("U1"));
    }

    #[tokio::test]
    async fn id_token_claim_avoids_the_userinfo_call() {
        let server = MockServer::start().await;
        // No userinfo mock mounted: a request there would 404 the test.

        let tokens = GoogleTokens {
            id_token: Some(id_token_with(serde_json::json!({"email": "dev@example.com"}))),
            ..Default::default()
        };
        let email = resolver(&server).google_account_email(&tokens).await.unwrap();
        assert_eq!(email, "dev@example.com");
    }

    #[tokio::test]
    async fn claimless_token_falls_back_to_userinfo() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/oauth2/v2/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "email": "dev@example.com",
                "verified_email": true
            })))
            .mount(&server)
            .await;

        let tokens = GoogleTokens {
            id_token: Some(id_token_with(serde_json::json!({"sub": "123"}))),
            access_token: Some("ya29.live".to_string()),
            ..Default::default()
        };
        let email = resolver(&server).google_account_email(&tokens).await.unwrap();
        assert_eq!(email, "dev@example.com");
    }
}
