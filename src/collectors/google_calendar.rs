//! Google Calendar event collector
//!
//! Fetches the user's primary-calendar events inside the day window and
//! normalizes them into [`EventActivity`] records. Access tokens are
//! refreshed through the OAuth token endpoint when expired; all-day events
//! carry a date-only start and are flagged as such.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::collectors::window::ActivityWindow;

/// Google collector specific errors
#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("API request failed with status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("No usable Google credentials: {0}")]
    MissingCredentials(String),
}

/// The Google OAuth material stored on a connection.
#[derive(Debug, Clone, Default)]
pub struct GoogleTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
}

/// A normalized calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventActivity {
    pub title: String,
    /// Midnight UTC for all-day events
    pub start_time: DateTime<Utc>,
    pub is_all_day: bool,
}

/// Google Calendar event collector
#[derive(Debug, Clone)]
pub struct GoogleCalendarCollector {
    token_base: String,
    api_base: String,
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
    max_events: usize,
}

impl GoogleCalendarCollector {
    pub fn new(
        token_base: String,
        api_base: String,
        client_id: String,
        client_secret: String,
        max_events: usize,
    ) -> Self {
        Self {
            token_base,
            api_base,
            client_id,
            client_secret,
            http: reqwest::Client::new(),
            max_events,
        }
    }

    /// Collects the user's primary-calendar events inside the window.
    ///
    /// Degrades to an empty sequence when credentials are unusable or the
    /// events fetch fails. Results are earliest-first and capped at
    /// `max_events`.
    pub async fn collect(&self, tokens: &GoogleTokens, window: &ActivityWindow) -> Vec<EventActivity> {
        let access_token = match self.usable_access_token(tokens).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "could not obtain Google access token, skipping event collection");
                return Vec::new();
            }
        };

        let events = match self.primary_events(&access_token, window).await {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "could not fetch calendar events, skipping event collection");
                return Vec::new();
            }
        };

        let mut events: Vec<EventActivity> = events
            .into_iter()
            .filter_map(normalize_event)
            .filter(|e| in_window(e, window))
            .collect();

        events.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        events.truncate(self.max_events);
        debug!(count = events.len(), "collected calendar events");
        events
    }

    /// Returns a live access token, refreshing through the token endpoint
    /// when the stored one is expired or about to expire.
    async fn usable_access_token(&self, tokens: &GoogleTokens) -> Result<String, GoogleError> {
        let expired = tokens
            .expiry
            .map(|e| e <= Utc::now() + chrono::Duration::seconds(60))
            .unwrap_or(false);

        if let Some(ref access_token) = tokens.access_token {
            if !expired {
                return Ok(access_token.clone());
            }
        }

        let refresh_token = tokens.refresh_token.as_deref().ok_or_else(|| {
            GoogleError::MissingCredentials("access token expired and no refresh token".to_string())
        })?;
        self.refresh_access_token(refresh_token).await
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, GoogleError> {
        let response = self
            .http
            .post(format!("{}/token", self.token_base))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if response.status().is_success() {
            let refreshed: TokenResponse = response.json().await?;
            Ok(refreshed.access_token)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(GoogleError::ApiError {
                status,
                message: format!("Token refresh failed: {}", body),
            })
        }
    }

    async fn primary_events(
        &self,
        access_token: &str,
        window: &ActivityWindow,
    ) -> Result<Vec<GoogleEvent>, GoogleError> {
        let response = self
            .http
            .get(format!("{}/calendars/primary/events", self.api_base))
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", window.start().to_rfc3339()),
                ("timeMax", window.end_exclusive().to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", "250".to_string()),
            ])
            .send()
            .await?;

        if response.status().is_success() {
            let page: EventsPage = response.json().await?;
            Ok(page.items)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(GoogleError::ApiError {
                status,
                message: format!("Failed to fetch events: {}", body),
            })
        }
    }
}

/// Normalizes one upstream event. Cancelled events and events with no
/// usable start are dropped.
fn normalize_event(event: GoogleEvent) -> Option<EventActivity> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }
    let start = event.start?;
    if let Some(date_time) = start.date_time {
        return Some(EventActivity {
            title: event.summary.unwrap_or_else(|| "(no title)".to_string()),
            start_time: date_time.with_timezone(&Utc),
            is_all_day: false,
        });
    }
    let date: NaiveDate = start.date?;
    Some(EventActivity {
        title: event.summary.unwrap_or_else(|| "(no title)".to_string()),
        start_time: date.and_hms_opt(0, 0, 0)?.and_utc(),
        is_all_day: true,
    })
}

fn in_window(event: &EventActivity, window: &ActivityWindow) -> bool {
    // All-day starts are already dates; both paths reduce to date equality.
    window.contains(event.start_time)
}

// Google API response types

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct EventsPage {
    #[serde(default)]
    items: Vec<GoogleEvent>,
}

#[derive(Debug, Deserialize)]
struct GoogleEvent {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    start: Option<GoogleEventTime>,
}

#[derive(Debug, Deserialize)]
struct GoogleEventTime {
    #[serde(rename = "dateTime", default)]
    date_time: Option<DateTime<chrono::FixedOffset>>,
    #[serde(default)]
    date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn window() -> ActivityWindow {
        ActivityWindow::today_and_yesterday(Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap())
    }

    fn collector(server: &MockServer) -> GoogleCalendarCollector {
        GoogleCalendarCollector::new(
            server.uri(),
            server.uri(),
            "client-id".to_string(),
            "client-secret".to_string(),
            15,
        )
    }

    fn live_tokens() -> GoogleTokens {
        GoogleTokens {
            access_token: Some("ya29.live".to_string()),
            expiry: Some(Utc::now() + chrono::Duration::hours(1)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn timed_and_all_day_events_are_normalized() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"summary": "Sprint review", "start": {"dateTime": "2025-06-02T14:00:00+02:00"}},
                    {"summary": "Company offsite", "start": {"date": "2025-06-02"}},
                    {"summary": "Cancelled sync", "status": "cancelled",
                     "start": {"dateTime": "2025-06-02T10:00:00Z"}}
                ]
            })))
            .mount(&server)
            .await;

        let events = collector(&server).collect(&live_tokens(), &window()).await;

        assert_eq!(events.len(), 2);
        assert!(events[0].is_all_day);
        assert_eq!(events[0].title, "Company offsite");
        assert_eq!(
            events[1].start_time,
            Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
        );
        assert!(!events[1].is_all_day);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_before_fetching() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.fresh",
                "expires_in": 3599
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(wiremock::matchers::header("Authorization", "Bearer ya29.fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"summary": "1:1", "start": {"dateTime": "2025-06-02T09:00:00Z"}}
                ]
            })))
            .mount(&server)
            .await;

        let tokens = GoogleTokens {
            access_token: Some("ya29.stale".to_string()),
            refresh_token: Some("1//refresh".to_string()),
            expiry: Some(Utc::now() - chrono::Duration::hours(1)),
            ..Default::default()
        };
        let events = collector(&server).collect(&tokens, &window()).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "1:1");
    }

    #[tokio::test]
    async fn missing_credentials_degrade_to_empty() {
        let server = MockServer::start().await;

        let tokens = GoogleTokens {
            access_token: Some("ya29.stale".to_string()),
            expiry: Some(Utc::now() - chrono::Duration::hours(1)),
            ..Default::default()
        };
        let events = collector(&server).collect(&tokens, &window()).await;
        assert!(events.is_empty());
    }
}
