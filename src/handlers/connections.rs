//! Connection endpoints
//!
//! A connection row holds everything one Slack user has linked: Google
//! OAuth material, a GitHub token, and optional repository scoping. The
//! upsert keeps one row per `(slack_user_id, team_id)` and only patches
//! the fields present in the request, so connecting GitHub never clobbers
//! a previously linked Google account. Responses never echo tokens back.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::{IntoParams, ToSchema};

use crate::collectors::GoogleTokens;
use crate::error::{ApiError, ErrorType};
use crate::models::connection;
use crate::repositories::ConnectionPatch;
use crate::server::AppState;

/// Request body for creating or updating a connection.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertConnectionRequest {
    pub slack_user_id: String,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub slack_user_name: Option<String>,
    #[serde(default)]
    pub google_access_token: Option<String>,
    #[serde(default)]
    pub google_refresh_token: Option<String>,
    #[serde(default)]
    pub google_id_token: Option<String>,
    #[serde(default)]
    pub google_token_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub github_token: Option<String>,
    #[serde(default)]
    pub github_owner: Option<String>,
    #[serde(default)]
    pub github_repo: Option<String>,
}

/// Connection view returned to clients. Tokens stay server-side; only
/// linkage flags and the resolved Google email are exposed.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConnectionResponse {
    pub id: uuid::Uuid,
    pub slack_user_id: String,
    pub team_id: Option<String>,
    pub slack_user_name: Option<String>,
    pub google_connected: bool,
    pub google_email: Option<String>,
    pub github_connected: bool,
}

impl From<connection::Model> for ConnectionResponse {
    fn from(model: connection::Model) -> Self {
        Self {
            id: model.id,
            slack_user_id: model.slack_user_id,
            team_id: model.team_id,
            slack_user_name: model.slack_user_name,
            google_connected: model.google_access_token.is_some()
                || model.google_refresh_token.is_some(),
            google_email: model.google_email,
            github_connected: model.github_token.is_some(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TeamQuery {
    #[serde(default)]
    pub team_id: Option<String>,
}

/// Creates or updates the connection for a Slack user
#[utoipa::path(
    put,
    path = "/connections",
    request_body = UpsertConnectionRequest,
    responses(
        (status = 200, description = "Connection created or updated", body = ConnectionResponse),
        (status = 400, description = "Invalid request", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn upsert_connection(
    State(state): State<AppState>,
    Json(request): Json<UpsertConnectionRequest>,
) -> Result<Json<ConnectionResponse>, ApiError> {
    if request.slack_user_id.is_empty() {
        return Err(ErrorType::BadRequest.with_message("slack_user_id must not be empty"));
    }

    // Resolve the Google account email while we hold fresh tokens, so later
    // identity lookups work without a live token.
    let google_email = match (&request.google_id_token, &request.google_access_token) {
        (None, None) => None,
        (id_token, access_token) => {
            let tokens = GoogleTokens {
                access_token: access_token.clone(),
                id_token: id_token.clone(),
                ..Default::default()
            };
            match state.identity.google_account_email(&tokens).await {
                Ok(email) => Some(email),
                Err(e) => {
                    warn!(error = %e, "could not resolve Google account email at connect time");
                    None
                }
            }
        }
    };

    let patch = ConnectionPatch {
        slack_user_name: request.slack_user_name,
        google_access_token: request.google_access_token,
        google_refresh_token: request.google_refresh_token,
        google_id_token: request.google_id_token,
        google_email,
        google_token_expiry: request.google_token_expiry,
        github_token: request.github_token,
        github_owner: request.github_owner,
        github_repo: request.github_repo,
    };

    let model = state
        .connections
        .upsert(&request.slack_user_id, request.team_id.as_deref(), patch)
        .await?;
    Ok(Json(model.into()))
}

/// Fetches the connection for a Slack user
#[utoipa::path(
    get,
    path = "/connections/{slack_user_id}",
    params(
        ("slack_user_id" = String, Path, description = "Slack user ID"),
        TeamQuery
    ),
    responses(
        (status = 200, description = "Connection found", body = ConnectionResponse),
        (status = 404, description = "No connection for this user", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn get_connection(
    State(state): State<AppState>,
    Path(slack_user_id): Path<String>,
    Query(query): Query<TeamQuery>,
) -> Result<Json<ConnectionResponse>, ApiError> {
    let found = state
        .connections
        .find_by_user(&slack_user_id, query.team_id.as_deref())
        .await?;
    match found {
        Some(model) => Ok(Json(model.into())),
        None => Err(ErrorType::NotFound.with_message(format!(
            "no connection for Slack user {}",
            slack_user_id
        ))),
    }
}
