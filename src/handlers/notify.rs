//! Notification endpoint
//!
//! Triggers a channel-wide standup nudge. The dispatcher decides per user
//! whether to send a review or a write prompt, and the response reports
//! how many DMs were delivered and how many failed.

use axum::extract::State;
use axum::response::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::dispatcher::DispatchReport;
use crate::error::ApiError;
use crate::repositories::day_of;
use crate::server::AppState;

/// Request body for a channel-wide nudge.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NotifyRequest {
    pub channel: String,
    pub team_id: String,
    #[serde(default)]
    pub day: Option<NaiveDate>,
}

/// Nudges every human member of a channel about their recap
#[utoipa::path(
    post,
    path = "/notify",
    request_body = NotifyRequest,
    responses(
        (status = 200, description = "Dispatch outcome counts", body = DispatchReport)
    ),
    tag = "notify"
)]
pub async fn notify_channel(
    State(state): State<AppState>,
    Json(request): Json<NotifyRequest>,
) -> Result<Json<DispatchReport>, ApiError> {
    let day = request.day.unwrap_or_else(|| day_of(Utc::now()));
    let report = state
        .dispatcher
        .notify_channel(&request.channel, &request.team_id, day, &state.draft_cache)
        .await;
    Ok(Json(report))
}
