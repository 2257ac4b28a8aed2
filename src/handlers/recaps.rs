//! Recap lifecycle endpoints
//!
//! The full drafting chain lives behind `POST /recaps/generate`: look up
//! the user's connection, collect activity from every linked source over
//! the day window, render prompt context, summarize, and upsert the AI
//! draft for the day. User submission, draft claiming, status lookup, the
//! team report, and standup-script generation round out the lifecycle.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::aggregator::prompt_context;
use crate::collectors::ActivityWindow;
use crate::error::{ApiError, ErrorType};
use crate::models::daily_recap;
use crate::repositories::{RecapFields, RecapStatus, RecapTransition, day_of};
use crate::server::AppState;
use crate::summarizer::RecapDraft;

/// Recap view returned to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecapResponse {
    pub id: Uuid,
    pub user_id: String,
    pub team_id: String,
    pub day: NaiveDate,
    pub progress: String,
    pub blockers: String,
    pub plan: String,
    pub notes: Option<String>,
    pub is_ai_generated: bool,
}

impl From<daily_recap::Model> for RecapResponse {
    fn from(model: daily_recap::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            team_id: model.team_id,
            day: model.day,
            progress: model.progress,
            blockers: model.blockers,
            plan: model.plan,
            notes: model.notes,
            is_ai_generated: model.is_ai_generated,
        }
    }
}

/// Request body for generating an AI recap draft.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateRecapRequest {
    pub user_id: String,
    pub team_id: String,
    /// Channel whose history feeds the Slack collector; without it the
    /// Slack source contributes nothing.
    #[serde(default)]
    pub channel: Option<String>,
    /// Day to recap; defaults to a yesterday-and-today window ending now.
    #[serde(default)]
    pub day: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateRecapResponse {
    /// `drafted` or `no_activity`
    pub status: String,
    pub recap_id: Option<Uuid>,
    pub draft: Option<RecapDraft>,
}

/// Generates an AI recap draft from the user's linked sources
#[utoipa::path(
    post,
    path = "/recaps/generate",
    request_body = GenerateRecapRequest,
    responses(
        (status = 200, description = "Draft generated, or no activity found", body = GenerateRecapResponse),
        (status = 404, description = "No connection for this user", body = ApiError),
        (status = 502, description = "Summarization failed", body = ApiError)
    ),
    tag = "recaps"
)]
pub async fn generate_recap(
    State(state): State<AppState>,
    Json(request): Json<GenerateRecapRequest>,
) -> Result<Json<GenerateRecapResponse>, ApiError> {
    let conn = state
        .connections
        .find_by_user(&request.user_id, Some(&request.team_id))
        .await?
        .ok_or_else(|| {
            ErrorType::NotFound.with_message(format!(
                "no connection for Slack user {}",
                request.user_id
            ))
        })?;

    let (window, day) = match request.day {
        Some(day) => (ActivityWindow::single_day(day), day),
        None => {
            let now = Utc::now();
            (ActivityWindow::today_and_yesterday(now), day_of(now))
        }
    };

    let activity = state
        .aggregator
        .collect(&conn, request.channel.as_deref(), &window)
        .await;

    let Some(context) = prompt_context(&activity) else {
        info!(user_id = %request.user_id, %day, "no activity found, skipping draft");
        return Ok(Json(GenerateRecapResponse {
            status: "no_activity".to_string(),
            recap_id: None,
            draft: None,
        }));
    };

    let draft = state
        .summarizer
        .generate(&context)
        .await
        .map_err(|e| ErrorType::BadGateway.with_message(e.to_string()))?;

    let fields = RecapFields {
        progress: draft.progress.clone(),
        blockers: draft.blockers.clone(),
        plan: draft.plan.clone(),
        notes: None,
    };
    let recap_id = state
        .recaps
        .upsert(
            &request.user_id,
            &request.team_id,
            day,
            fields,
            RecapTransition::AiDraft,
        )
        .await?;

    state
        .draft_cache
        .insert(&request.user_id, &request.team_id, draft.clone())
        .await;
    metrics::counter!("recaps_drafted").increment(1);

    Ok(Json(GenerateRecapResponse {
        status: "drafted".to_string(),
        recap_id: Some(recap_id),
        draft: Some(draft),
    }))
}

/// Request body for submitting a recap.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitRecapRequest {
    pub user_id: String,
    pub team_id: String,
    #[serde(default)]
    pub day: Option<NaiveDate>,
    #[serde(default)]
    pub progress: String,
    #[serde(default)]
    pub blockers: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Submits a user-confirmed recap for the day
#[utoipa::path(
    post,
    path = "/recaps/submit",
    request_body = SubmitRecapRequest,
    responses(
        (status = 200, description = "Recap submitted", body = RecapResponse)
    ),
    tag = "recaps"
)]
pub async fn submit_recap(
    State(state): State<AppState>,
    Json(request): Json<SubmitRecapRequest>,
) -> Result<Json<RecapResponse>, ApiError> {
    let day = request.day.unwrap_or_else(|| day_of(Utc::now()));
    let fields = RecapFields {
        progress: request.progress,
        blockers: request.blockers,
        plan: request.plan,
        notes: request.notes,
    };
    let recap_id = state
        .recaps
        .upsert(
            &request.user_id,
            &request.team_id,
            day,
            fields,
            RecapTransition::UserSubmit,
        )
        .await?;

    // The submission supersedes any cached draft.
    state.draft_cache.take(&request.user_id, &request.team_id).await;
    metrics::counter!("recaps_submitted").increment(1);

    let model = state
        .recaps
        .find_by_id(&recap_id)
        .await?
        .ok_or_else(|| ErrorType::InternalServerError.with_message("recap not persisted"))?;
    Ok(Json(model.into()))
}

/// Request body for claiming a cached draft.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ClaimDraftRequest {
    pub user_id: String,
    pub team_id: String,
}

/// Claims the cached draft for review. The read is one-shot: a second
/// claim returns 404 until a new draft is generated.
#[utoipa::path(
    post,
    path = "/recaps/draft/claim",
    request_body = ClaimDraftRequest,
    responses(
        (status = 200, description = "Draft claimed", body = RecapDraft),
        (status = 404, description = "No cached draft", body = ApiError)
    ),
    tag = "recaps"
)]
pub async fn claim_draft(
    State(state): State<AppState>,
    Json(request): Json<ClaimDraftRequest>,
) -> Result<Json<RecapDraft>, ApiError> {
    match state
        .draft_cache
        .take(&request.user_id, &request.team_id)
        .await
    {
        Some(draft) => Ok(Json(draft)),
        None => Err(ErrorType::NotFound.with_message(format!(
            "no cached draft for user {}",
            request.user_id
        ))),
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StatusQuery {
    pub team_id: String,
    #[serde(default)]
    pub day: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecapStatusResponse {
    /// `empty`, `drafted` or `confirmed`
    pub status: String,
    pub recap: Option<RecapResponse>,
}

fn status_label(status: RecapStatus) -> &'static str {
    match status {
        RecapStatus::Empty => "empty",
        RecapStatus::Drafted => "drafted",
        RecapStatus::Confirmed => "confirmed",
    }
}

/// Returns the day lifecycle status of a user's recap
#[utoipa::path(
    get,
    path = "/recaps/{user_id}/status",
    params(
        ("user_id" = String, Path, description = "Slack user ID"),
        StatusQuery
    ),
    responses(
        (status = 200, description = "Recap status for the day", body = RecapStatusResponse)
    ),
    tag = "recaps"
)]
pub async fn recap_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<RecapStatusResponse>, ApiError> {
    let day = query.day.unwrap_or_else(|| day_of(Utc::now()));
    let status = state
        .recaps
        .status_for_day(&user_id, &query.team_id, day)
        .await?;
    let recap = state
        .recaps
        .find_for_day(&user_id, &query.team_id, day)
        .await?;
    Ok(Json(RecapStatusResponse {
        status: status_label(status).to_string(),
        recap: recap.map(Into::into),
    }))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReportQuery {
    #[serde(default)]
    pub day: Option<NaiveDate>,
}

/// A team's completion picture for one day.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamReportResponse {
    pub day: NaiveDate,
    pub submitted: Vec<RecapResponse>,
    /// Connected users with no recap row for the day
    pub missing: Vec<String>,
}

/// Returns a team's recaps and missing members for one day
#[utoipa::path(
    get,
    path = "/teams/{team_id}/report",
    params(
        ("team_id" = String, Path, description = "Slack team ID"),
        ReportQuery
    ),
    responses(
        (status = 200, description = "Team day report", body = TeamReportResponse)
    ),
    tag = "teams"
)]
pub async fn team_report(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<TeamReportResponse>, ApiError> {
    let day = query.day.unwrap_or_else(|| day_of(Utc::now()));
    let recaps = state.recaps.list_team_for_day(&team_id, day).await?;
    let connections = state.connections.find_by_team(&team_id).await?;

    let missing = connections
        .into_iter()
        .map(|c| c.slack_user_id)
        .filter(|user| !recaps.iter().any(|r| &r.user_id == user))
        .collect();

    Ok(Json(TeamReportResponse {
        day,
        submitted: recaps.into_iter().map(Into::into).collect(),
        missing,
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScriptResponse {
    pub recap_id: Uuid,
    pub script: String,
}

/// Generates a first-person standup script from a recap
#[utoipa::path(
    post,
    path = "/recaps/{recap_id}/script",
    params(
        ("recap_id" = Uuid, Path, description = "Recap ID")
    ),
    responses(
        (status = 200, description = "Script generated", body = ScriptResponse),
        (status = 404, description = "Recap not found", body = ApiError),
        (status = 502, description = "Script generation failed", body = ApiError)
    ),
    tag = "recaps"
)]
pub async fn generate_script(
    State(state): State<AppState>,
    Path(recap_id): Path<Uuid>,
) -> Result<Json<ScriptResponse>, ApiError> {
    let recap = state
        .recaps
        .find_by_id(&recap_id)
        .await?
        .ok_or_else(|| ErrorType::NotFound.with_message(format!("no recap {}", recap_id)))?;

    let script = state
        .summarizer
        .generate_script(&recap)
        .await
        .map_err(|e| ErrorType::BadGateway.with_message(e.to_string()))?;

    let persisted = state.scripts.upsert_for_recap(&recap_id, script).await?;
    Ok(Json(ScriptResponse {
        recap_id,
        script: persisted.script,
    }))
}
