//! # Server Configuration
//!
//! This module contains the server setup and configuration for the
//! Standup Recap API.

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::aggregator::Aggregator;
use crate::collectors::{GitHubCollector, GoogleCalendarCollector, SlackMessageCollector};
use crate::config::AppConfig;
use crate::dispatcher::{Dispatcher, DraftCache};
use crate::handlers;
use crate::identity::IdentityResolver;
use crate::repositories::{ConnectionRepository, RecapRepository, RecapScriptRepository};
use crate::slack::SlackClient;
use crate::summarizer::Summarizer;
use crate::telemetry::{self, TraceContext};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub connections: ConnectionRepository,
    pub recaps: RecapRepository,
    pub scripts: RecapScriptRepository,
    pub aggregator: Arc<Aggregator>,
    pub summarizer: Arc<Summarizer>,
    pub dispatcher: Arc<Dispatcher>,
    pub identity: Arc<IdentityResolver>,
    pub draft_cache: Arc<DraftCache>,
}

impl AppState {
    /// Wires the repositories, upstream clients, and core services from
    /// configuration. Missing credentials (local profile) yield clients
    /// with empty secrets; calls through them fail upstream and degrade
    /// per the collectors' contracts.
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Self {
        let db = Arc::new(db);
        let connections = ConnectionRepository::new(db.clone());
        let recaps = RecapRepository::new(db.clone());
        let scripts = RecapScriptRepository::new(db);

        let slack = SlackClient::new(
            config.slack_api_base.clone(),
            config.slack_bot_token.clone().unwrap_or_default(),
        );
        let aggregator = Aggregator::new(
            GitHubCollector::new(
                config.github_api_base.clone(),
                config.collectors.max_repos,
                config.collectors.max_commits,
            ),
            SlackMessageCollector::new(slack.clone(), config.collectors.max_messages),
            GoogleCalendarCollector::new(
                config.google_token_base.clone(),
                config.google_calendar_api_base.clone(),
                config.google_client_id.clone().unwrap_or_default(),
                config.google_client_secret.clone().unwrap_or_default(),
                config.collectors.max_events,
            ),
        );
        let summarizer = Summarizer::new(
            config.llm_api_base.clone(),
            config.llm_api_key.clone().unwrap_or_default(),
            config.llm_model.clone(),
        );
        let dispatcher = Dispatcher::new(slack.clone(), recaps.clone());
        let identity = IdentityResolver::new(slack, config.google_userinfo_base.clone());

        Self {
            config,
            connections,
            recaps,
            scripts,
            aggregator: Arc::new(aggregator),
            summarizer: Arc::new(summarizer),
            dispatcher: Arc::new(dispatcher),
            identity: Arc::new(identity),
            draft_cache: Arc::new(DraftCache::new()),
        }
    }
}

/// Attaches a fresh trace ID to each request so error responses and logs
/// correlate.
async fn with_request_trace(request: Request, next: Next) -> Response {
    let trace_id = uuid::Uuid::new_v4().to_string();
    telemetry::with_trace_context(TraceContext { trace_id }, next.run(request)).await
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/connections", put(handlers::connections::upsert_connection))
        .route(
            "/connections/{slack_user_id}",
            get(handlers::connections::get_connection),
        )
        .route("/recaps/generate", post(handlers::recaps::generate_recap))
        .route("/recaps/submit", post(handlers::recaps::submit_recap))
        .route("/recaps/draft/claim", post(handlers::recaps::claim_draft))
        .route("/recaps/{user_id}/status", get(handlers::recaps::recap_status))
        .route(
            "/recaps/{recap_id}/script",
            post(handlers::recaps::generate_script),
        )
        .route("/teams/{team_id}/report", get(handlers::recaps::team_report))
        .route("/notify", post(handlers::notify::notify_channel))
        .layer(middleware::from_fn(with_request_trace))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    // Resolve the configured bind address
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;
    let profile = config.profile.clone();

    let state = AppState::new(config, db);
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::connections::upsert_connection,
        crate::handlers::connections::get_connection,
        crate::handlers::recaps::generate_recap,
        crate::handlers::recaps::submit_recap,
        crate::handlers::recaps::claim_draft,
        crate::handlers::recaps::recap_status,
        crate::handlers::recaps::generate_script,
        crate::handlers::recaps::team_report,
        crate::handlers::notify::notify_channel,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::connections::UpsertConnectionRequest,
            crate::handlers::connections::ConnectionResponse,
            crate::handlers::recaps::GenerateRecapRequest,
            crate::handlers::recaps::GenerateRecapResponse,
            crate::handlers::recaps::SubmitRecapRequest,
            crate::handlers::recaps::ClaimDraftRequest,
            crate::handlers::recaps::RecapResponse,
            crate::handlers::recaps::RecapStatusResponse,
            crate::handlers::recaps::TeamReportResponse,
            crate::handlers::recaps::ScriptResponse,
            crate::handlers::notify::NotifyRequest,
            crate::dispatcher::DispatchReport,
            crate::summarizer::RecapDraft,
        )
    ),
    info(
        title = "Standup Recap API",
        description = "API for drafting, submitting and dispatching daily standup recaps",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
