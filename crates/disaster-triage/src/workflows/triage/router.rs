use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::repository::{RepositoryError, SessionRepository};
use super::research::{CollaboratorResponse, ResearchCollaborator, ResearchRequest};
use super::scoring::ScoreComponent;
use super::service::{TriageService, TriageServiceError};
use super::session::SessionId;
use super::views::ResultView;
use super::TriageError;

/// Router builder exposing rubric, scoring and session endpoints.
pub fn triage_router<R, C>(service: Arc<TriageService<R, C>>) -> Router
where
    R: SessionRepository + 'static,
    C: ResearchCollaborator + 'static,
{
    Router::new()
        .route("/api/v1/triage/rubric", get(rubric_handler::<R, C>))
        .route("/api/v1/triage/score", post(score_handler::<R, C>))
        .route("/api/v1/triage/research", post(research_handler::<R, C>))
        .route("/api/v1/triage/sessions", post(ingest_handler::<R, C>))
        .route(
            "/api/v1/triage/sessions/:session_id",
            get(session_handler::<R, C>),
        )
        .route(
            "/api/v1/triage/sessions/:session_id/research",
            post(refresh_handler::<R, C>),
        )
        .route(
            "/api/v1/triage/sessions/:session_id/overrides",
            post(override_handler::<R, C>),
        )
        .with_state(service)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoreRequest {
    #[serde(default)]
    pub scores: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreResponse {
    pub result: ResultView,
    pub components: Vec<ScoreComponent>,
}

/// Raw collaborator output submitted for ingestion.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(flatten)]
    pub response: CollaboratorResponse,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OverrideRequest {
    pub indicator: String,
    pub score: i64,
}

pub(crate) async fn rubric_handler<R, C>(
    State(service): State<Arc<TriageService<R, C>>>,
) -> Response
where
    R: SessionRepository + 'static,
    C: ResearchCollaborator + 'static,
{
    (StatusCode::OK, axum::Json(service.rubric())).into_response()
}

pub(crate) async fn score_handler<R, C>(
    State(service): State<Arc<TriageService<R, C>>>,
    axum::Json(request): axum::Json<ScoreRequest>,
) -> Response
where
    R: SessionRepository + 'static,
    C: ResearchCollaborator + 'static,
{
    match service.score(request.scores) {
        Ok(result) => {
            let payload = ScoreResponse {
                result: ResultView::from(&result),
                components: result.components,
            };
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn research_handler<R, C>(
    State(service): State<Arc<TriageService<R, C>>>,
    axum::Json(request): axum::Json<ResearchRequest>,
) -> Response
where
    R: SessionRepository + 'static,
    C: ResearchCollaborator + 'static,
{
    match service.start(&request) {
        Ok(record) => {
            let view = record.session.view(service.rubric());
            (StatusCode::ACCEPTED, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn ingest_handler<R, C>(
    State(service): State<Arc<TriageService<R, C>>>,
    axum::Json(request): axum::Json<IngestRequest>,
) -> Response
where
    R: SessionRepository + 'static,
    C: ResearchCollaborator + 'static,
{
    match service.ingest(request.query, request.response) {
        Ok(record) => {
            let view = record.session.view(service.rubric());
            (StatusCode::ACCEPTED, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn session_handler<R, C>(
    State(service): State<Arc<TriageService<R, C>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    C: ResearchCollaborator + 'static,
{
    match service.get(&SessionId(session_id)) {
        Ok(record) => {
            let view = record.session.view(service.rubric());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn refresh_handler<R, C>(
    State(service): State<Arc<TriageService<R, C>>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<ResearchRequest>,
) -> Response
where
    R: SessionRepository + 'static,
    C: ResearchCollaborator + 'static,
{
    match service.refresh(&SessionId(session_id), &request) {
        Ok(record) => {
            let view = record.session.view(service.rubric());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn override_handler<R, C>(
    State(service): State<Arc<TriageService<R, C>>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<OverrideRequest>,
) -> Response
where
    R: SessionRepository + 'static,
    C: ResearchCollaborator + 'static,
{
    match service.override_score(&SessionId(session_id), &request.indicator, request.score) {
        Ok(record) => {
            let view = record.session.view(service.rubric());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

fn error_response(err: TriageServiceError) -> Response {
    let status = match &err {
        TriageServiceError::Triage(TriageError::CollaboratorUnavailable { .. }) => {
            StatusCode::BAD_GATEWAY
        }
        TriageServiceError::Triage(TriageError::MalformedEvidence { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        TriageServiceError::Triage(
            TriageError::InvalidOverride { .. } | TriageError::UnknownIndicator(_),
        ) => StatusCode::BAD_REQUEST,
        TriageServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        TriageServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        TriageServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = match &err {
        TriageServiceError::Triage(triage) if triage.excerpt().is_some() => json!({
            "error": err.to_string(),
            "excerpt": triage.excerpt(),
        }),
        _ => json!({
            "error": err.to_string(),
        }),
    };

    (status, axum::Json(payload)).into_response()
}
