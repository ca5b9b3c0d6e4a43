use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::triage::export::ExportError;
use crate::workflows::triage::{TriageError, TriageServiceError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Triage(TriageError),
    Service(TriageServiceError),
    Export(ExportError),
    Render(serde_json::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Triage(err) => write!(f, "assessment error: {}", err),
            AppError::Service(err) => write!(f, "assessment error: {}", err),
            AppError::Export(err) => write!(f, "export error: {}", err),
            AppError::Render(err) => write!(f, "render error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Triage(err) => Some(err),
            AppError::Service(err) => Some(err),
            AppError::Export(err) => Some(err),
            AppError::Render(err) => Some(err),
        }
    }
}

impl AppError {
    fn triage(&self) -> Option<&TriageError> {
        match self {
            AppError::Triage(err) | AppError::Service(TriageServiceError::Triage(err)) => Some(err),
            _ => None,
        }
    }
}

fn triage_status(err: &TriageError) -> StatusCode {
    match err {
        TriageError::CollaboratorUnavailable { .. } => StatusCode::BAD_GATEWAY,
        TriageError::MalformedEvidence { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TriageError::InvalidOverride { .. } | TriageError::UnknownIndicator(_) => {
            StatusCode::BAD_REQUEST
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Triage(err) | AppError::Service(TriageServiceError::Triage(err)) => {
                triage_status(err)
            }
            AppError::Export(ExportError::NotAssessed) => StatusCode::CONFLICT,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Service(TriageServiceError::Repository(_))
            | AppError::Export(_)
            | AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match self.triage().and_then(TriageError::excerpt) {
            Some(excerpt) => json!({ "error": self.to_string(), "excerpt": excerpt }),
            None => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<TriageError> for AppError {
    fn from(value: TriageError) -> Self {
        Self::Triage(value)
    }
}

impl From<TriageServiceError> for AppError {
    fn from(value: TriageServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<ExportError> for AppError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Render(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_evidence_maps_to_unprocessable() {
        let err = AppError::from(TriageError::MalformedEvidence {
            reason: "no JSON object found".to_string(),
            excerpt: "No data found".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn collaborator_outage_maps_to_bad_gateway() {
        let err = AppError::from(TriageServiceError::Triage(
            TriageError::CollaboratorUnavailable {
                reason: "timeout".to_string(),
            },
        ));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn render_failures_are_internal() {
        let source = serde_json::from_str::<serde_json::Value>("{").expect_err("truncated json");
        let err = AppError::from(source);
        assert!(err.to_string().starts_with("render error:"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn config_errors_are_internal() {
        let err = AppError::from(ConfigError::InvalidPort);
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
