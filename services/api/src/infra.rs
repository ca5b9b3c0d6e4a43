use disaster_triage::workflows::triage::{
    CollaboratorError, CollaboratorResponse, RepositoryError, ResearchCollaborator,
    ResearchRequest, SessionId, SessionRecord, SessionRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySessionRepository {
    records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl SessionRepository for InMemorySessionRepository {
    fn insert(&self, record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(record.id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id().clone(), record.clone());
        Ok(record)
    }

    fn modify<F, E>(&self, id: &SessionId, change: F) -> Result<SessionRecord, E>
    where
        F: FnOnce(&mut SessionRecord) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        let mut next = stored.clone();
        change(&mut next)?;
        *stored = next.clone();
        Ok(next)
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

/// Stand-in used by the HTTP service: no research backend ships with it, so
/// evidence has to be submitted directly.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct UnconfiguredCollaborator;

impl ResearchCollaborator for UnconfiguredCollaborator {
    fn research(
        &self,
        _request: &ResearchRequest,
    ) -> Result<CollaboratorResponse, CollaboratorError> {
        Err(CollaboratorError::Rejected(
            "no research backend configured; submit collaborator output to /api/v1/triage/sessions"
                .to_string(),
        ))
    }
}

/// Replays a collaborator response captured earlier, whatever the request.
#[derive(Debug, Clone)]
pub(crate) struct ReplayCollaborator {
    response: CollaboratorResponse,
}

impl ReplayCollaborator {
    pub(crate) fn new(response: CollaboratorResponse) -> Self {
        Self { response }
    }

    pub(crate) fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self::new(parse_saved_response(&raw)))
    }
}

impl ResearchCollaborator for ReplayCollaborator {
    fn research(
        &self,
        request: &ResearchRequest,
    ) -> Result<CollaboratorResponse, CollaboratorError> {
        debug!(query = %request.query, "replaying saved collaborator response");
        Ok(self.response.clone())
    }
}

/// A saved response is either an envelope (`{"text": ..., "grounding_urls": [...]}`)
/// or the collaborator's raw text.
pub(crate) fn parse_saved_response(raw: &str) -> CollaboratorResponse {
    match serde_json::from_str::<CollaboratorResponse>(raw) {
        Ok(envelope) if envelope.text.is_some() => envelope,
        _ => CollaboratorResponse::from_text(raw),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScoreOverride {
    pub(crate) indicator: String,
    pub(crate) score: i64,
}

/// Parse `<indicator>=<score>`; the indicator may itself contain `=`.
pub(crate) fn parse_override(raw: &str) -> Result<ScoreOverride, String> {
    let (indicator, score) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected <indicator>=<score>, got '{raw}'"))?;
    let indicator = indicator.trim();
    if indicator.is_empty() {
        return Err(format!("missing indicator in '{raw}'"));
    }
    let score = score
        .trim()
        .parse::<i64>()
        .map_err(|err| format!("invalid score in '{raw}' ({err})"))?;
    Ok(ScoreOverride {
        indicator: indicator.to_string(),
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use disaster_triage::workflows::triage::AssessmentSession;

    #[test]
    fn saved_envelope_keeps_grounding_urls() {
        let raw = r#"{"text": "{\"scores\": {}}", "grounding_urls": ["https://reliefweb.int/r"]}"#;
        let response = parse_saved_response(raw);
        assert_eq!(response.text.as_deref(), Some("{\"scores\": {}}"));
        assert_eq!(response.grounding_urls.len(), 1);
    }

    #[test]
    fn bare_payload_is_treated_as_text() {
        let raw = r#"{"summary": {"title": "Floods"}, "scores": {}}"#;
        let response = parse_saved_response(raw);
        assert_eq!(response.text.as_deref(), Some(raw));
        assert!(response.grounding_urls.is_empty());
    }

    #[test]
    fn override_argument_parsing() {
        assert_eq!(
            parse_override("1.2 Fatalities=5"),
            Ok(ScoreOverride {
                indicator: "1.2 Fatalities".to_string(),
                score: 5,
            })
        );
        let spaced = parse_override(" 3.2 Security = 2 ").expect("spaced override parses");
        assert_eq!(spaced.indicator, "3.2 Security");
        assert_eq!(spaced.score, 2);
        assert!(parse_override("1.2 Fatalities").is_err());
        assert!(parse_override("=4").is_err());
        assert!(parse_override("1.2 Fatalities=high").is_err());
    }

    #[test]
    fn modify_requires_existing_session() {
        let repository = InMemorySessionRepository::default();
        let id = SessionId("triage-x".to_string());
        let record = SessionRecord::new(AssessmentSession::new(id.clone()), chrono::Utc::now());

        let missing = repository.modify(&id, |_| Ok::<(), RepositoryError>(()));
        assert!(matches!(missing, Err(RepositoryError::NotFound)));

        repository.insert(record.clone()).expect("insert");
        assert!(matches!(
            repository.insert(record),
            Err(RepositoryError::Conflict)
        ));
    }

    #[test]
    fn failed_modification_leaves_the_record_alone() {
        let repository = InMemorySessionRepository::default();
        let id = SessionId("triage-y".to_string());
        repository
            .insert(SessionRecord::new(AssessmentSession::new(id.clone()), chrono::Utc::now()))
            .expect("insert");

        let result = repository.modify(&id, |record| {
            record.session.query = Some("discarded".to_string());
            Err(RepositoryError::Unavailable("write aborted".to_string()))
        });
        assert!(matches!(result, Err(RepositoryError::Unavailable(_))));

        let stored = repository.fetch(&id).expect("fetch").expect("present");
        assert!(stored.session.query.is_none());
    }
}
