use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::triage::repository::{RepositoryError, SessionRecord, SessionRepository};
use crate::workflows::triage::research::{
    CollaboratorError, CollaboratorResponse, ResearchCollaborator, ResearchRequest,
};
use crate::workflows::triage::rubric::Rubric;
use crate::workflows::triage::session::SessionId;
use crate::workflows::triage::{triage_router, TriageService};

pub(super) const GROUNDING_URL: &str = "https://reliefweb.int/report/sri-lanka/cyclone-ditwah";

/// Collaborator output shaped the way the live model tends to answer:
/// fenced, with a shorthand key and a textual score.
pub(super) fn cyclone_response_text() -> String {
    r#"```json
{
  "summary": {
    "title": "Cyclone Ditwah",
    "country": "Sri Lanka",
    "date": "2025-12-02",
    "description": "Severe flooding and landslides across central districts."
  },
  "key_figures": {
    "affected": {"value": "1,200,000", "date": "2025-12-02", "source": "DMC", "url": "..."},
    "fatalities": {"value": "410", "date": "2025-12-02", "source": "Reuters", "url": "https://www.reuters.com/world/asia-pacific/ditwah"}
  },
  "scores": {
    "1.1 People Affected": {"score": 5, "extracted_value": "1.2 million", "justification": "Over a million affected", "source_urls": ["https://reliefweb.int/a"]},
    "1.2 Fatalities": {"score": "4 (High)", "extracted_value": "410 deaths"},
    "Displacement": {"score": 4.0},
    "4.3 Internal Interest (Tzu Chi)": {"score": 5},
    "Tourism Impact": {"score": 2}
  }
}
```"#
    .to_string()
}

pub(super) fn cyclone_response() -> CollaboratorResponse {
    CollaboratorResponse::from_text(cyclone_response_text()).with_grounding_urls(vec![
        GROUNDING_URL.to_string(),
        GROUNDING_URL.to_string(),
        "https://news.un.org/en/story/ditwah".to_string(),
        "https://www.bbc.com/news/ditwah".to_string(),
        "https://apnews.com/ditwah".to_string(),
    ])
}

pub(super) fn build_service(
    collaborator: ScriptedCollaborator,
) -> (
    TriageService<MemoryRepository, ScriptedCollaborator>,
    Arc<MemoryRepository>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let service = TriageService::new(
        repository.clone(),
        Arc::new(collaborator),
        Arc::new(Rubric::standard()),
    );
    (service, repository)
}

pub(super) fn router_with_service(
    service: TriageService<MemoryRepository, ScriptedCollaborator>,
) -> axum::Router {
    triage_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl SessionRepository for MemoryRepository {
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

pub(super) struct UnavailableRepository;

impl SessionRepository for UnavailableRepository {
    fn insert(&self, _record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn modify<F, E>(&self, _id: &SessionId, _change: F) -> Result<SessionRecord, E>
    where
        F: FnOnce(&mut SessionRecord) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()).into())
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Replays queued results in order; an exhausted queue reports a transport failure.
#[derive(Default)]
pub(super) struct ScriptedCollaborator {
    queue: Mutex<Vec<Result<CollaboratorResponse, CollaboratorError>>>,
    requests: Mutex<Vec<ResearchRequest>>,
}

impl ScriptedCollaborator {
    pub(super) fn replying(
        results: Vec<Result<CollaboratorResponse, CollaboratorError>>,
    ) -> Self {
        let mut queue = results;
        queue.reverse();
        Self {
            queue: Mutex::new(queue),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn requests(&self) -> Vec<ResearchRequest> {
        self.requests
            .lock()
            .expect("collaborator mutex poisoned")
            .clone()
    }
}

impl ResearchCollaborator for ScriptedCollaborator {
    fn research(
        &self,
        request: &ResearchRequest,
    ) -> Result<CollaboratorResponse, CollaboratorError> {
        self.requests
            .lock()
            .expect("collaborator mutex poisoned")
            .push(request.clone());
        self.queue
            .lock()
            .expect("collaborator mutex poisoned")
            .pop()
            .unwrap_or_else(|| Err(CollaboratorError::Transport("no scripted reply".to_string())))
    }
}
