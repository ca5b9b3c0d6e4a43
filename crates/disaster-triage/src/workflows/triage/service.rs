use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::repository::{RepositoryError, SessionRecord, SessionRepository};
use super::research::{
    default_target_sources, CollaboratorResponse, ResearchCollaborator, ResearchRequest,
};
use super::rubric::Rubric;
use super::scoring::{AssessmentResult, ScoreMapping, ScoringEngine};
use super::session::{request_research, AssessmentSession, SessionId};
use super::TriageError;

/// Composes session storage, the research collaborator and the scoring engine.
pub struct TriageService<R, C> {
    repository: Arc<R>,
    collaborator: Arc<C>,
    engine: ScoringEngine,
    default_sources: Vec<String>,
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("triage-{id:06}"))
}

impl<R, C> TriageService<R, C>
where
    R: SessionRepository + 'static,
    C: ResearchCollaborator + 'static,
{
    pub fn new(repository: Arc<R>, collaborator: Arc<C>, rubric: Arc<Rubric>) -> Self {
        Self {
            repository,
            collaborator,
            engine: ScoringEngine::new(rubric),
            default_sources: default_target_sources(),
        }
    }

    /// Sources used when a research request names none.
    pub fn with_default_sources(mut self, sources: Vec<String>) -> Self {
        if !sources.is_empty() {
            self.default_sources = sources;
        }
        self
    }

    pub fn rubric(&self) -> &Rubric {
        self.engine.rubric()
    }

    /// Run research for a new session. Nothing is stored when research fails.
    pub fn start(&self, request: &ResearchRequest) -> Result<SessionRecord, TriageServiceError> {
        let request = self.resolve_sources(request);
        let mut session = AssessmentSession::new(next_session_id());
        session.run_research(self.collaborator.as_ref(), &request, self.rubric())?;
        self.store_new(session)
    }

    /// Open a session from a response obtained outside the service.
    pub fn ingest(
        &self,
        query: Option<String>,
        response: CollaboratorResponse,
    ) -> Result<SessionRecord, TriageServiceError> {
        let mut session = AssessmentSession::new(next_session_id());
        session.ingest(response, self.rubric())?;
        session.query = query;
        self.store_new(session)
    }

    /// Re-run research on an existing session. The collaborator is called
    /// outside the repository lock; the stored session is only replaced when
    /// the run succeeds.
    pub fn refresh(
        &self,
        session_id: &SessionId,
        request: &ResearchRequest,
    ) -> Result<SessionRecord, TriageServiceError> {
        let request = self.resolve_sources(request);
        self.get(session_id)?;
        let response = request_research(self.collaborator.as_ref(), &request)?;
        self.repository.modify::<_, TriageServiceError>(session_id, |record| {
            record
                .session
                .apply_research(&request, response, self.rubric())?;
            record.updated_at = Utc::now();
            Ok(())
        })
    }

    pub fn override_score(
        &self,
        session_id: &SessionId,
        indicator: &str,
        score: i64,
    ) -> Result<SessionRecord, TriageServiceError> {
        self.repository.modify::<_, TriageServiceError>(session_id, |record| {
            record
                .session
                .override_score(self.rubric(), indicator, score)?;
            record.updated_at = Utc::now();
            Ok(())
        })
    }

    pub fn get(&self, session_id: &SessionId) -> Result<SessionRecord, TriageServiceError> {
        let record = self
            .repository
            .fetch(session_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Stateless scoring of a caller-supplied, possibly partial, table.
    pub fn score<I, K>(&self, scores: I) -> Result<AssessmentResult, TriageServiceError>
    where
        I: IntoIterator<Item = (K, i64)>,
        K: AsRef<str>,
    {
        let mapping = ScoreMapping::from_partial(self.rubric(), scores)?;
        Ok(self.engine.compute(&mapping))
    }

    fn resolve_sources(&self, request: &ResearchRequest) -> ResearchRequest {
        let mut resolved = request.clone();
        if resolved.target_sources.is_empty() {
            resolved.target_sources = self.default_sources.clone();
        }
        resolved
    }

    fn store_new(&self, session: AssessmentSession) -> Result<SessionRecord, TriageServiceError> {
        let stored = self
            .repository
            .insert(SessionRecord::new(session, Utc::now()))?;
        info!(session = %stored.id(), "assessment session opened");
        Ok(stored)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TriageServiceError {
    #[error(transparent)]
    Triage(#[from] TriageError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
