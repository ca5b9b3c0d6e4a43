use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::evidence::EvidenceRecord;
use super::normalizer::{normalize_with_report, NormalizationReport};
use super::payload::{excerpt, parse_evidence};
use super::research::{CollaboratorResponse, ResearchCollaborator, ResearchRequest};
use super::rubric::Rubric;
use super::scoring::{compute_severity, AssessmentResult, ScoreMapping};
use super::views::SessionView;
use super::TriageError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// State carried between research runs and analyst overrides.
///
/// A failed run leaves every field as it was, so the last good assessment
/// stays on screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentSession {
    pub id: SessionId,
    pub query: Option<String>,
    pub evidence: Option<EvidenceRecord>,
    pub grounding_urls: Vec<String>,
    pub scores: ScoreMapping,
    /// Leading slice of the last accepted collaborator text.
    pub raw_debug: Option<String>,
    pub normalization: Option<NormalizationReport>,
}

impl AssessmentSession {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            query: None,
            evidence: None,
            grounding_urls: Vec::new(),
            scores: ScoreMapping::default(),
            raw_debug: None,
            normalization: None,
        }
    }

    /// Ask the collaborator for fresh evidence and rescore from it.
    pub fn run_research<C>(
        &mut self,
        collaborator: &C,
        request: &ResearchRequest,
        rubric: &Rubric,
    ) -> Result<(), TriageError>
    where
        C: ResearchCollaborator + ?Sized,
    {
        let response = request_research(collaborator, request)?;
        self.apply_research(request, response, rubric)
    }

    /// Rescore from a response obtained for `request`.
    pub fn apply_research(
        &mut self,
        request: &ResearchRequest,
        response: CollaboratorResponse,
        rubric: &Rubric,
    ) -> Result<(), TriageError> {
        self.ingest(response, rubric)?;
        self.query = Some(request.query.clone());
        Ok(())
    }

    /// Accept an already obtained collaborator response.
    pub fn ingest(
        &mut self,
        response: CollaboratorResponse,
        rubric: &Rubric,
    ) -> Result<(), TriageError> {
        let text = response.text.unwrap_or_default();
        let evidence = parse_evidence(&text)?;
        let outcome = normalize_with_report(&evidence.scores, rubric);

        info!(
            session = %self.id,
            matched = outcome.report.matched.len(),
            defaulted = outcome.report.defaulted.len(),
            grounding_urls = response.grounding_urls.len(),
            "ingested research evidence"
        );

        self.evidence = Some(evidence);
        self.grounding_urls = response.grounding_urls;
        self.scores = outcome.scores;
        self.normalization = Some(outcome.report);
        self.raw_debug = Some(excerpt(&text));
        Ok(())
    }

    /// Analyst adjustment of a single indicator. Returns the previous score.
    pub fn override_score(
        &mut self,
        rubric: &Rubric,
        indicator: &str,
        score: i64,
    ) -> Result<Option<u8>, TriageError> {
        let previous = self.scores.set(rubric, indicator, score)?;
        info!(session = %self.id, indicator, score, "score overridden");
        Ok(previous)
    }

    /// `None` until a research run has succeeded.
    pub fn assessment(&self, rubric: &Rubric) -> Option<AssessmentResult> {
        self.evidence
            .as_ref()
            .map(|_| compute_severity(&self.scores, rubric))
    }

    pub fn view(&self, rubric: &Rubric) -> SessionView {
        SessionView::build(self, rubric)
    }
}

/// Run one collaborator call, mapping any failure to `CollaboratorUnavailable`.
pub fn request_research<C>(
    collaborator: &C,
    request: &ResearchRequest,
) -> Result<CollaboratorResponse, TriageError>
where
    C: ResearchCollaborator + ?Sized,
{
    collaborator.research(request).map_err(|err| {
        warn!(query = %request.query, error = %err, "research collaborator failed");
        TriageError::CollaboratorUnavailable {
            reason: err.to_string(),
        }
    })
}
