//! Disaster severity triage: evidence intake, indicator normalization, and
//! weighted scoring against the five-dimension rubric.
//!
//! Data flows one way: collaborator text is parsed by [`payload`], its score
//! keys are reconciled by [`normalizer`], and [`scoring`] turns the resulting
//! mapping into an [`AssessmentResult`]. [`session`] holds the state between
//! research runs and analyst overrides.

pub mod evidence;
pub mod export;
pub mod normalizer;
pub mod payload;
pub mod repository;
pub mod research;
pub mod router;
pub mod rubric;
pub mod scoring;
pub mod service;
pub mod session;
pub mod views;

#[cfg(test)]
mod tests;

pub use evidence::{
    EventSummary, EvidenceRecord, KeyFigure, KeyFigureKind, KeyFigures, RawIndicatorScore,
    RawScoreValue, RawScores,
};
pub use export::{write_csv, AssessmentRecord, ExportError, IndicatorRow};
pub use normalizer::{
    evidence_for, match_indicator, normalize, normalize_with_report, MatchTier,
    NormalizationOutcome, NormalizationReport,
};
pub use payload::parse_evidence;
pub use repository::{RepositoryError, SessionRecord, SessionRepository};
pub use research::{
    CollaboratorError, CollaboratorResponse, ResearchCollaborator, ResearchRequest,
    DEFAULT_TARGET_SOURCES,
};
pub use router::triage_router;
pub use rubric::{Dimension, DimensionKind, Indicator, Rubric, RubricError, RUBRIC_VERSION};
pub use scoring::{
    compute_severity, AssessmentResult, Category, ScoreMapping, ScoringEngine, NEUTRAL_SCORE,
};
pub use service::{TriageService, TriageServiceError};
pub use session::{AssessmentSession, SessionId};
pub use views::SessionView;

/// Failures surfaced by research ingestion and analyst overrides.
///
/// Unmatched keys and unusable scores are not errors; the normalizer
/// absorbs them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TriageError {
    #[error("research collaborator unavailable: {reason}")]
    CollaboratorUnavailable { reason: String },
    #[error("collaborator returned malformed evidence: {reason}")]
    MalformedEvidence { reason: String, excerpt: String },
    #[error("score {score} for `{indicator}` is outside 1-5")]
    InvalidOverride { indicator: String, score: i64 },
    #[error("`{0}` is not a rubric indicator")]
    UnknownIndicator(String),
}

impl TriageError {
    /// Raw collaborator text kept for diagnostics, when there is any.
    pub fn excerpt(&self) -> Option<&str> {
        match self {
            Self::MalformedEvidence { excerpt, .. } => Some(excerpt),
            _ => None,
        }
    }
}
