use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use super::rubric::Rubric;
use super::scoring::{compute_severity, round_display, Category};
use super::session::AssessmentSession;
use super::views::SummaryView;

#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Csv(csv::Error),
    /// The session has no evidence yet, so there is nothing to export.
    NotAssessed,
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(err) => write!(f, "failed to write assessment export: {}", err),
            ExportError::Csv(err) => write!(f, "could not encode assessment as CSV: {}", err),
            ExportError::NotAssessed => write!(f, "session has not been assessed yet"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(err) => Some(err),
            ExportError::Csv(err) => Some(err),
            ExportError::NotAssessed => None,
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorRow {
    pub indicator: &'static str,
    pub dimension: &'static str,
    pub score: u8,
    pub weight: f64,
    pub contribution: f64,
    pub defaulted: bool,
}

/// Portable snapshot of one assessment. Figures are rounded for display;
/// the rubric version travels with every record.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentRecord {
    pub rubric_version: &'static str,
    pub assessed_at: DateTime<Utc>,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub summary: SummaryView,
    pub severity_index: f64,
    pub inform_equivalent: f64,
    pub category: Category,
    pub category_label: &'static str,
    pub recommended_action: &'static str,
    pub sources: Vec<String>,
    pub indicators: Vec<IndicatorRow>,
}

impl AssessmentRecord {
    pub fn from_session(
        session: &AssessmentSession,
        rubric: &Rubric,
        assessed_at: DateTime<Utc>,
    ) -> Result<Self, ExportError> {
        let evidence = session.evidence.as_ref().ok_or(ExportError::NotAssessed)?;
        let result = compute_severity(&session.scores, rubric);

        let indicators = result
            .components
            .iter()
            .map(|component| IndicatorRow {
                indicator: component.indicator,
                dimension: component.dimension.label(),
                score: component.score,
                weight: component.weight,
                contribution: round_display(component.contribution),
                defaulted: component.defaulted,
            })
            .collect();

        Ok(Self {
            rubric_version: result.rubric_version,
            assessed_at,
            session_id: session.id.0.clone(),
            query: session.query.clone(),
            summary: SummaryView::from(&evidence.summary),
            severity_index: result.severity_display(),
            inform_equivalent: result.inform_display(),
            category: result.category,
            category_label: result.category_label,
            recommended_action: result.recommended_action,
            sources: session.grounding_urls.clone(),
            indicators,
        })
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    rubric_version: &'a str,
    assessed_at: String,
    session_id: &'a str,
    title: &'a str,
    country: &'a str,
    indicator: &'a str,
    dimension: &'a str,
    score: u8,
    weight: f64,
    contribution: f64,
    defaulted: bool,
    severity_index: f64,
    inform_equivalent: f64,
    category: &'a str,
}

/// One row per indicator; headline figures repeat on every row so each row
/// stands alone in a spreadsheet.
pub fn write_csv<W: Write>(record: &AssessmentRecord, writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let assessed_at = record.assessed_at.to_rfc3339_opts(SecondsFormat::Secs, true);

    for row in &record.indicators {
        csv_writer.serialize(CsvRow {
            rubric_version: record.rubric_version,
            assessed_at: assessed_at.clone(),
            session_id: &record.session_id,
            title: &record.summary.title,
            country: &record.summary.country,
            indicator: row.indicator,
            dimension: row.dimension,
            score: row.score,
            weight: row.weight,
            contribution: row.contribution,
            defaulted: row.defaulted,
            severity_index: record.severity_index,
            inform_equivalent: record.inform_equivalent,
            category: record.category.code(),
        })?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn write_csv_to_path<P: AsRef<Path>>(
    record: &AssessmentRecord,
    path: P,
) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_csv(record, file)
}
