use serde::Serialize;

use super::evidence::{EventSummary, KeyFigureKind};
use super::normalizer::evidence_for;
use super::rubric::{DimensionKind, Rubric};
use super::scoring::{compute_severity, round_display, AssessmentResult, Category};
use super::session::AssessmentSession;

/// Grounding links shown alongside each indicator.
pub const MAX_SOURCE_LINKS: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct SummaryView {
    pub title: String,
    pub country: String,
    pub date: String,
    pub description: String,
}

impl From<&EventSummary> for SummaryView {
    fn from(summary: &EventSummary) -> Self {
        Self {
            title: summary.title_or_default().to_string(),
            country: summary.country_or_default().to_string(),
            date: summary.date_or_default().to_string(),
            description: summary.description_or_default().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyFigureView {
    pub kind: KeyFigureKind,
    pub label: &'static str,
    pub value: String,
    pub date: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorView {
    pub indicator: &'static str,
    pub dimension: DimensionKind,
    pub dimension_label: &'static str,
    pub score: u8,
    pub weight: f64,
    pub rubric: &'static str,
    pub extracted_value: String,
    pub justification: String,
    pub source_urls: Vec<String>,
    /// No usable collaborator score at ingestion; the neutral value was used.
    pub defaulted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DimensionView {
    pub dimension: DimensionKind,
    pub label: &'static str,
    pub weighted_score: f64,
}

/// Rounded figures ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    pub rubric_version: &'static str,
    pub severity_index: f64,
    pub inform_equivalent: f64,
    pub category: Category,
    pub category_label: &'static str,
    pub recommended_action: &'static str,
    pub display_color: &'static str,
    pub hex_color: &'static str,
    pub dimensions: Vec<DimensionView>,
}

impl From<&AssessmentResult> for ResultView {
    fn from(result: &AssessmentResult) -> Self {
        Self {
            rubric_version: result.rubric_version,
            severity_index: result.severity_display(),
            inform_equivalent: result.inform_display(),
            category: result.category,
            category_label: result.category_label,
            recommended_action: result.recommended_action,
            display_color: result.display_color,
            hex_color: result.category.hex_color(),
            dimensions: result
                .dimensions
                .iter()
                .map(|subtotal| DimensionView {
                    dimension: subtotal.dimension,
                    label: subtotal.label,
                    weighted_score: round_display(subtotal.weighted_score),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryView>,
    pub key_figures: Vec<KeyFigureView>,
    pub sources: Vec<String>,
    pub indicators: Vec<IndicatorView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultView>,
    pub unmatched_keys: Vec<String>,
}

impl SessionView {
    pub(crate) fn build(session: &AssessmentSession, rubric: &Rubric) -> Self {
        let Some(evidence) = session.evidence.as_ref() else {
            return Self {
                session_id: session.id.0.clone(),
                query: session.query.clone(),
                summary: None,
                key_figures: Vec::new(),
                sources: Vec::new(),
                indicators: Vec::new(),
                result: None,
                unmatched_keys: Vec::new(),
            };
        };

        let key_figures = KeyFigureKind::ordered()
            .into_iter()
            .map(|kind| {
                let figure = evidence.key_figures.get(kind);
                KeyFigureView {
                    kind,
                    label: kind.label(),
                    value: text_or(figure.and_then(|f| f.value.as_ref()), "Unknown"),
                    date: text_or(figure.and_then(|f| f.date.as_ref()), "-"),
                    source: text_or(figure.and_then(|f| f.source.as_ref()), "Unknown"),
                    url: match figure {
                        Some(figure) => figure.resolved_url(&session.grounding_urls),
                        None => session.grounding_urls.first().map(String::as_str),
                    }
                    .map(str::to_string),
                }
            })
            .collect();

        let result = compute_severity(&session.scores, rubric);
        let indicators = rubric
            .indicators()
            .map(|(dimension, indicator)| {
                let raw = evidence_for(indicator.id, &evidence.scores);
                let defaulted = match session.normalization.as_ref() {
                    Some(report) => report.defaulted.contains(&indicator.id),
                    None => session.scores.get(indicator.id).is_none(),
                };
                IndicatorView {
                    indicator: indicator.id,
                    dimension: dimension.kind,
                    dimension_label: dimension.label,
                    score: session.scores.score_or_neutral(indicator.id),
                    weight: indicator.weight,
                    rubric: indicator.rubric,
                    extracted_value: raw
                        .and_then(|raw| raw.extracted_value.clone())
                        .unwrap_or_else(|| "No specific data".to_string()),
                    justification: raw
                        .and_then(|raw| raw.justification.clone())
                        .unwrap_or_else(|| "-".to_string()),
                    source_urls: raw.map(|raw| raw.source_urls.clone()).unwrap_or_default(),
                    defaulted,
                }
            })
            .collect();

        Self {
            session_id: session.id.0.clone(),
            query: session.query.clone(),
            summary: Some(SummaryView::from(&evidence.summary)),
            key_figures,
            sources: unique_sources(&session.grounding_urls),
            indicators,
            result: Some(ResultView::from(&result)),
            unmatched_keys: session
                .normalization
                .as_ref()
                .map(|report| report.unmatched_keys().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }
}

fn text_or(value: Option<&String>, fallback: &str) -> String {
    value
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// First [`MAX_SOURCE_LINKS`] distinct URLs, in the order they were reported.
pub fn unique_sources(urls: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(MAX_SOURCE_LINKS);
    for url in urls {
        if unique.len() == MAX_SOURCE_LINKS {
            break;
        }
        if !unique.contains(url) {
            unique.push(url.clone());
        }
    }
    unique
}
