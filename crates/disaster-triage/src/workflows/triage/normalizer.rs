//! Reconciles collaborator score keys with canonical rubric identifiers.
//!
//! Nothing in here fails: unmatched keys and unusable scores are dropped and
//! reported, and every indicator without a usable score gets the neutral value.

use super::evidence::{RawIndicatorScore, RawScoreValue, RawScores};
use super::rubric::Rubric;
use super::scoring::{in_range, ScoreMapping, NEUTRAL_SCORE};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Which matching rule resolved a raw key. Ordered strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Normalized,
    Loose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    UnmatchedIndicator,
    InvalidScoreValue,
    /// Another entry for the same indicator matched at an equal or stronger tier.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscardedEntry {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicator: Option<&'static str>,
    pub reason: DiscardReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_score: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorMatch {
    pub key: String,
    pub indicator: &'static str,
    pub tier: MatchTier,
    pub score: u8,
}

/// Audit trail of one normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizationReport {
    pub matched: Vec<IndicatorMatch>,
    pub discarded: Vec<DiscardedEntry>,
    /// Indicators that received the neutral score.
    pub defaulted: Vec<&'static str>,
}

impl NormalizationReport {
    pub fn unmatched_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.discarded
            .iter()
            .filter(|entry| entry.reason == DiscardReason::UnmatchedIndicator)
            .map(|entry| entry.key.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationOutcome {
    pub scores: ScoreMapping,
    pub report: NormalizationReport,
}

/// Map raw collaborator scores onto the rubric. Always returns a complete mapping.
pub fn normalize(raw_scores: &RawScores, rubric: &Rubric) -> ScoreMapping {
    normalize_with_report(raw_scores, rubric).scores
}

pub fn normalize_with_report(raw_scores: &RawScores, rubric: &Rubric) -> NormalizationOutcome {
    let candidates: Vec<&'static str> = rubric.identifiers().collect();
    let mut resolved: HashMap<&'static str, IndicatorMatch> = HashMap::new();
    let mut report = NormalizationReport::default();

    for entry in raw_scores.entries() {
        let Some((indicator, tier)) = match_indicator(&entry.key, &candidates) else {
            debug!(key = %entry.key, "discarding score for unmatched indicator");
            report.discarded.push(DiscardedEntry {
                key: entry.key.clone(),
                indicator: None,
                reason: DiscardReason::UnmatchedIndicator,
                raw_score: entry.value.score.as_ref().map(RawScoreValue::as_text),
            });
            continue;
        };

        let Some(score) = entry.value.score.as_ref().and_then(extract_score) else {
            debug!(key = %entry.key, indicator, "discarding unusable score value");
            report.discarded.push(DiscardedEntry {
                key: entry.key.clone(),
                indicator: Some(indicator),
                reason: DiscardReason::InvalidScoreValue,
                raw_score: entry.value.score.as_ref().map(RawScoreValue::as_text),
            });
            continue;
        };

        let candidate = IndicatorMatch {
            key: entry.key.clone(),
            indicator,
            tier,
            score,
        };

        let weaker = resolved
            .get(indicator)
            .is_some_and(|existing| existing.tier < tier);
        if weaker {
            debug!(key = %entry.key, indicator, ?tier, "weaker match ignored");
            report.discarded.push(superseded(&candidate));
        } else if let Some(previous) = resolved.insert(indicator, candidate) {
            report.discarded.push(superseded(&previous));
        }
    }

    let mut scores = ScoreMapping::default();
    for &id in &candidates {
        match resolved.remove(id) {
            Some(found) => {
                scores.insert(id, found.score);
                report.matched.push(found);
            }
            None => {
                scores.insert(id, NEUTRAL_SCORE);
                report.defaulted.push(id);
            }
        }
    }

    debug!(
        matched = report.matched.len(),
        discarded = report.discarded.len(),
        defaulted = report.defaulted.len(),
        "normalized collaborator scores"
    );

    NormalizationOutcome { scores, report }
}

fn superseded(entry: &IndicatorMatch) -> DiscardedEntry {
    DiscardedEntry {
        key: entry.key.clone(),
        indicator: Some(entry.indicator),
        reason: DiscardReason::Superseded,
        raw_score: Some(entry.score.to_string()),
    }
}

/// Resolve a raw key against candidate identifiers, first match wins:
/// exact, then dot-stripped lower-case containment, then plain lower-case
/// containment. Ties go to the first candidate in iteration order.
pub fn match_indicator(
    raw_key: &str,
    candidates: &[&'static str],
) -> Option<(&'static str, MatchTier)> {
    if let Some(exact) = candidates.iter().find(|candidate| **candidate == raw_key) {
        return Some((*exact, MatchTier::Exact));
    }

    // An empty key is contained in every identifier, so it resolves to the
    // first candidate.
    let cleaned = clean_key(raw_key);
    if let Some(found) = candidates
        .iter()
        .find(|candidate| clean_key(candidate).contains(&cleaned))
    {
        return Some((*found, MatchTier::Normalized));
    }

    let lowered = raw_key.to_lowercase();
    if let Some(found) = candidates
        .iter()
        .find(|candidate| candidate.to_lowercase().contains(&lowered))
    {
        return Some((*found, MatchTier::Loose));
    }

    None
}

fn clean_key(value: &str) -> String {
    value.to_lowercase().replace('.', "").trim().to_string()
}

/// Integer in `[1, 5]` from whatever the collaborator wrote, if any.
pub fn extract_score(value: &RawScoreValue) -> Option<u8> {
    let parsed = match value {
        RawScoreValue::Integer(score) if in_range(*score) => *score,
        other => first_digit_run(&other.as_text())?,
    };
    in_range(parsed).then_some(parsed as u8)
}

fn first_digit_run(text: &str) -> Option<i64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// The raw entry backing an indicator: the first whose key resolves to it.
pub fn evidence_for<'a>(
    indicator: &'static str,
    raw_scores: &'a RawScores,
) -> Option<&'a RawIndicatorScore> {
    raw_scores
        .entries()
        .iter()
        .find(|entry| {
            matches!(
                match_indicator(&entry.key, &[indicator]),
                Some((found, _)) if found == indicator
            )
        })
        .map(|entry| &entry.value)
}
