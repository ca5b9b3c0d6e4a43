use super::common::*;

use crate::workflows::triage::normalizer::{normalize, normalize_with_report, MatchTier};
use crate::workflows::triage::payload::parse_evidence;
use crate::workflows::triage::rubric::Rubric;
use crate::workflows::triage::scoring::{compute_severity, Category, NEUTRAL_SCORE};
use crate::workflows::triage::{AssessmentSession, SessionId};

fn payload_with_uniform_scores(score: u8) -> String {
    let rubric = Rubric::standard();
    let entries: Vec<String> = rubric
        .identifiers()
        .map(|id| format!("\"{id}\": {{\"score\": {score}}}"))
        .collect();
    format!("{{\"scores\": {{{}}}}}", entries.join(", "))
}

#[test]
fn uniform_payloads_land_on_expected_categories() {
    let rubric = Rubric::standard();
    for (score, category, severity) in [
        (1, Category::C, 1.0),
        (3, Category::B, 3.0),
        (5, Category::A, 5.0),
    ] {
        let evidence = parse_evidence(&payload_with_uniform_scores(score)).expect("parses");
        let result = compute_severity(&normalize(&evidence.scores, &rubric), &rubric);

        assert!((result.severity_index - severity).abs() < 1e-9, "score {score}");
        assert_eq!(result.category, category);
        assert!((result.inform_equivalent - severity * 2.0).abs() < 1e-9);
    }
}

#[test]
fn two_reported_neutral_scores_with_the_rest_defaulted_is_medium() {
    let rubric = Rubric::standard();
    let text = r#"{"scores": {
        "1.1 People Affected": {"score": 3},
        "1.2 Fatalities": {"score": 3}
    }}"#;
    let evidence = parse_evidence(text).expect("parses");
    let outcome = normalize_with_report(&evidence.scores, &rubric);

    assert_eq!(outcome.report.defaulted.len(), 18);
    let result = compute_severity(&outcome.scores, &rubric);
    assert!((result.severity_index - 3.0).abs() < 0.05);
    assert_eq!(result.category, Category::B);
}

#[test]
fn messy_collaborator_output_still_yields_complete_mapping() {
    let rubric = Rubric::standard();
    let evidence = parse_evidence(&cyclone_response_text()).expect("fenced payload parses");
    let outcome = normalize_with_report(&evidence.scores, &rubric);

    assert!(outcome.scores.is_complete(&rubric));
    assert_eq!(outcome.scores.get("1.1 People Affected"), Some(5));
    assert_eq!(outcome.scores.get("1.2 Fatalities"), Some(4));
    assert_eq!(outcome.scores.get("2.3 Displacement"), Some(4));
    assert_eq!(outcome.scores.get("5.3 Culture & Faith Alignment"), Some(NEUTRAL_SCORE));
    assert!(outcome
        .report
        .matched
        .iter()
        .any(|found| found.key == "Displacement" && found.tier == MatchTier::Normalized));
    assert_eq!(
        outcome.report.unmatched_keys().collect::<Vec<_>>(),
        vec!["Tourism Impact"]
    );

    let result = compute_severity(&outcome.scores, &rubric);
    assert_eq!(result.severity_display(), 3.41);
    assert_eq!(result.inform_display(), 6.82);
}

#[test]
fn session_view_fills_gaps_from_grounding() {
    let rubric = Rubric::standard();
    let mut session = AssessmentSession::new(SessionId("triage-view".to_string()));
    session
        .ingest(cyclone_response(), &rubric)
        .expect("ingest succeeds");

    let view = session.view(&rubric);
    let summary = view.summary.as_ref().expect("summary present");
    assert_eq!(summary.country, "Sri Lanka");

    let affected = &view.key_figures[0];
    assert_eq!(affected.value, "1,200,000");
    assert_eq!(affected.url.as_deref(), Some(GROUNDING_URL));
    let fatalities = &view.key_figures[1];
    assert_eq!(
        fatalities.url.as_deref(),
        Some("https://www.reuters.com/world/asia-pacific/ditwah")
    );
    let displaced = &view.key_figures[2];
    assert_eq!(displaced.value, "Unknown");
    assert_eq!(displaced.source, "Unknown");

    assert_eq!(view.sources.len(), 3);
    assert_eq!(view.sources[0], GROUNDING_URL);
    assert!(!view.sources.contains(&"https://apnews.com/ditwah".to_string()));

    let people = &view.indicators[0];
    assert_eq!(people.indicator, "1.1 People Affected");
    assert_eq!(people.extracted_value, "1.2 million");
    assert_eq!(people.source_urls, vec!["https://reliefweb.int/a".to_string()]);
    let housing = &view.indicators[3];
    assert_eq!(housing.extracted_value, "No specific data");
    assert_eq!(housing.justification, "-");
    assert!(housing.defaulted);

    let result = view.result.as_ref().expect("result present");
    assert_eq!(result.category, Category::B);
    assert_eq!(result.hex_color, "#ffa421");
}
