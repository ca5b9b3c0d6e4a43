use super::evidence::EvidenceRecord;
use super::TriageError;
use serde_json::Value;
use std::borrow::Cow;
use tracing::{debug, warn};

/// Characters of raw collaborator output kept for operator diagnostics.
pub const EXCERPT_CHARS: usize = 1200;

/// Pull an evidence record out of free-form collaborator text.
///
/// Accepts fenced markdown, prose around the object, trailing commas and
/// Python-style literals (`None`, `True`, single-quoted strings).
pub fn parse_evidence(text: &str) -> Result<EvidenceRecord, TriageError> {
    if text.trim().is_empty() {
        return Err(TriageError::CollaboratorUnavailable {
            reason: "collaborator response contained no text".to_string(),
        });
    }

    let stripped = strip_code_fence(text);
    let candidate =
        extract_json_object(stripped).ok_or_else(|| malformed(text, "no JSON object found"))?;

    // Probe as a generic value first so shape errors and syntax errors stay
    // distinguishable. The record itself is read from the text, which keeps
    // score entries in payload order.
    let (json_text, value) = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => (Cow::Borrowed(candidate), value),
        Err(strict_err) => {
            debug!(error = %strict_err, "strict JSON parse failed, attempting repair");
            let repaired = repair_json(candidate);
            let value = serde_json::from_str::<Value>(&repaired).map_err(|err| {
                warn!(error = %err, "collaborator payload unparseable after repair");
                malformed(text, "could not parse JSON, even after lenient repair")
            })?;
            (Cow::Owned(repaired), value)
        }
    };

    if !value.is_object() {
        return Err(malformed(text, "payload is not a JSON object"));
    }

    serde_json::from_str::<EvidenceRecord>(&json_text)
        .map_err(|err| malformed(text, &format!("payload has an unexpected shape: {err}")))
}

fn malformed(text: &str, reason: &str) -> TriageError {
    TriageError::MalformedEvidence {
        reason: reason.to_string(),
        excerpt: excerpt(text),
    }
}

pub(crate) fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}

/// Keep only the first fenced block when the text opens with a fence; prose
/// after the closing fence is dropped.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(fenced) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let block = match fenced.find("```") {
        Some(end) => &fenced[..end],
        None => fenced,
    };
    let block = block.trim_start();
    block.strip_prefix("json").unwrap_or(block).trim()
}

fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then_some(&raw[start..=end])
}

/// Rewrite near-JSON into JSON: drop trailing commas, map Python literals,
/// and convert single-quoted strings. String contents are left untouched.
fn repair_json(candidate: &str) -> String {
    let chars: Vec<char> = candidate.chars().collect();
    let mut out = String::with_capacity(candidate.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '"' => i = copy_double_quoted(&chars, i, &mut out),
            '\'' => i = copy_single_quoted(&chars, i, &mut out),
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(',');
                }
                i += 1;
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                out.push_str(match word.as_str() {
                    "None" => "null",
                    "True" => "true",
                    "False" => "false",
                    other => other,
                });
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

fn copy_double_quoted(chars: &[char], start: usize, out: &mut String) -> usize {
    out.push('"');
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        match c {
            '\\' => {
                if let Some(next) = chars.get(i + 1) {
                    out.push(*next);
                }
                i += 2;
            }
            '"' => return i + 1,
            _ => i += 1,
        }
    }
    i
}

fn copy_single_quoted(chars: &[char], start: usize, out: &mut String) -> usize {
    out.push('"');
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                match chars.get(i + 1) {
                    Some('\'') => out.push('\''),
                    Some(next) => {
                        out.push('\\');
                        out.push(*next);
                    }
                    None => {}
                }
                i += 2;
            }
            '\'' => {
                out.push('"');
                return i + 1;
            }
            '"' => {
                out.push_str("\\\"");
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::triage::evidence::RawScoreValue;

    #[test]
    fn parses_fenced_payload_with_commentary() {
        let text = "```json\n{\"summary\": {\"title\": \"Cyclone Ditwah\"}, \"scores\": {\"1.2 Fatalities\": {\"score\": 4}}}\n```";

        let record = parse_evidence(text).expect("fenced payload parses");
        assert_eq!(record.summary.title.as_deref(), Some("Cyclone Ditwah"));
        assert_eq!(record.scores.len(), 1);
    }

    #[test]
    fn prose_after_the_closing_fence_is_dropped() {
        let text = concat!(
            "```json\n{\"scores\": {\"3.2 Security\": {\"score\": 4}}}\n```\n",
            "Note: figures from {OCHA}."
        );

        let record = parse_evidence(text).expect("fenced block parses");
        assert_eq!(
            record.scores.entries()[0].value.score,
            Some(RawScoreValue::Integer(4))
        );
    }

    #[test]
    fn unterminated_fence_keeps_the_remainder() {
        let record = parse_evidence("```\n{\"summary\": {\"title\": \"Landslide\"}}")
            .expect("open fence parses");
        assert_eq!(record.summary.title.as_deref(), Some("Landslide"));
    }

    #[test]
    fn ignores_prose_around_the_object() {
        let text = "Here is the assessment you asked for:\n{\"scores\": {}}\nLet me know if you need more.";
        let record = parse_evidence(text).expect("object found inside prose");
        assert!(record.scores.is_empty());
    }

    #[test]
    fn repairs_trailing_commas_and_python_literals() {
        let text = "{'summary': {'title': 'Floods in \"Region\" 5', 'country': None,},\n \"scores\": {\"3.2 Security\": {\"score\": '2', \"flag\": True,},},}";

        let record = parse_evidence(text).expect("repaired payload parses");
        assert_eq!(
            record.summary.title.as_deref(),
            Some("Floods in \"Region\" 5")
        );
        assert!(record.summary.country.is_none());
        assert_eq!(
            record.scores.entries()[0].value.score,
            Some(RawScoreValue::Text("2".to_string()))
        );
    }

    #[test]
    fn repair_leaves_string_contents_alone() {
        let repaired = repair_json("{\"note\": \"None, True,]\", \"n\": None,}");
        assert_eq!(repaired, "{\"note\": \"None, True,]\", \"n\": null}");
    }

    #[test]
    fn empty_text_means_collaborator_unavailable() {
        match parse_evidence("   \n") {
            Err(TriageError::CollaboratorUnavailable { .. }) => {}
            other => panic!("expected unavailable, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_text_is_malformed_with_excerpt() {
        let text = format!("No data found. {}", "x".repeat(2000));

        match parse_evidence(&text) {
            Err(TriageError::MalformedEvidence { excerpt, .. }) => {
                assert_eq!(excerpt.chars().count(), EXCERPT_CHARS);
                assert!(excerpt.starts_with("No data found."));
            }
            other => panic!("expected malformed evidence, got {other:?}"),
        }
    }

    #[test]
    fn broken_object_is_malformed() {
        match parse_evidence("{\"scores\": {\"1.1\": {\"score\": 3}") {
            Err(TriageError::MalformedEvidence { reason, .. }) => {
                assert!(reason.contains("could not parse"));
            }
            other => panic!("expected malformed evidence, got {other:?}"),
        }
    }

    #[test]
    fn scores_of_wrong_shape_are_malformed() {
        match parse_evidence("{\"scores\": \"all fives\"}") {
            Err(TriageError::MalformedEvidence { reason, .. }) => {
                assert!(reason.contains("unexpected shape"));
            }
            other => panic!("expected malformed evidence, got {other:?}"),
        }
    }
}
