//! Serde model for the payload returned by the research collaborator.
//!
//! Everything here is untrusted: fields may be missing, mistyped, or padded
//! with prose. Deserialization is deliberately forgiving so that a single odd
//! field degrades to "absent" instead of rejecting the whole payload.

use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One research run's worth of evidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    #[serde(default, deserialize_with = "lenient_summary")]
    pub summary: EventSummary,
    #[serde(default, deserialize_with = "lenient_key_figures")]
    pub key_figures: KeyFigures,
    #[serde(default, alias = "raw_scores")]
    pub scores: RawScores,
}

/// Narrative header describing the event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
}

impl EventSummary {
    pub fn title_or_default(&self) -> &str {
        non_blank(&self.title).unwrap_or("Assessment")
    }

    pub fn country_or_default(&self) -> &str {
        non_blank(&self.country).unwrap_or("-")
    }

    pub fn date_or_default(&self) -> &str {
        non_blank(&self.date).unwrap_or("-")
    }

    pub fn description_or_default(&self) -> &str {
        non_blank(&self.description).unwrap_or("No description available.")
    }
}

/// The four headline figures the collaborator is asked to extract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyFigures {
    #[serde(default, deserialize_with = "lenient_figure")]
    pub affected: Option<KeyFigure>,
    #[serde(default, deserialize_with = "lenient_figure")]
    pub fatalities: Option<KeyFigure>,
    #[serde(default, deserialize_with = "lenient_figure")]
    pub displaced: Option<KeyFigure>,
    #[serde(default, deserialize_with = "lenient_figure")]
    pub in_need: Option<KeyFigure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyFigureKind {
    Affected,
    Fatalities,
    Displaced,
    InNeed,
}

impl KeyFigureKind {
    pub const fn ordered() -> [Self; 4] {
        [Self::Affected, Self::Fatalities, Self::Displaced, Self::InNeed]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Affected => "Affected",
            Self::Fatalities => "Fatalities",
            Self::Displaced => "Displaced",
            Self::InNeed => "In Need",
        }
    }
}

impl KeyFigures {
    pub fn get(&self, kind: KeyFigureKind) -> Option<&KeyFigure> {
        match kind {
            KeyFigureKind::Affected => self.affected.as_ref(),
            KeyFigureKind::Fatalities => self.fatalities.as_ref(),
            KeyFigureKind::Displaced => self.displaced.as_ref(),
            KeyFigureKind::InNeed => self.in_need.as_ref(),
        }
    }
}

/// A reported figure with its provenance. `value` is free text, not a number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyFigure {
    #[serde(default, deserialize_with = "lenient_text")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub url: Option<String>,
}

impl KeyFigure {
    /// The figure's own URL, or the first grounding URL when the collaborator
    /// left a placeholder behind.
    pub fn resolved_url<'a>(&'a self, grounding_urls: &'a [String]) -> Option<&'a str> {
        match non_blank(&self.url) {
            Some(url) if !is_placeholder_url(url) => Some(url),
            _ => grounding_urls.first().map(String::as_str),
        }
    }
}

fn is_placeholder_url(url: &str) -> bool {
    url == "#" || url.contains("...") || url.contains('…')
}

/// Collaborator score entries in payload order, duplicates included.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawScores(Vec<RawScoreEntry>);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawScoreEntry {
    pub key: String,
    pub value: RawIndicatorScore,
}

impl RawScores {
    pub fn new(entries: Vec<RawScoreEntry>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[RawScoreEntry] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, key: impl Into<String>, value: RawIndicatorScore) {
        self.0.push(RawScoreEntry {
            key: key.into(),
            value,
        });
    }
}

impl FromIterator<(String, RawIndicatorScore)> for RawScores {
    fn from_iter<I: IntoIterator<Item = (String, RawIndicatorScore)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| RawScoreEntry { key, value })
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for RawScores {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(RawScoresVisitor)
    }
}

struct RawScoresVisitor;

impl<'de> Visitor<'de> for RawScoresVisitor {
    type Value = RawScores;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of indicator names to score objects")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::new();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            entries.push(RawScoreEntry {
                key,
                value: RawIndicatorScore::from_value(value),
            });
        }
        Ok(RawScores(entries))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(RawScores::default())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(RawScores::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(RawScores::default())
    }
}

/// The collaborator's view of a single indicator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawIndicatorScore {
    #[serde(default)]
    pub score: Option<RawScoreValue>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub extracted_value: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub justification: Option<String>,
    #[serde(default, deserialize_with = "lenient_urls")]
    pub source_urls: Vec<String>,
}

impl RawIndicatorScore {
    pub fn with_score(score: RawScoreValue) -> Self {
        Self {
            score: Some(score),
            ..Self::default()
        }
    }

    /// Objects map field by field; any other JSON shape carries no score.
    fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
            _ => Self::default(),
        }
    }
}

/// A score as the collaborator wrote it: `4`, `4.0`, `"4 (Severe)"`, ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawScoreValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Other(Value),
}

impl RawScoreValue {
    pub fn as_text(&self) -> String {
        match self {
            RawScoreValue::Integer(value) => value.to_string(),
            RawScoreValue::Float(value) => value.to_string(),
            RawScoreValue::Text(value) => value.clone(),
            RawScoreValue::Other(value) => value.to_string(),
        }
    }
}

impl From<i64> for RawScoreValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for RawScoreValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(value))
}

fn lenient_urls<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let urls = match Value::deserialize(deserializer)? {
        Value::String(url) => vec![url],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(url) => Some(url),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(urls
        .into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect())
}

fn lenient_figure<'de, D>(deserializer: D) -> Result<Option<KeyFigure>, D::Error>
where
    D: Deserializer<'de>,
{
    let figure = match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).ok(),
        Value::Null => None,
        other => scalar_text(other).map(|value| KeyFigure {
            value: Some(value),
            ..KeyFigure::default()
        }),
    };
    Ok(figure)
}

fn lenient_summary<'de, D>(deserializer: D) -> Result<EventSummary, D::Error>
where
    D: Deserializer<'de>,
{
    let summary = match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
        Value::String(description) => EventSummary {
            description: Some(description),
            ..EventSummary::default()
        },
        _ => EventSummary::default(),
    };
    Ok(summary)
}

fn lenient_key_figures<'de, D>(deserializer: D) -> Result<KeyFigures, D::Error>
where
    D: Deserializer<'de>,
{
    let figures = match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
        _ => KeyFigures::default(),
    };
    Ok(figures)
}
