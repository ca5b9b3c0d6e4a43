use super::super::rubric::Rubric;
use super::super::TriageError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;
/// Fallback for indicators with no usable evidence.
pub const NEUTRAL_SCORE: u8 = 3;

pub(crate) fn in_range(score: i64) -> bool {
    (i64::from(MIN_SCORE)..=i64::from(MAX_SCORE)).contains(&score)
}

/// Canonical indicator id -> integer score in `[1, 5]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreMapping(BTreeMap<String, u8>);

impl ScoreMapping {
    /// Every rubric indicator at the neutral score.
    pub fn neutral(rubric: &Rubric) -> Self {
        Self::uniform(rubric, NEUTRAL_SCORE)
    }

    pub fn uniform(rubric: &Rubric, score: u8) -> Self {
        Self(
            rubric
                .identifiers()
                .map(|id| (id.to_string(), score.clamp(MIN_SCORE, MAX_SCORE)))
                .collect(),
        )
    }

    /// Validate a caller-supplied, possibly partial, score table.
    pub fn from_partial<I, K>(rubric: &Rubric, scores: I) -> Result<Self, TriageError>
    where
        I: IntoIterator<Item = (K, i64)>,
        K: AsRef<str>,
    {
        let mut mapping = Self::default();
        for (id, score) in scores {
            mapping.set(rubric, id.as_ref(), score)?;
        }
        Ok(mapping)
    }

    pub fn get(&self, id: &str) -> Option<u8> {
        self.0.get(id).copied()
    }

    pub fn score_or_neutral(&self, id: &str) -> u8 {
        self.get(id).unwrap_or(NEUTRAL_SCORE)
    }

    /// Replace one entry after checking the id and range. Returns the previous
    /// score; on error the mapping is unchanged.
    pub fn set(
        &mut self,
        rubric: &Rubric,
        id: &str,
        score: i64,
    ) -> Result<Option<u8>, TriageError> {
        if !rubric.contains(id) {
            return Err(TriageError::UnknownIndicator(id.to_string()));
        }
        if !in_range(score) {
            return Err(TriageError::InvalidOverride {
                indicator: id.to_string(),
                score,
            });
        }
        Ok(self.0.insert(id.to_string(), score as u8))
    }

    pub(crate) fn insert(&mut self, id: &str, score: u8) {
        self.0.insert(id.to_string(), score);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> + '_ {
        self.0.iter().map(|(id, score)| (id.as_str(), *score))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every rubric indicator has a score and nothing else does.
    pub fn is_complete(&self, rubric: &Rubric) -> bool {
        self.0.len() == rubric.indicator_count()
            && rubric.identifiers().all(|id| self.0.contains_key(id))
    }
}
