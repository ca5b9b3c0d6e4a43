mod category;
mod mapping;

pub use category::Category;
pub use mapping::{ScoreMapping, MAX_SCORE, MIN_SCORE, NEUTRAL_SCORE};

pub(crate) use mapping::in_range;

use super::rubric::{DimensionKind, Rubric};
use serde::Serialize;
use std::sync::Arc;

/// INFORM-style figures run on a 0-10 scale.
const INFORM_SCALE: f64 = 2.0;

/// Round to the two decimal places used for display and export.
pub fn round_display(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Per-indicator contribution, kept so an assessment can be audited line by line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreComponent {
    pub indicator: &'static str,
    pub dimension: DimensionKind,
    pub score: u8,
    pub weight: f64,
    pub contribution: f64,
    /// The mapping had no entry, so the neutral score was used.
    pub defaulted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionSubtotal {
    pub dimension: DimensionKind,
    pub label: &'static str,
    /// Weighted average of the dimension's indicators, on the 1-5 scale.
    pub weighted_score: f64,
}

/// Final assessment. Values are full precision; use the `*_display` helpers
/// when rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentResult {
    pub rubric_version: &'static str,
    pub raw_weighted_sum: f64,
    pub severity_index: f64,
    pub inform_equivalent: f64,
    pub category: Category,
    pub category_label: &'static str,
    pub recommended_action: &'static str,
    pub display_color: &'static str,
    pub dimensions: Vec<DimensionSubtotal>,
    pub components: Vec<ScoreComponent>,
}

impl AssessmentResult {
    pub fn severity_display(&self) -> f64 {
        round_display(self.severity_index)
    }

    pub fn inform_display(&self) -> f64 {
        round_display(self.inform_equivalent)
    }

    pub fn defaulted_indicators(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.components
            .iter()
            .filter(|component| component.defaulted)
            .map(|component| component.indicator)
    }
}

/// Weighted severity over every rubric indicator.
///
/// Missing indicators count as [`NEUTRAL_SCORE`]. The raw sum spans up to
/// 5 x 5 and is divided by the dimension count to land back on 1-5.
pub fn compute_severity(scores: &ScoreMapping, rubric: &Rubric) -> AssessmentResult {
    let mut components = Vec::with_capacity(rubric.indicator_count());
    let mut dimensions = Vec::with_capacity(rubric.dimension_count());
    let mut raw_weighted_sum = 0.0;

    for dimension in rubric.dimensions() {
        let mut weighted_score = 0.0;
        for indicator in &dimension.indicators {
            let (score, defaulted) = match scores.get(indicator.id) {
                Some(score) => (score, false),
                None => (NEUTRAL_SCORE, true),
            };
            let contribution = f64::from(score) * indicator.weight;
            weighted_score += contribution;

            components.push(ScoreComponent {
                indicator: indicator.id,
                dimension: dimension.kind,
                score,
                weight: indicator.weight,
                contribution,
                defaulted,
            });
        }

        raw_weighted_sum += weighted_score;
        dimensions.push(DimensionSubtotal {
            dimension: dimension.kind,
            label: dimension.label,
            weighted_score,
        });
    }

    let severity_index = (raw_weighted_sum / rubric.dimension_count() as f64)
        .clamp(f64::from(MIN_SCORE), f64::from(MAX_SCORE));
    let inform_equivalent = severity_index * INFORM_SCALE;
    let category = Category::classify(severity_index);

    AssessmentResult {
        rubric_version: rubric.version(),
        raw_weighted_sum,
        severity_index,
        inform_equivalent,
        category,
        category_label: category.label(),
        recommended_action: category.recommended_action(),
        display_color: category.display_color(),
        dimensions,
        components,
    }
}

/// Stateless engine bound to one rubric.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    rubric: Arc<Rubric>,
}

impl ScoringEngine {
    pub fn new(rubric: Arc<Rubric>) -> Self {
        Self { rubric }
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    pub fn compute(&self, scores: &ScoreMapping) -> AssessmentResult {
        compute_severity(scores, &self.rubric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rubric() -> Rubric {
        Rubric::standard()
    }

    #[test]
    fn all_neutral_scores_land_on_three() {
        let rubric = rubric();
        let result = compute_severity(&ScoreMapping::neutral(&rubric), &rubric);

        assert!((result.severity_index - 3.0).abs() < 0.05);
        assert_eq!(result.category, Category::B);
        assert_eq!(result.severity_display(), 3.0);
        assert_eq!(result.inform_display(), 6.0);
    }

    #[test]
    fn all_fives_is_major_international() {
        let rubric = rubric();
        let result = compute_severity(&ScoreMapping::uniform(&rubric, 5), &rubric);

        assert!((result.severity_index - 5.0).abs() < 1e-9);
        assert!((result.inform_equivalent - 10.0).abs() < 1e-9);
        assert_eq!(result.category, Category::A);
        assert_eq!(result.display_color, "red");
        assert_eq!(result.recommended_action, Category::A.recommended_action());
    }

    #[test]
    fn all_ones_is_minimal() {
        let rubric = rubric();
        let result = compute_severity(&ScoreMapping::uniform(&rubric, 1), &rubric);

        assert!((result.severity_index - 1.0).abs() < 1e-9);
        assert_eq!(result.category, Category::C);
        assert_eq!(result.category_label, "Minimal / Local");
    }

    #[test]
    fn missing_entries_fall_back_to_neutral() {
        let rubric = rubric();
        let mut partial = ScoreMapping::default();
        partial.insert("1.2 Fatalities", 5);

        let result = compute_severity(&partial, &rubric);

        assert_eq!(result.components.len(), 20);
        assert_eq!(result.defaulted_indicators().count(), 19);
        let fatalities = result
            .components
            .iter()
            .find(|component| component.indicator == "1.2 Fatalities")
            .expect("component present");
        assert_eq!(fatalities.score, 5);
        assert!(!fatalities.defaulted);
        // 19 neutral indicators plus one raised by (5 - 3) * 0.25 in Impact.
        assert!((result.severity_index - (15.0 + 0.5) / 5.0).abs() < 1e-9);
    }

    #[test]
    fn raising_any_single_score_never_lowers_severity() {
        let rubric = rubric();
        for id in rubric.identifiers() {
            for low in MIN_SCORE..MAX_SCORE {
                let mut a = ScoreMapping::neutral(&rubric);
                let mut b = ScoreMapping::neutral(&rubric);
                a.insert(id, low);
                b.insert(id, low + 1);

                let sa = compute_severity(&a, &rubric).severity_index;
                let sb = compute_severity(&b, &rubric).severity_index;
                assert!(sa <= sb, "{id}: {sa} > {sb}");
            }
        }
    }

    #[test]
    fn severity_stays_in_range_for_mixed_scores() {
        let rubric = rubric();
        let ids: Vec<_> = rubric.identifiers().collect();
        for seed in 0..50u32 {
            let mut mapping = ScoreMapping::default();
            for (idx, id) in ids.iter().enumerate() {
                let score = ((seed as usize * 7 + idx * 3) % 5) as u8 + 1;
                mapping.insert(id, score);
            }
            let result = compute_severity(&mapping, &rubric);
            assert!((1.0..=5.0).contains(&result.severity_index));
            assert!((2.0..=10.0).contains(&result.inform_equivalent));
        }
    }

    #[test]
    fn dimension_subtotals_sum_to_raw_total() {
        let rubric = rubric();
        let mut mapping = ScoreMapping::neutral(&rubric);
        mapping.insert("4.3 Internal Interest (Tzu Chi)", 5);

        let result = compute_severity(&mapping, &rubric);
        let total: f64 = result
            .dimensions
            .iter()
            .map(|subtotal| subtotal.weighted_score)
            .sum();
        assert!((total - result.raw_weighted_sum).abs() < 1e-9);

        let attention = result
            .dimensions
            .iter()
            .find(|subtotal| subtotal.dimension == DimensionKind::StakeholderAttention)
            .expect("dimension present");
        assert!((attention.weighted_score - (3.0 * 0.45 + 5.0 * 0.55)).abs() < 1e-9);
    }

    #[test]
    fn compute_is_idempotent() {
        let rubric = rubric();
        let mut mapping = ScoreMapping::neutral(&rubric);
        mapping.insert("2.1 Food Security (IPC Score)", 4);
        let engine = ScoringEngine::new(Arc::new(rubric));

        let first = engine.compute(&mapping);
        let second = engine.compute(&mapping);
        assert_eq!(first, second);
        assert_eq!(
            first.severity_index.to_bits(),
            second.severity_index.to_bits()
        );
    }

    #[test]
    fn display_rounding_keeps_two_decimals() {
        assert_eq!(round_display(3.14159), 3.14);
        assert_eq!(round_display(2.499999), 2.5);
        assert_eq!(Category::classify(2.499999), Category::C);
    }
}
