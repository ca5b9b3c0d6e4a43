use serde::Serialize;
use std::collections::HashSet;

/// Version tag embedded in every exported assessment.
pub const RUBRIC_VERSION: &str = "severity-rubric/2025.12";

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// The five top-level groupings every indicator belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    Impact,
    HumanitarianConditions,
    Complexity,
    StakeholderAttention,
    FeasibilityAndPartnerships,
}

impl DimensionKind {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Impact,
            Self::HumanitarianConditions,
            Self::Complexity,
            Self::StakeholderAttention,
            Self::FeasibilityAndPartnerships,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Impact => "Impact",
            Self::HumanitarianConditions => "Humanitarian Conditions",
            Self::Complexity => "Complexity",
            Self::StakeholderAttention => "Stakeholder Attention",
            Self::FeasibilityAndPartnerships => "Feasibility & Partnerships",
        }
    }

    /// Section number used as the identifier prefix ("1." for Impact, ...).
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Impact => 1,
            Self::HumanitarianConditions => 2,
            Self::Complexity => 3,
            Self::StakeholderAttention => 4,
            Self::FeasibilityAndPartnerships => 5,
        }
    }
}

/// Leaf scoring criterion rated 1-5.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Indicator {
    pub id: &'static str,
    /// Share of the owning dimension; weights within a dimension sum to 1.0.
    pub weight: f64,
    pub rubric: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dimension {
    pub kind: DimensionKind,
    pub label: &'static str,
    pub indicators: Vec<Indicator>,
}

impl Dimension {
    pub fn new(kind: DimensionKind, indicators: Vec<Indicator>) -> Self {
        Self {
            kind,
            label: kind.label(),
            indicators,
        }
    }

    pub fn weight_total(&self) -> f64 {
        self.indicators.iter().map(|indicator| indicator.weight).sum()
    }
}

/// Structural problems detected while validating a rubric.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RubricError {
    #[error("rubric must define exactly {expected} dimensions, found {found}")]
    DimensionCount { expected: usize, found: usize },
    #[error("dimension {dimension} weights sum to {total:.6}, expected 1.0")]
    WeightSum {
        dimension: &'static str,
        total: f64,
    },
    #[error("indicator {indicator:?} has a non-positive or non-finite weight {weight}")]
    InvalidWeight {
        indicator: &'static str,
        weight: f64,
    },
    #[error("indicator identifier {0:?} appears more than once")]
    DuplicateIndicator(&'static str),
    #[error("dimension {0} contains an indicator with an empty identifier")]
    EmptyIdentifier(&'static str),
}

/// Immutable multi-criteria rubric: dimensions, indicators, weights, thresholds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rubric {
    version: &'static str,
    dimensions: Vec<Dimension>,
}

impl Rubric {
    /// Build a custom rubric, rejecting anything that breaks the weight invariant.
    pub fn new(version: &'static str, dimensions: Vec<Dimension>) -> Result<Self, RubricError> {
        let rubric = Self {
            version,
            dimensions,
        };
        rubric.validate()?;
        Ok(rubric)
    }

    pub fn standard() -> Self {
        Self {
            version: RUBRIC_VERSION,
            dimensions: standard_dimensions(),
        }
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn dimension_count(&self) -> usize {
        self.dimensions.len()
    }

    /// Canonical identifiers in rubric iteration order.
    pub fn identifiers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.indicators().map(|(_, indicator)| indicator.id)
    }

    pub fn indicators(&self) -> impl Iterator<Item = (&Dimension, &Indicator)> + '_ {
        self.dimensions.iter().flat_map(|dimension| {
            dimension
                .indicators
                .iter()
                .map(move |indicator| (dimension, indicator))
        })
    }

    pub fn indicator_count(&self) -> usize {
        self.dimensions
            .iter()
            .map(|dimension| dimension.indicators.len())
            .sum()
    }

    pub fn indicator(&self, id: &str) -> Option<(&Dimension, &Indicator)> {
        self.indicators().find(|(_, indicator)| indicator.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.indicator(id).is_some()
    }

    pub fn validate(&self) -> Result<(), RubricError> {
        let expected = DimensionKind::ordered().len();
        if self.dimensions.len() != expected {
            return Err(RubricError::DimensionCount {
                expected,
                found: self.dimensions.len(),
            });
        }

        let mut seen = HashSet::new();
        for dimension in &self.dimensions {
            for indicator in &dimension.indicators {
                if indicator.id.trim().is_empty() {
                    return Err(RubricError::EmptyIdentifier(dimension.label));
                }
                if !seen.insert(indicator.id) {
                    return Err(RubricError::DuplicateIndicator(indicator.id));
                }
                if !indicator.weight.is_finite() || indicator.weight <= 0.0 {
                    return Err(RubricError::InvalidWeight {
                        indicator: indicator.id,
                        weight: indicator.weight,
                    });
                }
            }

            let total = dimension.weight_total();
            if (total - 1.0).abs() > WEIGHT_TOLERANCE {
                return Err(RubricError::WeightSum {
                    dimension: dimension.label,
                    total,
                });
            }
        }

        Ok(())
    }

    /// Markdown digest of every threshold, grouped by dimension.
    pub fn scoring_guide(&self) -> String {
        let mut guide = String::new();
        for dimension in &self.dimensions {
            guide.push_str(&format!(
                "\n**{}. {}**:\n",
                dimension.kind.ordinal(),
                dimension.label.to_uppercase()
            ));
            for indicator in &dimension.indicators {
                guide.push_str(&format!("- {}: {}\n", indicator.id, indicator.rubric));
            }
        }
        guide
    }
}

impl Default for Rubric {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_dimensions() -> Vec<Dimension> {
    vec![
        Dimension::new(
            DimensionKind::Impact,
            vec![
                Indicator {
                    id: "1.1 People Affected",
                    weight: 0.25,
                    rubric: "1=<10,000; 2=10,000-50,000; 3=50,000-100,000; 4=100,000-499,999; 5=≥500,000",
                },
                Indicator {
                    id: "1.2 Fatalities",
                    weight: 0.25,
                    rubric: "1=<50; 2=50-199; 3=200-499; 4=500-2,999; 5=≥3,000",
                },
                Indicator {
                    id: "1.3 People in Need",
                    weight: 0.30,
                    rubric: "1=<10,000; 2=10,000-49,999; 3=50,000-199,999; 4=200,000-999,999; 5=≥1,000,000",
                },
                Indicator {
                    id: "1.4 Housing & Building Damage",
                    weight: 0.10,
                    rubric: "1=<1,000 houses; 2=1,000-9,999; 3=10,000-49,999; 4=50,000-199,999; 5=≥200,000",
                },
                Indicator {
                    id: "1.5 Land Mass Affected",
                    weight: 0.10,
                    rubric: "1=<100 km²; 2=100-999 km²; 3=1,000-4,999 km² or 2–3 districts; \
                             4=5,000-19,999 km² or ≥50% of 2–3 districts; 5=≥20,000 km² or multi-country large-scale",
                },
            ],
        ),
        Dimension::new(
            DimensionKind::HumanitarianConditions,
            vec![
                Indicator {
                    id: "2.1 Food Security (IPC Score)",
                    weight: 0.35,
                    rubric: "1=IPC Phase 1–2; 2=IPC3+ <10k people; 3=widespread IPC3+/IPC4; \
                             4=widespread IPC4; 5=IPC5 or IPC3+ ≥1M people",
                },
                Indicator {
                    id: "2.2 WASH / NFI Needs",
                    weight: 0.20,
                    rubric: "1=<1k need WASH/NFI; 2=1–9.9k; 3=10–49k; 4=50–199k; 5=≥200k",
                },
                Indicator {
                    id: "2.3 Displacement",
                    weight: 0.20,
                    rubric: "1=<1,000 displaced; 2=1,000-9,999; 3=10,000-49,999; 4=50,000-199,999; 5=≥200,000",
                },
                Indicator {
                    id: "2.4 Vulnerable Groups Proportion",
                    weight: 0.10,
                    rubric: "1=<10%; 2=10-19%; 3=20-34%; 4=35-49%; 5=≥50%",
                },
                Indicator {
                    id: "2.5 Health System",
                    weight: 0.15,
                    rubric: "1=functioning health system, referral possible; 2=medicine shortages; \
                             3=regional hospitals closed, infectious disease present; \
                             4=most hospitals closed, large-scale infectious disease; \
                             5=external health actors lead / very high mortality from infectious disease",
                },
            ],
        ),
        Dimension::new(
            DimensionKind::Complexity,
            vec![
                Indicator {
                    id: "3.1 Access (roads/airports)",
                    weight: 0.30,
                    rubric: "1=free access; 2=localised disruption, can detour; 3=most roads blocked; \
                             4=severe access issues, time/corridor restrictions; 5=no road access",
                },
                Indicator {
                    id: "3.2 Security",
                    weight: 0.30,
                    rubric: "1=low risk; 2=isolated incidents, predictable/controllable; \
                             3=frequent incidents, generally not life-threatening; \
                             4=high risk, frequent violent incidents; \
                             5=extreme, operations require heavy security or suspension",
                },
                Indicator {
                    id: "3.3 Government Capacity",
                    weight: 0.20,
                    rubric: "1=adequate resources, strong coordination; 2=can manage most needs; \
                             3=formally requests international assistance; \
                             4=highly dependent on external support; 5=loss of governance/coordination",
                },
                Indicator {
                    id: "3.4 Communications",
                    weight: 0.20,
                    rubric: "1=internet & video stable; 2=slow/unstable video; 3=intermittent outages; \
                             4=severe degradation, text-only; 5=large-scale blackout, only satellite works",
                },
            ],
        ),
        Dimension::new(
            DimensionKind::StakeholderAttention,
            vec![
                Indicator {
                    id: "4.1 Media Intensity",
                    weight: 0.25,
                    rubric: "1=ReliefWeb only; 2=local news only, no intl; 3=3+ major international outlets; \
                             4=widespread coverage (domestic & intl); 5=front-page headline level",
                },
                Indicator {
                    id: "4.2 UN/INGO Activation",
                    weight: 0.20,
                    rubric: "1=monitoring only, no formal activation; 2=local NGOs responding; \
                             3=international response teams deployed; 4=OCHA formally activated/present; \
                             5=system-wide activation (e.g. HRP or similar)",
                },
                Indicator {
                    id: "4.3 Internal Interest (Tzu Chi)",
                    weight: 0.55,
                    rubric: "1=low inquiry; 2=featured in daily intl updates; \
                             3=Religious Affairs/volunteers raising; \
                             4=Master/first-tier leadership engaged; \
                             5=Board interest, major fundraising / mobilisation",
                },
            ],
        ),
        Dimension::new(
            DimensionKind::FeasibilityAndPartnerships,
            vec![
                Indicator {
                    id: "5.1 Local Partnerships",
                    weight: 0.40,
                    rubric: "1=no known partners; 2=contact only, untested; 3=≥1 reliable organisation; \
                             4=≥2 organisations with successful past collaborations; \
                             5=multiple mature, reliable partners",
                },
                Indicator {
                    id: "5.2 Legal & Financing",
                    weight: 0.40,
                    rubric: "1=very high uncertainty / risk; 2=complex requirements; \
                             3=first-time but likely feasible; 4=feasible, clear procedures; \
                             5=smooth, established financial/legal channels",
                },
                Indicator {
                    id: "5.3 Culture & Faith Alignment",
                    weight: 0.20,
                    rubric: "1=strong resistance; 2=requires heavy dialogue/negotiation; \
                             3=basic compatibility; 4=good collaborative environment; \
                             5=long-term trust, strong values alignment",
                },
            ],
        ),
    ]
}
