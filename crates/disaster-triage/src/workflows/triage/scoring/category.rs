use serde::{Deserialize, Serialize};

const MAJOR_THRESHOLD: f64 = 4.0;
const MEDIUM_THRESHOLD: f64 = 2.5;

/// Discrete response category derived from the severity index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    A,
    B,
    C,
}

impl Category {
    /// Lower bounds are inclusive; evaluated from the most severe down.
    pub fn classify(severity_index: f64) -> Self {
        if severity_index >= MAJOR_THRESHOLD {
            Self::A
        } else if severity_index >= MEDIUM_THRESHOLD {
            Self::B
        } else {
            Self::C
        }
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::A => "Major International",
            Self::B => "Medium Scale",
            Self::C => "Minimal / Local",
        }
    }

    pub const fn recommended_action(self) -> &'static str {
        match self {
            Self::A => "Immediate mobilisation: initiate assessment, check emergency-fund inventory, contact international partners",
            Self::B => "Watch list: maintain contact with local partners, monitor for 48–72 hours",
            Self::C => "Monitoring only: no headquarters deployment; continue observation",
        }
    }

    pub const fn display_color(self) -> &'static str {
        match self {
            Self::A => "red",
            Self::B => "orange",
            Self::C => "green",
        }
    }

    pub const fn hex_color(self) -> &'static str {
        match self {
            Self::A => "#ff4b4b",
            Self::B => "#ffa421",
            Self::C => "#09ab3b",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_boundaries_are_inclusive_on_lower_bound() {
        assert_eq!(Category::classify(4.0), Category::A);
        assert_eq!(Category::classify(3.999999), Category::B);
        assert_eq!(Category::classify(2.5), Category::B);
        assert_eq!(Category::classify(2.499999), Category::C);
        assert_eq!(Category::classify(5.0), Category::A);
        assert_eq!(Category::classify(1.0), Category::C);
    }

    #[test]
    fn category_constants() {
        assert_eq!(Category::A.display_color(), "red");
        assert_eq!(Category::B.display_color(), "orange");
        assert_eq!(Category::C.display_color(), "green");
        assert_eq!(Category::B.label(), "Medium Scale");
        assert!(Category::C.recommended_action().starts_with("Monitoring only"));
    }
}
